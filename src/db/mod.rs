mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};

use crate::codec;
use crate::tree::Forest;

/// Key of the single slot holding the outline.
pub const SNAPSHOT_SLOT: &str = "scrivener_projects";

/// Durable storage for whole-outline snapshots.
///
/// There is exactly one slot. Every save replaces it; there is no merge and
/// no history.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn default_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("", "", "quire")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        Ok(dirs.data_dir().join("quire.db"))
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // Snapshot operations
    // ============================================================

    /// Replace the stored snapshot with `forest`.
    pub fn save_snapshot(&self, forest: &Forest) -> Result<()> {
        let body = codec::export(forest)?;
        let conn = self.conn.lock().expect("database lock poisoned");
        let high_water = i64::try_from(forest.high_water())?;
        conn.execute(
            "INSERT INTO snapshots (slot, body, high_water, saved_at) VALUES (?, ?, ?, ?)
             ON CONFLICT(slot) DO UPDATE SET body = excluded.body,
                 high_water = excluded.high_water, saved_at = excluded.saved_at",
            (SNAPSHOT_SLOT, &body, high_water, Utc::now().to_rfc3339()),
        )?;
        tracing::debug!(nodes = forest.len(), bytes = body.len(), "saved snapshot");
        Ok(())
    }

    /// The raw stored snapshot text, if any.
    pub fn read_snapshot(&self) -> Result<Option<String>> {
        Ok(self.read_slot()?.map(|(body, _)| body))
    }

    fn read_slot(&self) -> Result<Option<(String, u64)>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let slot = conn
            .query_row(
                "SELECT body, high_water FROM snapshots WHERE slot = ?",
                [SNAPSHOT_SLOT],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()?;
        Ok(slot.map(|(body, hw)| (body, u64::try_from(hw).unwrap_or(0))))
    }

    /// Load the stored outline.
    ///
    /// Never fails: a missing, unreadable or corrupt snapshot is logged and
    /// treated as an empty outline.
    pub fn load_snapshot(&self) -> Forest {
        let (body, high_water) = match self.read_slot() {
            Ok(Some(slot)) => slot,
            Ok(None) => return Forest::new(),
            Err(e) => {
                tracing::error!("Failed to read snapshot, starting empty: {}", e);
                return Forest::new();
            }
        };

        match codec::import(&body) {
            Ok(forest) => {
                tracing::info!(nodes = forest.len(), "loaded snapshot");
                forest.with_high_water(high_water)
            }
            Err(e) => {
                tracing::warn!("Stored snapshot is corrupt, starting empty: {}", e);
                Forest::new()
            }
        }
    }

    /// When the snapshot was last written.
    pub fn saved_at(&self) -> Result<Option<DateTime<Utc>>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let saved_at = conn
            .query_row(
                "SELECT saved_at FROM snapshots WHERE slot = ?",
                [SNAPSHOT_SLOT],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(saved_at.map(parse_datetime))
    }

    /// Empty the stored outline. The id high-water mark is kept so ids of
    /// cleared nodes are not issued again after a restart.
    pub fn clear_snapshot(&self) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute(
            "UPDATE snapshots SET body = '[]', saved_at = ? WHERE slot = ?",
            (Utc::now().to_rfc3339(), SNAPSHOT_SLOT),
        )?;
        Ok(rows > 0)
    }

    /// Overwrite the slot with arbitrary text. Only useful for simulating
    /// damaged storage in tests.
    #[doc(hidden)]
    pub fn write_raw_snapshot(&self, body: &str) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        conn.execute(
            "INSERT INTO snapshots (slot, body, saved_at) VALUES (?, ?, ?)
             ON CONFLICT(slot) DO UPDATE SET body = excluded.body, saved_at = excluded.saved_at",
            (SNAPSHOT_SLOT, body, Utc::now().to_rfc3339()),
        )?;
        Ok(())
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

fn parse_datetime(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
