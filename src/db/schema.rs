//! Embedded schema migrations for the snapshot store.

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};

/// Ordered list of `(version, name, sql)`. Versions only ever grow.
const MIGRATIONS: &[(u32, &str, &str)] = &[(
    1,
    "snapshot slot",
    include_str!("migrations/001_initial.sql"),
)];

/// Bring `conn` up to the latest schema, skipping versions already recorded
/// in `schema_migrations`. Each migration and its bookkeeping row commit
/// together.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
    )
    .context("Failed to create schema_migrations table")?;

    for &(version, name, sql) in MIGRATIONS {
        if is_applied(conn, version)? {
            continue;
        }
        tracing::info!(version, name, "applying migration");

        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(sql)
            .with_context(|| format!("Failed to apply migration {:03} ({})", version, name))?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?, ?, ?)",
            (version, name, chrono::Utc::now().to_rfc3339()),
        )?;
        tx.commit()?;
    }
    Ok(())
}

fn is_applied(conn: &Connection, version: u32) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM schema_migrations WHERE version = ?",
            [version],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}
