use quire::codec;
use quire::db::Database;
use quire::models::*;
use quire::{TreeError, Workspace};
use speculate2::speculate;
use tokio_test::{assert_err, assert_ok};

fn create(ws: &Workspace, parent: Option<NodeId>, kind: NodeKind, name: &str) -> NodeId {
    ws.create(CreateNodeInput {
        parent_id: parent,
        kind,
        name: name.to_string(),
    })
    .expect("Failed to create node")
    .id
}

fn populate(ws: &Workspace) -> (NodeId, NodeId) {
    let novel = create(ws, None, NodeKind::Container, "Novel");
    let chapter = create(ws, Some(novel), NodeKind::Document, "Chapter 1");
    ws.update_content(
        chapter,
        UpdateContentInput {
            content: r#"{"blocks":[{"key":"a","text":"It began with rain.","type":"unstyled"}]}"#
                .to_string(),
            plain_text: None,
        },
    )
    .expect("Failed to save content");
    (novel, chapter)
}

speculate! {
    before {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
    }

    describe "load_snapshot" {
        it "returns an empty outline when nothing was saved" {
            assert!(db.load_snapshot().is_empty());
            assert!(db.saved_at().expect("Query failed").is_none());
        }

        it "returns an empty outline for a corrupt snapshot" {
            db.write_raw_snapshot("[{\"id\": 1, \"na").expect("Failed to write");
            assert!(db.load_snapshot().is_empty());
        }

        it "returns an empty outline for a schema-invalid snapshot" {
            db.write_raw_snapshot(r#"{"projects": []}"#).expect("Failed to write");
            assert!(db.load_snapshot().is_empty());
        }

        it "returns an empty outline when the table is missing" {
            let unmigrated = Database::open_memory().expect("Failed to create database");
            assert!(unmigrated.load_snapshot().is_empty());
        }
    }

    describe "save_snapshot" {
        it "replaces the previous snapshot" {
            let ws = Workspace::open(db.clone());
            populate(&ws);
            let first = db.read_snapshot().expect("Query failed").expect("No snapshot");

            create(&ws, None, NodeKind::Container, "Sequel");
            let second = db.read_snapshot().expect("Query failed").expect("No snapshot");

            assert_ne!(first, second);
            assert_eq!(db.load_snapshot().roots().len(), 2);
            assert!(db.saved_at().expect("Query failed").is_some());
            assert!(ws.saved_at().expect("Query failed").is_some());
        }

        it "stores the export format" {
            let ws = Workspace::open(db.clone());
            populate(&ws);
            let stored = db.read_snapshot().expect("Query failed").expect("No snapshot");
            assert_eq!(stored, codec::export(&ws.forest()).expect("Export failed"));
        }
    }

    describe "workspace" {
        it "reloads the same outline after reopening" {
            let ws = Workspace::open(db.clone());
            let (_, chapter) = populate(&ws);

            let reopened = Workspace::open(db.clone());
            assert_eq!(*reopened.forest(), *ws.forest());
            assert_eq!(reopened.get(chapter).expect("missing").metadata.actual_word_count, 4);
        }

        it "does not reuse ids after reopening" {
            let ws = Workspace::open(db.clone());
            let (novel, chapter) = populate(&ws);
            assert_ok!(ws.delete(chapter));

            let reopened = Workspace::open(db.clone());
            let fresh = create(&reopened, Some(novel), NodeKind::Document, "Chapter 1 again");
            assert!(fresh > chapter);
        }

        it "remembers the highest issued id across reopen" {
            let ws = Workspace::open(db.clone());
            let (_, chapter) = populate(&ws);
            assert_ok!(ws.delete(chapter));
            assert_eq!(db.load_snapshot().high_water(), chapter);
        }

        it "clears both storage and memory" {
            let ws = Workspace::open(db.clone());
            populate(&ws);
            assert_ok!(ws.clear());
            assert!(ws.forest().is_empty());
            assert_eq!(db.read_snapshot().expect("Query failed").as_deref(), Some("[]"));
            assert!(Workspace::open(db.clone()).forest().is_empty());
        }

        it "keeps the id floor after clearing and reopening" {
            let ws = Workspace::open(db.clone());
            let (_, chapter) = populate(&ws);
            assert_ok!(ws.clear());

            let reopened = Workspace::open(db.clone());
            assert_eq!(reopened.forest().high_water(), chapter);
            let fresh = create(&reopened, None, NodeKind::Container, "Fresh start");
            assert!(fresh > chapter);
        }

        it "rejects imported ids beyond the maximum" {
            let ws = Workspace::open(db.clone());
            populate(&ws);
            let before = ws.forest();
            let text = format!(
                r#"[{{"id": {}, "name": "Huge", "kind": "container", "children": [],
                    "metadata": {{"lastModified": "2024-01-01T00:00:00Z", "creationDate": "2024-01-01T00:00:00Z"}}}}]"#,
                u64::MAX
            );
            let err = assert_err!(ws.import(&text));
            assert!(matches!(err, TreeError::Parse(_)));
            assert_eq!(*ws.forest(), *before);
        }

        it "stays usable once the id space is used up" {
            let text = format!(
                r#"[{{"id": {}, "name": "Last", "kind": "container", "children": [],
                    "metadata": {{"lastModified": "2024-01-01T00:00:00Z", "creationDate": "2024-01-01T00:00:00Z"}}}}]"#,
                MAX_NODE_ID
            );
            let ws = Workspace::open(db.clone());
            assert_ok!(ws.import(&text));

            let err = assert_err!(ws.create(CreateNodeInput {
                parent_id: Some(MAX_NODE_ID),
                kind: NodeKind::Document,
                name: "One too many".to_string(),
            }));
            assert!(matches!(err, TreeError::IdsExhausted(_)));

            assert_eq!(ws.forest().len(), 1);
            assert_ok!(ws.rename(MAX_NODE_ID, "Still here"));
            assert_eq!(ws.get(MAX_NODE_ID).expect("missing").name, "Still here");
            assert_eq!(Workspace::open(db.clone()).forest().high_water(), MAX_NODE_ID);
        }

        it "leaves everything untouched when an import is malformed" {
            let ws = Workspace::open(db.clone());
            populate(&ws);
            let before = ws.forest();
            let stored_before = db.read_snapshot().expect("Query failed");

            let err = assert_err!(ws.import("[{\"id\": 1, \"name\": \"broken\""));
            assert!(matches!(err, TreeError::Parse(_)));

            let err = assert_err!(ws.import(
                r#"[{"id": 1, "name": "d", "kind": "document",
                     "children": [{"id": 2, "name": "x", "kind": "document", "children": [],
                       "metadata": {"lastModified": "2024-01-01T00:00:00Z", "creationDate": "2024-01-01T00:00:00Z"}}],
                     "metadata": {"lastModified": "2024-01-01T00:00:00Z", "creationDate": "2024-01-01T00:00:00Z"}}]"#
            ));
            assert!(matches!(err, TreeError::Parse(_)));

            assert_eq!(*ws.forest(), *before);
            assert_eq!(db.read_snapshot().expect("Query failed"), stored_before);
        }

        it "replaces the outline with a valid import" {
            let other_db = Database::open_memory().expect("Failed to create database");
            other_db.migrate().expect("Failed to run migrations");
            let other = Workspace::open(other_db);
            create(&other, None, NodeKind::Container, "Imported");
            let text = other.export().expect("Export failed");

            let ws = Workspace::open(db.clone());
            populate(&ws);
            let forest = assert_ok!(ws.import(&text));
            assert_eq!(forest.roots().len(), 1);
            assert_eq!(forest.roots()[0].name, "Imported");
            assert_eq!(db.load_snapshot(), *forest);
        }

        it "accepts a lenient word count goal on import" {
            let text = r#"[{"id": 5, "name": "Draft", "kind": "document", "content": "", "children": [],
                "metadata": {"wordCountGoal": "abc", "lastModified": "2024-01-01T00:00:00Z",
                             "creationDate": "2024-01-01T00:00:00Z"}}]"#;
            let ws = Workspace::open(db.clone());
            let forest = assert_ok!(ws.import(text));
            assert_eq!(forest.get(5).expect("missing").metadata.word_count_goal, 0);
        }
    }
}

#[test]
fn file_backed_database_survives_reopen() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("nested").join("quire.db");

    let chapter = {
        let db = Database::open(path.clone()).expect("Failed to open database");
        db.migrate().expect("Failed to migrate");
        let ws = Workspace::open(db);
        populate(&ws).1
    };

    let db = Database::open(path).expect("Failed to reopen database");
    db.migrate().expect("Failed to migrate");
    let ws = Workspace::open(db);
    assert_eq!(ws.get(chapter).expect("missing").name, "Chapter 1");
}
