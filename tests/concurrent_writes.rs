//! Concurrent inserts from separate connections to one database file.

mod common;

use std::collections::HashSet;
use std::thread;
use std::time::Duration;

use common::{count_rows, init_tracing, IsoDoc};
use isocat::store::{create_schema, Table};
use isocat::RecordStore;
use rusqlite::Connection;
use tempfile::TempDir;

const WRITERS: usize = 2;
const RECORDS_PER_WRITER: usize = 20;

fn open(path: &std::path::Path) -> Connection {
    let conn = Connection::open(path).expect("open database file");
    conn.busy_timeout(Duration::from_secs(10)).expect("set busy timeout");
    conn.execute_batch("PRAGMA foreign_keys = ON;").expect("enable foreign keys");
    conn
}

#[test]
fn test_concurrent_inserts_get_distinct_keys() {
    init_tracing();
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("catalogue.db");
    create_schema(&open(&path)).expect("create schema");

    let handles: Vec<_> = (0..WRITERS)
        .map(|writer| {
            let path = path.clone();
            thread::spawn(move || {
                let mut conn = open(&path);
                let mut store = RecordStore::new(&mut conn);
                (0..RECORDS_PER_WRITER)
                    .map(|i| {
                        let title = format!("Record {i} of writer {writer}");
                        let doc = IsoDoc::new(&format!("writer-{writer}-record-{i}"))
                            .titles(&[title.as_str()])
                            .keywords(&["concurrency"]);
                        store.insert(&doc.parse()).expect("insert succeeds")
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let outcomes: Vec<_> = handles
        .into_iter()
        .flat_map(|h| h.join().expect("writer thread panicked"))
        .collect();
    assert_eq!(outcomes.len(), WRITERS * RECORDS_PER_WRITER);

    let keys: HashSet<i64> = outcomes.iter().map(|o| o.key).collect();
    assert_eq!(keys.len(), outcomes.len());
    let representation_ids: HashSet<i64> = outcomes
        .iter()
        .flat_map(|o| o.representation_ids.iter().copied())
        .collect();
    // two rows per representation table, each table with its own key space
    assert_eq!(representation_ids.len(), 2 * outcomes.len());

    let conn = open(&path);
    assert_eq!(count_rows(&conn, Table::Datasets), outcomes.len() as i64);
    assert_eq!(count_rows(&conn, Table::Keyword), outcomes.len() as i64);
    assert_eq!(count_rows(&conn, Table::RecordFull), 2 * outcomes.len() as i64);
}
