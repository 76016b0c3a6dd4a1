//! Identity and key allocation.
//!
//! Every table has its own key space. Keys come from a per-table row in
//! `key_sequences`, advanced by a single upsert statement; the first
//! allocation for a table seeds the sequence from the table's current
//! maximum key, so rows written before the sequence existed are never
//! reused. Allocation takes a [`Transaction`] so the counter advance is part
//! of the same atomic write as the rows that use the key.

use rusqlite::{params, Connection, OptionalExtension, Transaction};
use tracing::debug;

use crate::error::{CatalogError, Result};

use super::schema::Table;

/// Internal key of the record with `identifier`, if stored.
///
/// # Errors
///
/// Returns [`CatalogError::ReadFailure`] if the lookup fails.
pub fn resolve_key(conn: &Connection, identifier: &str) -> Result<Option<i64>> {
    conn.query_row(
        "SELECT id FROM datasets WHERE identifier = ?1",
        params![identifier],
        |row| row.get(0),
    )
    .optional()
    .map_err(CatalogError::read(Table::Datasets.name()))
}

/// Allocate the next key for `table`.
///
/// # Errors
///
/// Returns [`CatalogError::WriteFailure`] naming `table` if the sequence
/// cannot be advanced.
pub fn next_insert_key(tx: &Transaction<'_>, table: Table) -> Result<i64> {
    let name = table.name();
    let sql = format!(
        "INSERT INTO key_sequences (name, value)
         VALUES (?1, (SELECT COALESCE(MAX(id), 0) + 1 FROM {name}))
         ON CONFLICT (name) DO UPDATE SET value = value + 1
         RETURNING value"
    );
    let key: i64 = tx
        .query_row(&sql, params![name], |row| row.get(0))
        .map_err(CatalogError::write(name))?;
    debug!(table = name, key, "allocated key");
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::schema::create_schema;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn test_per_table_key_spaces() {
        let mut conn = conn();
        let tx = conn.transaction().unwrap();
        assert_eq!(next_insert_key(&tx, Table::Datasets).unwrap(), 1);
        assert_eq!(next_insert_key(&tx, Table::Datasets).unwrap(), 2);
        assert_eq!(next_insert_key(&tx, Table::Title).unwrap(), 1);
        assert_eq!(next_insert_key(&tx, Table::Datasets).unwrap(), 3);
        tx.commit().unwrap();
    }

    #[test]
    fn test_sequence_seeds_from_existing_rows() {
        let mut conn = conn();
        conn.execute(
            "INSERT INTO datasets (id, identifier) VALUES (41, 'legacy')",
            [],
        )
        .unwrap();
        let tx = conn.transaction().unwrap();
        assert_eq!(next_insert_key(&tx, Table::Datasets).unwrap(), 42);
    }

    #[test]
    fn test_keys_are_not_reused_after_delete() {
        let mut conn = conn();
        {
            let tx = conn.transaction().unwrap();
            let key = next_insert_key(&tx, Table::Datasets).unwrap();
            tx.execute(
                "INSERT INTO datasets (id, identifier) VALUES (?1, 'a')",
                params![key],
            )
            .unwrap();
            tx.commit().unwrap();
        }
        conn.execute("DELETE FROM datasets", []).unwrap();
        let tx = conn.transaction().unwrap();
        assert_eq!(next_insert_key(&tx, Table::Datasets).unwrap(), 2);
    }

    #[test]
    fn test_rolled_back_allocation_is_released() {
        let mut conn = conn();
        {
            let tx = conn.transaction().unwrap();
            next_insert_key(&tx, Table::Datasets).unwrap();
            // dropped without commit
        }
        let tx = conn.transaction().unwrap();
        assert_eq!(next_insert_key(&tx, Table::Datasets).unwrap(), 1);
    }

    #[test]
    fn test_resolve_key() {
        let conn = conn();
        conn.execute(
            "INSERT INTO datasets (id, identifier) VALUES (7, 'it''s')",
            [],
        )
        .unwrap();
        assert_eq!(resolve_key(&conn, "it's").unwrap(), Some(7));
        assert_eq!(resolve_key(&conn, "missing").unwrap(), None);
    }
}
