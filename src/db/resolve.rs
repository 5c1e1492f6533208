//! Natural-key resolution.
//!
//! Snapshots identify rows by business-visible keys (a customer's user
//! ID, an invoice number, an area name); surrogate rowids never leave
//! the store. Each restore pass builds a [`KeyMap`] for its table family
//! and hands it to the passes that depend on it, so lookups never run
//! against a half-restored anchor table.

use anyhow::Result;
use rusqlite::Connection;
use std::collections::HashMap;

/// Natural key -> surrogate rowid for one table family.
/// Scoped to a single restore invocation; never persisted.
pub type KeyMap = HashMap<String, i64>;

/// Look up one natural key in its table's unique key column.
pub fn lookup_id(
    conn: &Connection,
    table: &str,
    key_column: &str,
    key: &str,
) -> Result<Option<i64>> {
    let sql = format!("SELECT id FROM {} WHERE {} = ?1", table, key_column);
    match conn.query_row(&sql, [key], |row| row.get(0)) {
        Ok(id) => Ok(Some(id)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Read a whole table into a key map.
///
/// Runs after a family's per-row pass, so the returned map covers rows
/// matched or created during the pass and rows that predate the run.
pub fn load_key_map(conn: &Connection, table: &str, key_column: &str) -> Result<KeyMap> {
    let sql = format!("SELECT {}, id FROM {}", key_column, table);
    let mut stmt = conn.prepare(&sql)?;

    let mut map = KeyMap::new();
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;
    for row in rows {
        let (key, id) = row?;
        map.insert(key, id);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[test]
    fn test_lookup_id() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO areas (name, description) VALUES ('Zone A', 'North')",
                [],
            )?;

            let id = lookup_id(conn, "areas", "name", "Zone A")?;
            assert!(id.is_some());

            let missing = lookup_id(conn, "areas", "name", "Zone Z")?;
            assert!(missing.is_none());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_load_key_map() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            conn.execute("INSERT INTO areas (name) VALUES ('Zone A')", [])?;
            conn.execute("INSERT INTO areas (name) VALUES ('Zone B')", [])?;

            let map = load_key_map(conn, "areas", "name")?;
            assert_eq!(map.len(), 2);
            assert!(map.contains_key("Zone A"));
            assert!(map.contains_key("Zone B"));
            Ok(())
        })
        .unwrap();
    }
}
