//! Database migrations
//!
//! SQL migrations are embedded as strings and executed when the database opens.

use rusqlite::Connection;

use crate::error::Result;

/// Review tables SQL (001)
pub const REVIEW_TABLES_SQL: &str = include_str!("001_review_tables.sql");

/// Run all migrations
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.execute_batch(REVIEW_TABLES_SQL)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 7);
    }
}
