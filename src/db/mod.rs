//! SQLite-backed store for the sales pipeline.
//!
//! The database lives at `~/.salestracker/salestracker.db` and is the single
//! source of truth for clients, prospects, sales, phone numbers, call logs
//! and follow-ups. One connection is opened at process start and held for
//! the process lifetime; the schema is applied before [`SalesDb`] is handed
//! out, so a `SalesDb` that exists is always initialized.

use std::path::PathBuf;

use chrono::Utc;
use rusqlite::{Connection, OpenFlags};

pub mod types;
pub use types::*;

pub mod call_logs;
pub mod clients;
pub mod follow_ups;
pub mod phone_numbers;
pub mod prospects;
pub mod sales;
pub mod users;

/// SQLite connection wrapper for the sales pipeline store.
///
/// Intentionally NOT `Clone` or `Sync`: the app holds it behind a mutex and
/// all writes serialize through the one connection.
pub struct SalesDb {
    conn: Connection,
}

impl SalesDb {
    /// Borrow the underlying connection for ad-hoc queries.
    pub fn conn_ref(&self) -> &Connection {
        &self.conn
    }

    /// Execute a closure within a SQLite transaction.
    /// Commits on Ok, rolls back on Err.
    ///
    /// Every multi-table mutation in this crate runs through here, so a
    /// failure after some statements have been issued persists nothing.
    pub fn with_transaction<F, T>(&self, f: F) -> Result<T, DbError>
    where
        F: FnOnce(&Self) -> Result<T, DbError>,
    {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        match f(self) {
            Ok(val) => {
                self.conn.execute_batch("COMMIT")?;
                Ok(val)
            }
            Err(e) => {
                let _ = self.conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }

    /// Open (or create) the database at `~/.salestracker/salestracker.db`
    /// and apply the schema.
    pub fn open() -> Result<Self, DbError> {
        let path = Self::db_path()?;
        Self::open_at(path)
    }

    /// Open a database at an explicit path. Useful for testing.
    pub fn open_at(path: PathBuf) -> Result<Self, DbError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(DbError::CreateDir)?;
            }
        }

        let conn = Connection::open(&path)?;

        // Enable WAL mode for better concurrent read performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        crate::migrations::run_migrations(&conn).map_err(DbError::Migration)?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        Ok(Self { conn })
    }

    /// Open the database in read-only mode. Used by report/export tooling
    /// for safe concurrent reads while the app owns writes.
    pub fn open_readonly() -> Result<Self, DbError> {
        let path = Self::db_path()?;
        Self::open_readonly_at(&path)
    }

    /// Open a database at an explicit path in read-only mode.
    pub fn open_readonly_at(path: &std::path::Path) -> Result<Self, DbError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Ok(Self { conn })
    }

    /// Resolve the default database path: `~/.salestracker/salestracker.db`.
    fn db_path() -> Result<PathBuf, DbError> {
        let home = dirs::home_dir().ok_or(DbError::HomeDirNotFound)?;
        Ok(home.join(".salestracker").join("salestracker.db"))
    }

    /// Current instant as the RFC3339 UTC string every table stores.
    pub(crate) fn now() -> String {
        Utc::now().to_rfc3339()
    }
}

// =============================================================================
// Shared test utilities
// =============================================================================


// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::test_utils::test_db;
    use super::*;

    #[test]
    fn test_open_creates_tables() {
        let db = test_db();
        for table in ["users", "clients", "prospects", "sales"] {
            let count: i32 = db
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                    row.get(0)
                })
                .unwrap_or_else(|_| panic!("{table} table should exist"));
            assert_eq!(count, 0);
        }
    }

    #[test]
    fn test_idempotent_schema_application() {
        // Opening the same DB twice should not error (versioned migrations)
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("idempotent.db");

        let _db1 = SalesDb::open_at(path.clone()).expect("first open");
        let _db2 = SalesDb::open_at(path).expect("second open should not fail");
    }

    #[test]
    fn test_transaction_rolls_back_on_err() {
        let db = test_db();
        let user = test_utils::seed_user(&db, "jane");

        let result: Result<(), DbError> = db.with_transaction(|db| {
            db.conn_ref().execute(
                "INSERT INTO clients (user_id, name, created_at) VALUES (?1, 'Acme', ?2)",
                rusqlite::params![user.id, SalesDb::now()],
            )?;
            Err(DbError::Migration("injected".to_string()))
        });
        assert!(result.is_err());

        let count: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM clients", [], |row| row.get(0))
            .expect("count");
        assert_eq!(count, 0, "rolled-back insert must not persist");
    }

    #[test]
    fn test_transaction_commits_on_ok() {
        let db = test_db();
        let user = test_utils::seed_user(&db, "jane");

        db.with_transaction(|db| {
            db.conn_ref()
                .execute(
                    "INSERT INTO clients (user_id, name, created_at) VALUES (?1, 'Acme', ?2)",
                    rusqlite::params![user.id, SalesDb::now()],
                )
                .map_err(DbError::from)?;
            Ok(())
        })
        .expect("transaction");

        let count: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM clients", [], |row| row.get(0))
            .expect("count");
        assert_eq!(count, 1);
    }

    #[test]
    fn test_readonly_open_rejects_writes() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("ro.db");
        {
            let _rw = SalesDb::open_at(path.clone()).expect("create db");
        }

        let ro = SalesDb::open_readonly_at(&path).expect("readonly open");
        let err = ro.conn_ref().execute(
            "INSERT INTO users (username, password_hash, name, created_at)
             VALUES ('x', 'y', 'z', '2026-01-01T00:00:00Z')",
            [],
        );
        assert!(err.is_err(), "read-only connection must reject writes");
    }
}
