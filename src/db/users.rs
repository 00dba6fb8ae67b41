use rusqlite::params;

use super::*;

impl SalesDb {
    // =========================================================================
    // Users
    // =========================================================================

    fn map_user_row(row: &rusqlite::Row) -> rusqlite::Result<DbUser> {
        Ok(DbUser {
            id: row.get(0)?,
            username: row.get(1)?,
            password_hash: row.get(2)?,
            name: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    /// Insert a user row. Fails with `DuplicateUsername` if the username is
    /// taken. The caller (the identity layer) supplies an already-hashed
    /// password; raw passwords never reach this module.
    pub fn insert_user(
        &self,
        username: &str,
        password_hash: &str,
        name: &str,
    ) -> Result<DbUser, DbError> {
        let now = Self::now();
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO users (username, password_hash, name, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![username, password_hash, name, now],
        )?;
        if inserted == 0 {
            return Err(DbError::DuplicateUsername(username.to_string()));
        }
        let id = self.conn.last_insert_rowid();
        log::info!("Created user {} ({})", id, username);
        Ok(DbUser {
            id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            name: name.to_string(),
            created_at: now,
        })
    }

    /// Get a user by id.
    pub fn get_user(&self, id: i64) -> Result<Option<DbUser>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, username, password_hash, name, created_at
             FROM users WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id], Self::map_user_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Look up a user by username (the login key).
    pub fn get_user_by_username(&self, username: &str) -> Result<Option<DbUser>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, username, password_hash, name, created_at
             FROM users WHERE username = ?1",
        )?;
        let mut rows = stmt.query_map(params![username], Self::map_user_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Overwrite a user's password hash. Used by the password-reset flow;
    /// the token dance happens upstream, this is the final write.
    pub fn update_password(&self, user_id: i64, new_hash: &str) -> Result<(), DbError> {
        self.conn.execute(
            "UPDATE users SET password_hash = ?1 WHERE id = ?2",
            params![new_hash, user_id],
        )?;
        Ok(())
    }
}
