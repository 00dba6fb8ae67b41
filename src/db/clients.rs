use rusqlite::{params, types::Value};

use super::*;

impl SalesDb {
    // =========================================================================
    // Clients
    // =========================================================================

    fn map_client_row(row: &rusqlite::Row) -> rusqlite::Result<DbClient> {
        Ok(DbClient {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            phone: row.get(3)?,
            email: row.get(4)?,
            company: row.get(5)?,
            industry: row.get(6)?,
            created_at: row.get(7)?,
        })
    }

    /// Insert a client and return the fully populated row.
    pub fn add_client(
        &self,
        user_id: i64,
        name: &str,
        phone: &str,
        email: &str,
        company: &str,
        industry: &str,
    ) -> Result<DbClient, DbError> {
        let now = Self::now();
        self.conn.execute(
            "INSERT INTO clients (user_id, name, phone, email, company, industry, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![user_id, name, phone, email, company, industry, now],
        )?;
        let id = self.conn.last_insert_rowid();
        Ok(DbClient {
            id,
            user_id,
            name: name.to_string(),
            phone: phone.to_string(),
            email: email.to_string(),
            company: company.to_string(),
            industry: industry.to_string(),
            created_at: now,
        })
    }

    /// Get a client by id.
    pub fn get_client(&self, id: i64) -> Result<Option<DbClient>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, name, phone, email, company, industry, created_at
             FROM clients WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id], Self::map_client_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// List a user's clients, alphabetically by name.
    pub fn list_clients(&self, user_id: i64) -> Result<Vec<DbClient>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, name, phone, email, company, industry, created_at
             FROM clients
             WHERE user_id = ?1
             ORDER BY name",
        )?;
        let rows = stmt.query_map(params![user_id], Self::map_client_row)?;

        let mut clients = Vec::new();
        for row in rows {
            clients.push(row?);
        }
        Ok(clients)
    }

    /// Apply a partial update. Only supplied fields are overwritten; a patch
    /// with no fields is a no-op. Returns the number of rows changed (0 for
    /// an unknown id — callers must not assume existence was verified).
    pub fn update_client(&self, id: i64, patch: &ClientPatch) -> Result<usize, DbError> {
        let mut sets: Vec<&'static str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(name) = &patch.name {
            sets.push("name = ?");
            values.push(Value::from(name.clone()));
        }
        if let Some(phone) = &patch.phone {
            sets.push("phone = ?");
            values.push(Value::from(phone.clone()));
        }
        if let Some(email) = &patch.email {
            sets.push("email = ?");
            values.push(Value::from(email.clone()));
        }
        if let Some(company) = &patch.company {
            sets.push("company = ?");
            values.push(Value::from(company.clone()));
        }
        if let Some(industry) = &patch.industry {
            sets.push("industry = ?");
            values.push(Value::from(industry.clone()));
        }

        if sets.is_empty() {
            return Ok(0);
        }

        let sql = format!("UPDATE clients SET {} WHERE id = ?", sets.join(", "));
        values.push(Value::from(id));
        let changed = self
            .conn
            .execute(&sql, rusqlite::params_from_iter(values))?;
        Ok(changed)
    }

    /// Delete a client together with its sales and the follow-ups addressed
    /// to it, in one transaction.
    pub fn delete_client(&self, id: i64) -> Result<(), DbError> {
        self.with_transaction(|db| {
            db.conn
                .execute("DELETE FROM sales WHERE client_id = ?1", params![id])?;
            db.conn.execute(
                "DELETE FROM follow_ups WHERE entity_type = 'client' AND entity_id = ?1",
                params![id],
            )?;
            db.conn
                .execute("DELETE FROM clients WHERE id = ?1", params![id])?;
            Ok(())
        })?;
        log::info!("Deleted client {} with dependent sales and follow-ups", id);
        Ok(())
    }
}
