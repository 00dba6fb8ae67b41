use rusqlite::{params, types::Value};

use super::*;

impl SalesDb {
    // =========================================================================
    // Prospects
    // =========================================================================

    fn map_prospect_row(row: &rusqlite::Row) -> rusqlite::Result<DbProspect> {
        let status: String = row.get(6)?;
        Ok(DbProspect {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            phone: row.get(3)?,
            email: row.get(4)?,
            company: row.get(5)?,
            status: ProspectStatus::parse(&status).ok_or_else(|| bad_text_value(6, &status))?,
            follow_up_date: row.get(7)?,
            created_at: row.get(8)?,
        })
    }

    /// Insert a prospect and return the fully populated row. New prospects
    /// always start in the `New` stage.
    pub fn add_prospect(
        &self,
        user_id: i64,
        name: &str,
        phone: &str,
        email: &str,
        company: &str,
        follow_up_date: Option<&str>,
    ) -> Result<DbProspect, DbError> {
        let now = Self::now();
        self.conn.execute(
            "INSERT INTO prospects (user_id, name, phone, email, company, status, follow_up_date, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                user_id,
                name,
                phone,
                email,
                company,
                ProspectStatus::New.as_str(),
                follow_up_date,
                now
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        Ok(DbProspect {
            id,
            user_id,
            name: name.to_string(),
            phone: phone.to_string(),
            email: email.to_string(),
            company: company.to_string(),
            status: ProspectStatus::New,
            follow_up_date: follow_up_date.map(str::to_string),
            created_at: now,
        })
    }

    /// Get a prospect by id.
    pub fn get_prospect(&self, id: i64) -> Result<Option<DbProspect>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, name, phone, email, company, status, follow_up_date, created_at
             FROM prospects WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id], Self::map_prospect_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// List a user's prospects ordered by follow-up date (undated rows first,
    /// the way SQLite sorts NULLs).
    pub fn list_prospects(&self, user_id: i64) -> Result<Vec<DbProspect>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, name, phone, email, company, status, follow_up_date, created_at
             FROM prospects
             WHERE user_id = ?1
             ORDER BY follow_up_date",
        )?;
        let rows = stmt.query_map(params![user_id], Self::map_prospect_row)?;

        let mut prospects = Vec::new();
        for row in rows {
            prospects.push(row?);
        }
        Ok(prospects)
    }

    /// Apply a partial update. `Won` cannot be written here — it is reserved
    /// for the conversion workflow. Unknown id is a zero-row no-op.
    pub fn update_prospect(&self, id: i64, patch: &ProspectPatch) -> Result<usize, DbError> {
        if patch.status == Some(ProspectStatus::Won) {
            return Err(DbError::WonReserved);
        }

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
        if let Some(status) = &patch.status {
            sets.push("status = ?");
            values.push(Value::from(status.as_str().to_string()));
        }
        if let Some(date) = &patch.follow_up_date {
            sets.push("follow_up_date = ?");
            values.push(Value::from(date.clone()));
        }

        if sets.is_empty() {
            return Ok(0);
        }

        let sql = format!("UPDATE prospects SET {} WHERE id = ?", sets.join(", "));
        values.push(Value::from(id));
        let changed = self
            .conn
            .execute(&sql, rusqlite::params_from_iter(values))?;
        Ok(changed)
    }

    /// Stamp a prospect `Won`. Conversion-only; not part of the public
    /// repository surface.
    pub(crate) fn mark_prospect_won(&self, id: i64) -> Result<usize, DbError> {
        let changed = self.conn.execute(
            "UPDATE prospects SET status = ?1 WHERE id = ?2",
            params![ProspectStatus::Won.as_str(), id],
        )?;
        Ok(changed)
    }

    /// Delete a prospect together with the follow-ups addressed to it, in
    /// one transaction.
    pub fn delete_prospect(&self, id: i64) -> Result<(), DbError> {
        self.with_transaction(|db| {
            db.conn.execute(
                "DELETE FROM follow_ups WHERE entity_type = 'prospect' AND entity_id = ?1",
                params![id],
            )?;
            db.conn
                .execute("DELETE FROM prospects WHERE id = ?1", params![id])?;
            Ok(())
        })?;
        log::info!("Deleted prospect {} with dependent follow-ups", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::{seed_user, test_db};
    use super::*;

    #[test]
    fn test_add_defaults_to_new() {
        let db = test_db();
        let user = seed_user(&db, "jane");
        let p = db
            .add_prospect(user.id, "Wanjiku", "0700", "w@x.com", "Wanjiku Ltd", None)
            .expect("add");
        assert_eq!(p.status, ProspectStatus::New);
        assert!(p.follow_up_date.is_none());
    }

    #[test]
    fn test_list_ordered_by_follow_up_date() {
        let db = test_db();
        let user = seed_user(&db, "jane");

        db.add_prospect(user.id, "Later", "", "", "", Some("2026-09-01T00:00:00Z"))
            .expect("add");
        db.add_prospect(user.id, "Sooner", "", "", "", Some("2026-08-10T00:00:00Z"))
            .expect("add");

        let prospects = db.list_prospects(user.id).expect("list");
        assert_eq!(prospects.len(), 2);
        assert_eq!(prospects[0].name, "Sooner");
        assert_eq!(prospects[1].name, "Later");
    }

    #[test]
    fn test_update_status_and_follow_up_date() {
        let db = test_db();
        let user = seed_user(&db, "jane");
        let p = db
            .add_prospect(user.id, "Wanjiku", "", "", "", None)
            .expect("add");

        let patch = ProspectPatch {
            status: Some(ProspectStatus::Qualified),
            follow_up_date: Some("2026-08-20T00:00:00Z".to_string()),
            ..Default::default()
        };
        assert_eq!(db.update_prospect(p.id, &patch).expect("update"), 1);

        let reloaded = db.get_prospect(p.id).expect("get").expect("exists");
        assert_eq!(reloaded.status, ProspectStatus::Qualified);
        assert_eq!(
            reloaded.follow_up_date.as_deref(),
            Some("2026-08-20T00:00:00Z")
        );
    }

    #[test]
    fn test_won_is_rejected_outside_conversion() {
        let db = test_db();
        let user = seed_user(&db, "jane");
        let p = db
            .add_prospect(user.id, "Wanjiku", "", "", "", None)
            .expect("add");

        let patch = ProspectPatch {
            status: Some(ProspectStatus::Won),
            ..Default::default()
        };
        let err = db.update_prospect(p.id, &patch).expect_err("reserved");
        assert!(matches!(err, DbError::WonReserved));

        let reloaded = db.get_prospect(p.id).expect("get").expect("exists");
        assert_eq!(reloaded.status, ProspectStatus::New);
    }

    #[test]
    fn test_empty_patch_is_noop() {
        let db = test_db();
        let user = seed_user(&db, "jane");
        let p = db
            .add_prospect(user.id, "Wanjiku", "", "", "", None)
            .expect("add");

        let changed = db
            .update_prospect(p.id, &ProspectPatch::default())
            .expect("no error");
        assert_eq!(changed, 0);
    }

    #[test]
    fn test_delete_cascades_follow_ups() {
        let db = test_db();
        let user = seed_user(&db, "jane");
        let p = db
            .add_prospect(user.id, "Wanjiku", "", "", "", None)
            .expect("add");
        db.add_follow_up(
            FollowUpTarget::Prospect(p.id),
            "2026-08-20T09:00:00Z",
            "Send quote",
        )
        .expect("follow-up");

        db.delete_prospect(p.id).expect("delete");

        assert!(db.get_prospect(p.id).expect("query").is_none());
        let count: i64 = db
            .conn_ref()
            .query_row("SELECT COUNT(*) FROM follow_ups", [], |r| r.get(0))
            .expect("count");
        assert_eq!(count, 0);
    }

    #[test]
    fn test_ownership_isolation() {
        let db = test_db();
        let a = seed_user(&db, "a");
        let b = seed_user(&db, "b");

        db.add_prospect(a.id, "Mine", "", "", "", None).expect("add");
        db.add_prospect(b.id, "Theirs", "", "", "", None)
            .expect("add");

        let for_a = db.list_prospects(a.id).expect("list");
        assert_eq!(for_a.len(), 1);
        assert_eq!(for_a[0].name, "Mine");
    }
}
