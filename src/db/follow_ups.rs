use rusqlite::{params, types::Value};

use super::*;

impl SalesDb {
    // =========================================================================
    // Follow-ups
    // =========================================================================

    fn map_follow_up_row(row: &rusqlite::Row) -> rusqlite::Result<DbFollowUp> {
        let entity_id: i64 = row.get(1)?;
        let entity_type: String = row.get(2)?;
        Ok(DbFollowUp {
            id: row.get(0)?,
            target: FollowUpTarget::from_parts(&entity_type, entity_id)
                .ok_or_else(|| bad_text_value(2, &entity_type))?,
            date: row.get(3)?,
            notes: row.get(4)?,
            is_completed: row.get::<_, i64>(5)? != 0,
            created_at: row.get(6)?,
        })
    }

    /// Insert a follow-up addressed to a client, prospect or phone number
    /// and return the populated row. New follow-ups are always pending.
    pub fn add_follow_up(
        &self,
        target: FollowUpTarget,
        date: &str,
        notes: &str,
    ) -> Result<DbFollowUp, DbError> {
        let now = Self::now();
        self.conn.execute(
            "INSERT INTO follow_ups (entity_id, entity_type, date, notes, is_completed, created_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5)",
            params![target.entity_id(), target.type_str(), date, notes, now],
        )?;
        let id = self.conn.last_insert_rowid();
        Ok(DbFollowUp {
            id,
            target,
            date: date.to_string(),
            notes: notes.to_string(),
            is_completed: false,
            created_at: now,
        })
    }

    /// Get a follow-up by id.
    pub fn get_follow_up(&self, id: i64) -> Result<Option<DbFollowUp>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, entity_id, entity_type, date, notes, is_completed, created_at
             FROM follow_ups WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id], Self::map_follow_up_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// List every follow-up addressed to one entity, oldest due first.
    pub fn list_follow_ups_for_entity(
        &self,
        target: FollowUpTarget,
    ) -> Result<Vec<DbFollowUp>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, entity_id, entity_type, date, notes, is_completed, created_at
             FROM follow_ups
             WHERE entity_type = ?1 AND entity_id = ?2
             ORDER BY date",
        )?;
        let rows = stmt.query_map(
            params![target.type_str(), target.entity_id()],
            Self::map_follow_up_row,
        )?;

        let mut follow_ups = Vec::new();
        for row in rows {
            follow_ups.push(row?);
        }
        Ok(follow_ups)
    }

    /// List a user's pending follow-ups, soonest due first.
    ///
    /// The follow-up table carries no owner column; ownership flows through
    /// the referenced entity, so each branch of the polymorphic reference is
    /// checked against the requesting user. Rows whose referent is gone
    /// (orphans) fail every branch and drop out.
    pub fn list_pending_follow_ups(&self, user_id: i64) -> Result<Vec<DbFollowUp>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT f.id, f.entity_id, f.entity_type, f.date, f.notes, f.is_completed, f.created_at
             FROM follow_ups f
             WHERE f.is_completed = 0
               AND (
                 (f.entity_type = 'client' AND EXISTS (
                     SELECT 1 FROM clients c WHERE c.id = f.entity_id AND c.user_id = ?1))
                 OR (f.entity_type = 'prospect' AND EXISTS (
                     SELECT 1 FROM prospects p WHERE p.id = f.entity_id AND p.user_id = ?1))
                 OR (f.entity_type = 'phoneNumber' AND EXISTS (
                     SELECT 1 FROM phone_numbers n WHERE n.id = f.entity_id AND n.user_id = ?1))
               )
             ORDER BY f.date",
        )?;
        let rows = stmt.query_map(params![user_id], Self::map_follow_up_row)?;

        let mut follow_ups = Vec::new();
        for row in rows {
            follow_ups.push(row?);
        }
        Ok(follow_ups)
    }

    /// Resolve the entity a follow-up points at, scoped to one user.
    ///
    /// Returns `None` when the referent is missing or owned by someone else
    /// — callers building "with details" views drop those rows.
    pub fn resolve_follow_up_target(
        &self,
        target: FollowUpTarget,
        user_id: i64,
    ) -> Result<Option<(String, String)>, DbError> {
        Ok(match target {
            FollowUpTarget::Client(id) => self
                .get_client(id)?
                .filter(|c| c.user_id == user_id)
                .map(|c| (c.name, c.phone)),
            FollowUpTarget::Prospect(id) => self
                .get_prospect(id)?
                .filter(|p| p.user_id == user_id)
                .map(|p| (p.name, p.phone)),
            FollowUpTarget::PhoneNumber(id) => self
                .get_phone_number(id)?
                .filter(|n| n.user_id == user_id)
                .map(|n| (n.number.clone(), n.number)),
        })
    }

    /// Pending follow-ups with resolved entity name and phone — the view the
    /// reminder scheduler consumes.
    pub fn list_pending_follow_ups_with_details(
        &self,
        user_id: i64,
    ) -> Result<Vec<FollowUpWithDetails>, DbError> {
        let pending = self.list_pending_follow_ups(user_id)?;
        let mut detailed = Vec::with_capacity(pending.len());
        for follow_up in pending {
            if let Some((entity_name, entity_phone)) =
                self.resolve_follow_up_target(follow_up.target, user_id)?
            {
                detailed.push(FollowUpWithDetails {
                    follow_up,
                    entity_name,
                    entity_phone,
                });
            }
        }
        Ok(detailed)
    }

    /// Apply a partial update (date and notes only; the target binding is
    /// immutable after creation). Unknown id is a zero-row no-op.
    pub fn update_follow_up(&self, id: i64, patch: &FollowUpPatch) -> Result<usize, DbError> {
        let mut sets: Vec<&'static str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(date) = &patch.date {
            sets.push("date = ?");
            values.push(Value::from(date.clone()));
        }
        if let Some(notes) = &patch.notes {
            sets.push("notes = ?");
            values.push(Value::from(notes.clone()));
        }

        if sets.is_empty() {
            return Ok(0);
        }

        let sql = format!("UPDATE follow_ups SET {} WHERE id = ?", sets.join(", "));
        values.push(Value::from(id));
        let changed = self
            .conn
            .execute(&sql, rusqlite::params_from_iter(values))?;
        Ok(changed)
    }

    /// Mark a follow-up completed. One-way and idempotent: completing twice
    /// is the same observable state as completing once.
    pub fn complete_follow_up(&self, id: i64) -> Result<(), DbError> {
        self.conn.execute(
            "UPDATE follow_ups SET is_completed = 1 WHERE id = ?1",
            params![id],
        )?;
        Ok(())
    }

    /// Complete every open follow-up addressed to one entity. Used when the
    /// entity is superseded (e.g. a phone number promoted to a prospect).
    pub(crate) fn complete_follow_ups_for_entity(
        &self,
        target: FollowUpTarget,
    ) -> Result<usize, DbError> {
        let changed = self.conn.execute(
            "UPDATE follow_ups SET is_completed = 1
             WHERE entity_type = ?1 AND entity_id = ?2 AND is_completed = 0",
            params![target.type_str(), target.entity_id()],
        )?;
        Ok(changed)
    }

    /// Delete a follow-up.
    pub fn delete_follow_up(&self, id: i64) -> Result<(), DbError> {
        self.conn
            .execute("DELETE FROM follow_ups WHERE id = ?1", params![id])?;
        Ok(())
    }
}
