use rusqlite::params;

use super::*;

impl SalesDb {
    // =========================================================================
    // Phone numbers
    // =========================================================================

    fn map_phone_number_row(row: &rusqlite::Row) -> rusqlite::Result<DbPhoneNumber> {
        Ok(DbPhoneNumber {
            id: row.get(0)?,
            user_id: row.get(1)?,
            number: row.get(2)?,
            last_called_date: row.get(3)?,
            is_prospect: row.get::<_, i64>(4)? != 0,
            prospect_id: row.get(5)?,
        })
    }

    /// Look up or create the row for a dialed number and stamp
    /// `last_called_date`. `(user_id, number)` is unique — a repeat call
    /// lands on the ON CONFLICT update path instead of raising a constraint
    /// error, so the lookup-or-create can never race itself into a failure.
    pub fn upsert_phone_number(
        &self,
        user_id: i64,
        number: &str,
        called_at: &str,
    ) -> Result<DbPhoneNumber, DbError> {
        self.conn.execute(
            "INSERT INTO phone_numbers (user_id, number, last_called_date)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id, number) DO UPDATE SET
                last_called_date = excluded.last_called_date",
            params![user_id, number, called_at],
        )?;
        // Re-read rather than trusting last_insert_rowid: on the conflict
        // path no row was inserted.
        self.get_phone_number_by_number(user_id, number)?
            .ok_or_else(|| DbError::not_found("phone number", 0))
    }

    /// Get a phone number by id.
    pub fn get_phone_number(&self, id: i64) -> Result<Option<DbPhoneNumber>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, number, last_called_date, is_prospect, prospect_id
             FROM phone_numbers WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id], Self::map_phone_number_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Look up a number within one user's partition.
    pub fn get_phone_number_by_number(
        &self,
        user_id: i64,
        number: &str,
    ) -> Result<Option<DbPhoneNumber>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, number, last_called_date, is_prospect, prospect_id
             FROM phone_numbers
             WHERE user_id = ?1 AND number = ?2",
        )?;
        let mut rows = stmt.query_map(params![user_id, number], Self::map_phone_number_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// List a user's called numbers, most recently called first.
    pub fn list_phone_numbers(&self, user_id: i64) -> Result<Vec<DbPhoneNumber>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, number, last_called_date, is_prospect, prospect_id
             FROM phone_numbers
             WHERE user_id = ?1
             ORDER BY last_called_date DESC",
        )?;
        let rows = stmt.query_map(params![user_id], Self::map_phone_number_row)?;

        let mut numbers = Vec::new();
        for row in rows {
            numbers.push(row?);
        }
        Ok(numbers)
    }

    /// Record that a number was promoted to a prospect. One-way; conversion
    /// workflow only.
    pub(crate) fn mark_phone_number_promoted(
        &self,
        id: i64,
        prospect_id: i64,
    ) -> Result<usize, DbError> {
        let changed = self.conn.execute(
            "UPDATE phone_numbers SET is_prospect = 1, prospect_id = ?1 WHERE id = ?2",
            params![prospect_id, id],
        )?;
        Ok(changed)
    }

    /// Delete a number together with its call logs and the follow-ups
    /// addressed to it, in one transaction.
    pub fn delete_phone_number(&self, id: i64) -> Result<(), DbError> {
        self.with_transaction(|db| {
            db.conn.execute(
                "DELETE FROM call_logs WHERE phone_number_id = ?1",
                params![id],
            )?;
            db.conn.execute(
                "DELETE FROM follow_ups WHERE entity_type = 'phoneNumber' AND entity_id = ?1",
                params![id],
            )?;
            db.conn
                .execute("DELETE FROM phone_numbers WHERE id = ?1", params![id])?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::{seed_user, test_db};
    use super::*;

    #[test]
    fn test_upsert_creates_then_updates() {
        let db = test_db();
        let user = seed_user(&db, "jane");

        let first = db
            .upsert_phone_number(user.id, "0700111222", "2026-08-01T09:00:00Z")
            .expect("first call");
        assert_eq!(
            first.last_called_date.as_deref(),
            Some("2026-08-01T09:00:00Z")
        );

        let second = db
            .upsert_phone_number(user.id, "0700111222", "2026-08-03T14:30:00Z")
            .expect("second call");
        assert_eq!(second.id, first.id, "same row, not a new insert");
        assert_eq!(
            second.last_called_date.as_deref(),
            Some("2026-08-03T14:30:00Z")
        );

        let count: i64 = db
            .conn_ref()
            .query_row("SELECT COUNT(*) FROM phone_numbers", [], |r| r.get(0))
            .expect("count");
        assert_eq!(count, 1);
    }

    #[test]
    fn test_same_number_different_users_is_two_rows() {
        let db = test_db();
        let a = seed_user(&db, "a");
        let b = seed_user(&db, "b");

        let pa = db
            .upsert_phone_number(a.id, "0700111222", "2026-08-01T09:00:00Z")
            .expect("a");
        let pb = db
            .upsert_phone_number(b.id, "0700111222", "2026-08-01T09:00:00Z")
            .expect("b");
        assert_ne!(pa.id, pb.id);
    }

    #[test]
    fn test_list_most_recently_called_first() {
        let db = test_db();
        let user = seed_user(&db, "jane");

        db.upsert_phone_number(user.id, "0700000001", "2026-08-01T09:00:00Z")
            .expect("one");
        db.upsert_phone_number(user.id, "0700000002", "2026-08-02T09:00:00Z")
            .expect("two");

        let numbers = db.list_phone_numbers(user.id).expect("list");
        assert_eq!(numbers.len(), 2);
        assert_eq!(numbers[0].number, "0700000002");
    }

    #[test]
    fn test_promotion_flags() {
        let db = test_db();
        let user = seed_user(&db, "jane");
        let number = db
            .upsert_phone_number(user.id, "0700111222", "2026-08-01T09:00:00Z")
            .expect("upsert");
        assert!(!number.is_prospect);

        db.mark_phone_number_promoted(number.id, 77).expect("mark");

        let reloaded = db
            .get_phone_number(number.id)
            .expect("get")
            .expect("exists");
        assert!(reloaded.is_prospect);
        assert_eq!(reloaded.prospect_id, Some(77));
    }

    #[test]
    fn test_delete_cascades_logs_and_follow_ups() {
        let db = test_db();
        let user = seed_user(&db, "jane");
        let number = db
            .upsert_phone_number(user.id, "0700111222", "2026-08-01T09:00:00Z")
            .expect("upsert");
        db.add_call_log(
            number.id,
            &CallOutcome {
                date: "2026-08-01T09:00:00Z".to_string(),
                feedback: CallFeedback::Busy,
                duration: 0,
                short_notes: String::new(),
                next_follow_up_date: None,
            },
        )
        .expect("log");
        db.add_follow_up(
            FollowUpTarget::PhoneNumber(number.id),
            "2026-08-05T09:00:00Z",
            "Retry",
        )
        .expect("follow-up");

        db.delete_phone_number(number.id).expect("delete");

        let logs: i64 = db
            .conn_ref()
            .query_row("SELECT COUNT(*) FROM call_logs", [], |r| r.get(0))
            .expect("count");
        assert_eq!(logs, 0);
        let fups: i64 = db
            .conn_ref()
            .query_row("SELECT COUNT(*) FROM follow_ups", [], |r| r.get(0))
            .expect("count");
        assert_eq!(fups, 0);
    }
}
