use rusqlite::params;

use super::*;

impl SalesDb {
    // =========================================================================
    // Call logs
    // =========================================================================

    fn map_call_log_row(row: &rusqlite::Row) -> rusqlite::Result<DbCallLog> {
        let feedback: String = row.get(3)?;
        Ok(DbCallLog {
            id: row.get(0)?,
            phone_number_id: row.get(1)?,
            date: row.get(2)?,
            feedback: CallFeedback::parse(&feedback).ok_or_else(|| bad_text_value(3, &feedback))?,
            duration: row.get(4)?,
            short_notes: row.get(5)?,
            next_follow_up_date: row.get(6)?,
        })
    }

    /// Insert a call log against a phone number and return the populated
    /// row. Durations below zero are clamped; the dialer reports elapsed
    /// seconds and never legitimately goes negative.
    pub fn add_call_log(
        &self,
        phone_number_id: i64,
        outcome: &CallOutcome,
    ) -> Result<DbCallLog, DbError> {
        let duration = outcome.duration.max(0);
        self.conn.execute(
            "INSERT INTO call_logs (phone_number_id, date, feedback, duration, short_notes, next_follow_up_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                phone_number_id,
                outcome.date,
                outcome.feedback.as_str(),
                duration,
                outcome.short_notes,
                outcome.next_follow_up_date
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        Ok(DbCallLog {
            id,
            phone_number_id,
            date: outcome.date.clone(),
            feedback: outcome.feedback,
            duration,
            short_notes: outcome.short_notes.clone(),
            next_follow_up_date: outcome.next_follow_up_date.clone(),
        })
    }

    /// Get a call log by id.
    pub fn get_call_log(&self, id: i64) -> Result<Option<DbCallLog>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, phone_number_id, date, feedback, duration, short_notes, next_follow_up_date
             FROM call_logs WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id], Self::map_call_log_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// List the calls made to one number, most recent first.
    pub fn list_call_logs_for_number(
        &self,
        phone_number_id: i64,
    ) -> Result<Vec<DbCallLog>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, phone_number_id, date, feedback, duration, short_notes, next_follow_up_date
             FROM call_logs
             WHERE phone_number_id = ?1
             ORDER BY date DESC",
        )?;
        let rows = stmt.query_map(params![phone_number_id], Self::map_call_log_row)?;

        let mut logs = Vec::new();
        for row in rows {
            logs.push(row?);
        }
        Ok(logs)
    }

    /// List every call a user has made, most recent first (joins through
    /// the number's owner).
    pub fn list_call_logs_for_user(&self, user_id: i64) -> Result<Vec<DbCallLog>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT l.id, l.phone_number_id, l.date, l.feedback, l.duration, l.short_notes, l.next_follow_up_date
             FROM call_logs l
             JOIN phone_numbers n ON n.id = l.phone_number_id
             WHERE n.user_id = ?1
             ORDER BY l.date DESC",
        )?;
        let rows = stmt.query_map(params![user_id], Self::map_call_log_row)?;

        let mut logs = Vec::new();
        for row in rows {
            logs.push(row?);
        }
        Ok(logs)
    }

    /// List a user's calls on one UTC calendar day (`YYYY-MM-DD`).
    ///
    /// Timestamps are stored in UTC, so "day" here means the UTC date of
    /// the call; a call at 23:30 local that crosses midnight UTC counts
    /// toward the UTC day it landed on.
    pub fn list_call_logs_for_user_on_day(
        &self,
        user_id: i64,
        day: &str,
    ) -> Result<Vec<DbCallLog>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT l.id, l.phone_number_id, l.date, l.feedback, l.duration, l.short_notes, l.next_follow_up_date
             FROM call_logs l
             JOIN phone_numbers n ON n.id = l.phone_number_id
             WHERE n.user_id = ?1
               AND date(l.date) = ?2
             ORDER BY l.date",
        )?;
        let rows = stmt.query_map(params![user_id, day], Self::map_call_log_row)?;

        let mut logs = Vec::new();
        for row in rows {
            logs.push(row?);
        }
        Ok(logs)
    }

    /// Delete a call log.
    pub fn delete_call_log(&self, id: i64) -> Result<(), DbError> {
        self.conn
            .execute("DELETE FROM call_logs WHERE id = ?1", params![id])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::{seed_user, test_db};
    use super::*;

    fn outcome(date: &str, feedback: CallFeedback) -> CallOutcome {
        CallOutcome {
            date: date.to_string(),
            feedback,
            duration: 45,
            short_notes: "".to_string(),
            next_follow_up_date: None,
        }
    }

    #[test]
    fn test_add_and_list_most_recent_first() {
        let db = test_db();
        let user = seed_user(&db, "jane");
        let number = db
            .upsert_phone_number(user.id, "0700111222", "2026-08-01T09:00:00Z")
            .expect("number");

        db.add_call_log(number.id, &outcome("2026-08-01T09:00:00Z", CallFeedback::Busy))
            .expect("log 1");
        db.add_call_log(
            number.id,
            &outcome("2026-08-02T09:00:00Z", CallFeedback::Successful),
        )
        .expect("log 2");

        let logs = db.list_call_logs_for_number(number.id).expect("list");
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].feedback, CallFeedback::Successful);
        assert_eq!(logs[1].feedback, CallFeedback::Busy);
    }

    #[test]
    fn test_feedback_round_trips_through_storage() {
        let db = test_db();
        let user = seed_user(&db, "jane");
        let number = db
            .upsert_phone_number(user.id, "0700111222", "2026-08-01T09:00:00Z")
            .expect("number");

        for feedback in [
            CallFeedback::Successful,
            CallFeedback::Busy,
            CallFeedback::NotAnswered,
            CallFeedback::Dnc,
            CallFeedback::ConnectedLead,
        ] {
            let log = db
                .add_call_log(number.id, &outcome("2026-08-01T10:00:00Z", feedback))
                .expect("add");
            let reloaded = db.get_call_log(log.id).expect("get").expect("exists");
            assert_eq!(reloaded.feedback, feedback);
        }
    }

    #[test]
    fn test_negative_duration_clamped() {
        let db = test_db();
        let user = seed_user(&db, "jane");
        let number = db
            .upsert_phone_number(user.id, "0700111222", "2026-08-01T09:00:00Z")
            .expect("number");

        let log = db
            .add_call_log(
                number.id,
                &CallOutcome {
                    duration: -10,
                    ..outcome("2026-08-01T09:00:00Z", CallFeedback::Busy)
                },
            )
            .expect("add");
        assert_eq!(log.duration, 0);
    }

    #[test]
    fn test_day_filter_uses_utc_date() {
        let db = test_db();
        let user = seed_user(&db, "jane");
        let number = db
            .upsert_phone_number(user.id, "0700111222", "2026-08-01T09:00:00Z")
            .expect("number");

        // Two calls on the 1st (one just before midnight UTC), one on the 2nd
        db.add_call_log(number.id, &outcome("2026-08-01T09:00:00+00:00", CallFeedback::Busy))
            .expect("log");
        db.add_call_log(
            number.id,
            &outcome("2026-08-01T23:59:00+00:00", CallFeedback::Successful),
        )
        .expect("log");
        db.add_call_log(
            number.id,
            &outcome("2026-08-02T00:01:00+00:00", CallFeedback::NotAnswered),
        )
        .expect("log");

        let day_one = db
            .list_call_logs_for_user_on_day(user.id, "2026-08-01")
            .expect("query");
        assert_eq!(day_one.len(), 2);

        let day_two = db
            .list_call_logs_for_user_on_day(user.id, "2026-08-02")
            .expect("query");
        assert_eq!(day_two.len(), 1);
        assert_eq!(day_two[0].feedback, CallFeedback::NotAnswered);
    }

    #[test]
    fn test_user_scope_on_call_listing() {
        let db = test_db();
        let a = seed_user(&db, "a");
        let b = seed_user(&db, "b");
        let na = db
            .upsert_phone_number(a.id, "0700000001", "2026-08-01T09:00:00Z")
            .expect("number a");
        let nb = db
            .upsert_phone_number(b.id, "0700000002", "2026-08-01T09:00:00Z")
            .expect("number b");

        db.add_call_log(na.id, &outcome("2026-08-01T09:00:00Z", CallFeedback::Busy))
            .expect("log a");
        db.add_call_log(nb.id, &outcome("2026-08-01T10:00:00Z", CallFeedback::Busy))
            .expect("log b");

        let for_a = db.list_call_logs_for_user(a.id).expect("list");
        assert_eq!(for_a.len(), 1);
        assert_eq!(for_a[0].phone_number_id, na.id);
    }
}
