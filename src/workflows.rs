//! Cross-entity workflows.
//!
//! Everything here mutates more than one table, so every method body runs
//! inside [`SalesDb::with_transaction`]: either the whole sequence commits
//! or none of it is visible. Reminder reconciliation happens once, after
//! commit — the bridge never sees uncommitted state and never misses a
//! committed change.

use crate::db::{
    CallOutcome, DbCallLog, DbClient, DbError, DbFollowUp, DbPhoneNumber, DbProspect, DbSale,
    FollowUpPatch, FollowUpTarget, NewSale, SalesDb,
};
use crate::notification::NotificationBridge;

use serde::Serialize;

/// Industry recorded on clients created by prospect conversion; the caller
/// fills in the real value later from the client edit screen.
const CONVERTED_CLIENT_INDUSTRY: &str = "Unspecified";

/// Everything a prospect conversion produced, returned so the caller can
/// render the result without re-querying.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionOutcome {
    pub client: DbClient,
    pub sale: DbSale,
    pub prospect: DbProspect,
}

/// What one `record_call` persisted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedCall {
    pub phone_number: DbPhoneNumber,
    pub call_log: DbCallLog,
    pub follow_up: Option<DbFollowUp>,
}

/// Owns the store and the reminder bridge; the single entry point for
/// multi-table mutations.
pub struct Workflows {
    db: SalesDb,
    bridge: Box<dyn NotificationBridge>,
}

impl Workflows {
    pub fn new(db: SalesDb, bridge: Box<dyn NotificationBridge>) -> Self {
        Self { db, bridge }
    }

    /// Borrow the store for reads and single-table repository operations.
    pub fn db(&self) -> &SalesDb {
        &self.db
    }

    /// Recompute the pending view and hand it to the bridge. Bridge failures
    /// are logged and swallowed — reminder delivery is best-effort and must
    /// never fail a committed workflow.
    fn reconcile_reminders(&self, user_id: i64) -> Result<(), DbError> {
        let pending = self.db.list_pending_follow_ups_with_details(user_id)?;
        if let Err(e) = self.bridge.reconcile(&pending) {
            log::warn!("Reminder reconciliation failed (ignored): {}", e);
        }
        Ok(())
    }

    // =========================================================================
    // Conversions
    // =========================================================================

    /// Promote a prospect to a client and record the closing sale.
    ///
    /// Reads the prospect, creates a client from its contact fields, creates
    /// the sale against the new client, and stamps the prospect `Won` — all
    /// in one transaction, so concurrent or crashing callers can never
    /// observe a client without its sale or a `Won` prospect without either.
    pub fn convert_prospect_to_client(
        &self,
        prospect_id: i64,
        sale: &NewSale,
    ) -> Result<ConversionOutcome, DbError> {
        let outcome = self.db.with_transaction(|db| {
            let prospect = db
                .get_prospect(prospect_id)?
                .ok_or_else(|| DbError::not_found("prospect", prospect_id))?;
            if prospect.status == crate::db::ProspectStatus::Won {
                return Err(DbError::AlreadyConverted(prospect_id));
            }

            let client = db.add_client(
                prospect.user_id,
                &prospect.name,
                &prospect.phone,
                &prospect.email,
                &prospect.company,
                CONVERTED_CLIENT_INDUSTRY,
            )?;
            let sale = db.add_sale(client.id, sale)?;
            db.mark_prospect_won(prospect_id)?;

            let prospect = db
                .get_prospect(prospect_id)?
                .ok_or_else(|| DbError::not_found("prospect", prospect_id))?;

            Ok(ConversionOutcome {
                client,
                sale,
                prospect,
            })
        })?;
        log::info!(
            "Converted prospect {} to client {} with sale {}",
            prospect_id,
            outcome.client.id,
            outcome.sale.id
        );
        Ok(outcome)
    }

    /// Promote a dialed number to a prospect.
    ///
    /// Marks the number as promoted and completes its open follow-ups (the
    /// prospect supersedes the raw number as the thing being tracked), in
    /// one transaction. The pending reminder set shrinks, so the bridge is
    /// reconciled after commit.
    pub fn convert_phone_number_to_prospect(
        &self,
        phone_number_id: i64,
        name: &str,
        email: &str,
        company: &str,
    ) -> Result<DbProspect, DbError> {
        let (prospect, user_id) = self.db.with_transaction(|db| {
            let number = db
                .get_phone_number(phone_number_id)?
                .ok_or_else(|| DbError::not_found("phone number", phone_number_id))?;

            let prospect =
                db.add_prospect(number.user_id, name, &number.number, email, company, None)?;
            db.mark_phone_number_promoted(phone_number_id, prospect.id)?;
            db.complete_follow_ups_for_entity(FollowUpTarget::PhoneNumber(phone_number_id))?;

            Ok((prospect, number.user_id))
        })?;
        log::info!(
            "Converted phone number {} to prospect {}",
            phone_number_id,
            prospect.id
        );
        self.reconcile_reminders(user_id)?;
        Ok(prospect)
    }

    // =========================================================================
    // Call recording
    // =========================================================================

    /// Record one call against a raw dialed number.
    ///
    /// Looks up or creates the owning phone-number row (stamping
    /// `last_called_date`), inserts the call log, and — when the outcome
    /// carries a next follow-up date — inserts a follow-up addressed to the
    /// number. Atomic: a crash mid-sequence must not leave a call log
    /// without its number or a follow-up without its call log.
    pub fn record_call(
        &self,
        user_id: i64,
        number: &str,
        outcome: &CallOutcome,
    ) -> Result<RecordedCall, DbError> {
        let recorded = self.db.with_transaction(|db| {
            let phone_number = db.upsert_phone_number(user_id, number, &outcome.date)?;
            let call_log = db.add_call_log(phone_number.id, outcome)?;

            let follow_up = match &outcome.next_follow_up_date {
                Some(date) => Some(db.add_follow_up(
                    FollowUpTarget::PhoneNumber(phone_number.id),
                    date,
                    &outcome.short_notes,
                )?),
                None => None,
            };

            Ok(RecordedCall {
                phone_number,
                call_log,
                follow_up,
            })
        })?;

        if recorded.follow_up.is_some() {
            self.reconcile_reminders(user_id)?;
        }
        Ok(recorded)
    }

    // =========================================================================
    // Follow-up lifecycle
    // =========================================================================

    /// Create a follow-up and refresh reminders.
    pub fn create_follow_up(
        &self,
        user_id: i64,
        target: FollowUpTarget,
        date: &str,
        notes: &str,
    ) -> Result<DbFollowUp, DbError> {
        let follow_up = self.db.add_follow_up(target, date, notes)?;
        self.reconcile_reminders(user_id)?;
        Ok(follow_up)
    }

    /// Patch a follow-up's date/notes and refresh reminders.
    pub fn update_follow_up(
        &self,
        user_id: i64,
        id: i64,
        patch: &FollowUpPatch,
    ) -> Result<usize, DbError> {
        let changed = self.db.update_follow_up(id, patch)?;
        if changed > 0 {
            self.reconcile_reminders(user_id)?;
        }
        Ok(changed)
    }

    /// Complete a follow-up (idempotent) and refresh reminders.
    pub fn complete_follow_up(&self, user_id: i64, id: i64) -> Result<(), DbError> {
        self.db.complete_follow_up(id)?;
        self.reconcile_reminders(user_id)
    }

    /// Delete a follow-up and refresh reminders. The bridge is only invoked
    /// after the row is gone, so it can never schedule a reminder for a
    /// deleted follow-up.
    pub fn delete_follow_up(&self, user_id: i64, id: i64) -> Result<(), DbError> {
        self.db.delete_follow_up(id)?;
        self.reconcile_reminders(user_id)
    }

    // =========================================================================
    // Deletes that cascade into follow-ups
    // =========================================================================

    /// Delete a client (cascading its sales and follow-ups) and refresh
    /// reminders.
    pub fn delete_client(&self, user_id: i64, id: i64) -> Result<(), DbError> {
        self.db.delete_client(id)?;
        self.reconcile_reminders(user_id)
    }

    /// Delete a prospect (cascading its follow-ups) and refresh reminders.
    pub fn delete_prospect(&self, user_id: i64, id: i64) -> Result<(), DbError> {
        self.db.delete_prospect(id)?;
        self.reconcile_reminders(user_id)
    }

    /// Delete a phone number (cascading its call logs and follow-ups) and
    /// refresh reminders.
    pub fn delete_phone_number(&self, user_id: i64, id: i64) -> Result<(), DbError> {
        self.db.delete_phone_number(id)?;
        self.reconcile_reminders(user_id)
    }
}
