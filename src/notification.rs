//! Follow-up reminder bridge.
//!
//! The core does not schedule device reminders itself. After every committed
//! mutation that changes the pending follow-up set, the workflow layer hands
//! the fresh "pending with resolved entity details" view to a bridge, and
//! the host platform schedules or cancels reminders to match. Delivery is
//! best-effort: a bridge failure is logged, never surfaced as a core error.

use crate::db::FollowUpWithDetails;

/// Receiver for the pending follow-up view.
pub trait NotificationBridge {
    /// Called with the complete current pending set (not a delta) after
    /// every follow-up-affecting commit.
    fn reconcile(&self, pending: &[FollowUpWithDetails]) -> Result<(), String>;
}

/// Bridge that only logs. Useful as a default wiring and in tests that
/// don't assert on reminder behavior.
pub struct LogBridge;

impl NotificationBridge for LogBridge {
    fn reconcile(&self, pending: &[FollowUpWithDetails]) -> Result<(), String> {
        log::info!("Reconciling reminders for {} pending follow-ups", pending.len());
        Ok(())
    }
}

/// Bridge that does nothing at all.
pub struct NullBridge;

impl NotificationBridge for NullBridge {
    fn reconcile(&self, _pending: &[FollowUpWithDetails]) -> Result<(), String> {
        Ok(())
    }
}
