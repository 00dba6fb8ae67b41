//! Read-only snapshots for the report/CSV collaborator.
//!
//! The exporter lives outside the core and only ever needs a consistent
//! picture of one user's data. It gets a value, not a connection — no write
//! path leaks out of this module.

use serde::Serialize;

use crate::db::{
    DbCallLog, DbClient, DbError, DbFollowUp, DbPhoneNumber, DbProspect, DbSale, SalesDb,
};

/// Everything a report covers, cloned out of the store in one pass.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSnapshot {
    pub clients: Vec<DbClient>,
    pub prospects: Vec<DbProspect>,
    pub sales: Vec<DbSale>,
    pub phone_numbers: Vec<DbPhoneNumber>,
    pub call_logs: Vec<DbCallLog>,
    pub follow_ups: Vec<DbFollowUp>,
}

/// Assemble a snapshot of one user's data. Follow-ups include completed
/// rows — reports show history, not just the pending set.
pub fn export_snapshot(db: &SalesDb, user_id: i64) -> Result<ExportSnapshot, DbError> {
    let clients = db.list_clients(user_id)?;
    let prospects = db.list_prospects(user_id)?;
    let sales = db.list_sales_for_user(user_id, None, None)?;
    let phone_numbers = db.list_phone_numbers(user_id)?;
    let call_logs = db.list_call_logs_for_user(user_id)?;

    let mut follow_ups = Vec::new();
    for client in &clients {
        follow_ups.extend(
            db.list_follow_ups_for_entity(crate::db::FollowUpTarget::Client(client.id))?,
        );
    }
    for prospect in &prospects {
        follow_ups.extend(
            db.list_follow_ups_for_entity(crate::db::FollowUpTarget::Prospect(prospect.id))?,
        );
    }
    for number in &phone_numbers {
        follow_ups.extend(
            db.list_follow_ups_for_entity(crate::db::FollowUpTarget::PhoneNumber(number.id))?,
        );
    }

    Ok(ExportSnapshot {
        clients,
        prospects,
        sales,
        phone_numbers,
        call_logs,
        follow_ups,
    })
}
