//! Shared type definitions for the database layer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors specific to database and domain operations.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Failed to create database directory: {0}")]
    CreateDir(std::io::Error),

    #[error("Schema migration failed: {0}")]
    Migration(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Username already taken: {0}")]
    DuplicateUsername(String),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Sale amount must be positive, got {0}")]
    InvalidAmount(f64),

    #[error("Prospect status 'Won' is set by the conversion workflow only")]
    WonReserved,

    #[error("Prospect {0} has already been converted")]
    AlreadyConverted(i64),
}

impl DbError {
    pub(crate) fn not_found(entity: &'static str, id: i64) -> Self {
        DbError::NotFound { entity, id }
    }
}

/// Map an unrecognized TEXT value in a row to a rusqlite conversion error so
/// it propagates through `query_map` like any other column mismatch.
pub(crate) fn bad_text_value(idx: usize, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        format!("unrecognized value: {value}").into(),
    )
}

/// Pipeline stage of a prospect. `Won` is only ever written by the
/// prospect-to-client conversion workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProspectStatus {
    New,
    Contacted,
    Qualified,
    Won,
}

impl ProspectStatus {
    /// String label for SQL storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProspectStatus::New => "New",
            ProspectStatus::Contacted => "Contacted",
            ProspectStatus::Qualified => "Qualified",
            ProspectStatus::Won => "Won",
        }
    }

    /// Parse from SQL string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "New" => Some(ProspectStatus::New),
            "Contacted" => Some(ProspectStatus::Contacted),
            "Qualified" => Some(ProspectStatus::Qualified),
            "Won" => Some(ProspectStatus::Won),
            _ => None,
        }
    }
}

/// Outcome of a phone call, as logged from the dialer screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallFeedback {
    Successful,
    Busy,
    #[serde(rename = "Not Answered")]
    NotAnswered,
    #[serde(rename = "DNC")]
    Dnc,
    #[serde(rename = "Connected-Lead")]
    ConnectedLead,
}

impl CallFeedback {
    /// String label for SQL storage. These match the labels the call screen
    /// has always written, so old databases stay readable.
    pub fn as_str(&self) -> &'static str {
        match self {
            CallFeedback::Successful => "Successful",
            CallFeedback::Busy => "Busy",
            CallFeedback::NotAnswered => "Not Answered",
            CallFeedback::Dnc => "DNC",
            CallFeedback::ConnectedLead => "Connected-Lead",
        }
    }

    /// Parse from SQL string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Successful" => Some(CallFeedback::Successful),
            "Busy" => Some(CallFeedback::Busy),
            "Not Answered" => Some(CallFeedback::NotAnswered),
            "DNC" => Some(CallFeedback::Dnc),
            "Connected-Lead" => Some(CallFeedback::ConnectedLead),
            _ => None,
        }
    }
}

/// What a follow-up points at. Persisted as an (`entity_type`, `entity_id`)
/// pair; in Rust the pair is a tagged variant so an invalid tag cannot be
/// constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "entityType", content = "entityId", rename_all = "camelCase")]
pub enum FollowUpTarget {
    Client(i64),
    Prospect(i64),
    PhoneNumber(i64),
}

impl FollowUpTarget {
    /// Discriminator label for SQL storage.
    pub fn type_str(&self) -> &'static str {
        match self {
            FollowUpTarget::Client(_) => "client",
            FollowUpTarget::Prospect(_) => "prospect",
            FollowUpTarget::PhoneNumber(_) => "phoneNumber",
        }
    }

    /// The referenced row id.
    pub fn entity_id(&self) -> i64 {
        match self {
            FollowUpTarget::Client(id)
            | FollowUpTarget::Prospect(id)
            | FollowUpTarget::PhoneNumber(id) => *id,
        }
    }

    /// Reassemble from the stored (`entity_type`, `entity_id`) pair.
    pub fn from_parts(entity_type: &str, entity_id: i64) -> Option<Self> {
        match entity_type {
            "client" => Some(FollowUpTarget::Client(entity_id)),
            "prospect" => Some(FollowUpTarget::Prospect(entity_id)),
            "phoneNumber" => Some(FollowUpTarget::PhoneNumber(entity_id)),
            _ => None,
        }
    }
}

/// A row from the `users` table. `password_hash` never leaves the identity
/// layer; it is skipped during serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbUser {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    #[serde(default)]
    pub password_hash: String,
    pub name: String,
    pub created_at: String,
}

/// A row from the `clients` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbClient {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub company: String,
    pub industry: String,
    pub created_at: String,
}

/// A row from the `prospects` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbProspect {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub company: String,
    pub status: ProspectStatus,
    pub follow_up_date: Option<String>,
    pub created_at: String,
}

/// A row from the `sales` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbSale {
    pub id: i64,
    pub client_id: i64,
    pub date: String,
    pub amount: f64,
    pub product_or_service: String,
}

/// A row from the `phone_numbers` table. One row per (user, dialed number);
/// repeat calls update `last_called_date` instead of inserting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbPhoneNumber {
    pub id: i64,
    pub user_id: i64,
    pub number: String,
    pub last_called_date: Option<String>,
    pub is_prospect: bool,
    pub prospect_id: Option<i64>,
}

/// A row from the `call_logs` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbCallLog {
    pub id: i64,
    pub phone_number_id: i64,
    pub date: String,
    pub feedback: CallFeedback,
    /// Seconds, never negative.
    pub duration: i64,
    pub short_notes: String,
    pub next_follow_up_date: Option<String>,
}

/// A row from the `follow_ups` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbFollowUp {
    pub id: i64,
    #[serde(flatten)]
    pub target: FollowUpTarget,
    pub date: String,
    pub notes: String,
    pub is_completed: bool,
    pub created_at: String,
}

/// Resolved details of the entity a follow-up points at, for reminder and
/// list surfaces. Rows whose target no longer resolves are excluded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpWithDetails {
    #[serde(flatten)]
    pub follow_up: DbFollowUp,
    pub entity_name: String,
    pub entity_phone: String,
}

/// Partial update for a client. `None` fields are left untouched; a patch
/// with every field `None` is a no-op, not an error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientPatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub company: Option<String>,
    pub industry: Option<String>,
}

/// Partial update for a prospect. The `Won` status is reserved for the
/// conversion workflow and rejected here.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProspectPatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub company: Option<String>,
    pub status: Option<ProspectStatus>,
    pub follow_up_date: Option<String>,
}

/// Partial update for a sale.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalePatch {
    pub date: Option<String>,
    pub amount: Option<f64>,
    pub product_or_service: Option<String>,
}

/// Partial update for a follow-up. The target binding is immutable after
/// creation, so only date and notes are patchable.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpPatch {
    pub date: Option<String>,
    pub notes: Option<String>,
}

/// Caller-supplied fields for a sale created directly or by conversion.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSale {
    pub date: String,
    pub amount: f64,
    pub product_or_service: String,
}

/// Caller-supplied data for one recorded call.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallOutcome {
    pub date: String,
    pub feedback: CallFeedback,
    pub duration: i64,
    pub short_notes: String,
    pub next_follow_up_date: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prospect_status_round_trip() {
        for status in [
            ProspectStatus::New,
            ProspectStatus::Contacted,
            ProspectStatus::Qualified,
            ProspectStatus::Won,
        ] {
            assert_eq!(ProspectStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ProspectStatus::parse("Lost"), None);
    }

    #[test]
    fn test_call_feedback_labels() {
        assert_eq!(CallFeedback::NotAnswered.as_str(), "Not Answered");
        assert_eq!(CallFeedback::Dnc.as_str(), "DNC");
        assert_eq!(CallFeedback::ConnectedLead.as_str(), "Connected-Lead");
        assert_eq!(
            CallFeedback::parse("Connected-Lead"),
            Some(CallFeedback::ConnectedLead)
        );
        assert_eq!(CallFeedback::parse("connected-lead"), None);
    }

    #[test]
    fn test_follow_up_target_parts() {
        let target = FollowUpTarget::PhoneNumber(42);
        assert_eq!(target.type_str(), "phoneNumber");
        assert_eq!(target.entity_id(), 42);
        assert_eq!(
            FollowUpTarget::from_parts("phoneNumber", 42),
            Some(target)
        );
        assert_eq!(FollowUpTarget::from_parts("lead", 42), None);
    }

    #[test]
    fn test_follow_up_target_serde_tagging() {
        let json =
            serde_json::to_value(FollowUpTarget::Client(7)).expect("serialize");
        assert_eq!(json["entityType"], "client");
        assert_eq!(json["entityId"], 7);
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = DbUser {
            id: 1,
            username: "jane".to_string(),
            password_hash: "deadbeef".to_string(),
            name: "Jane".to_string(),
            created_at: "2026-01-01T00:00:00Z".to_string(),
        };
        let json = serde_json::to_string(&user).expect("serialize");
        assert!(!json.contains("deadbeef"));
    }
}
