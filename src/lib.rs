//! Local-first sales pipeline core.
//!
//! A single user's clients, prospects, sales, phone calls and follow-ups,
//! persisted to an on-device SQLite database. This crate is the data access
//! and domain-consistency layer only: screens, navigation, reminder delivery
//! and report formatting live in the host application and talk to this crate
//! through the repository and workflow APIs.
//!
//! The database is owned by [`db::SalesDb`] — one connection, opened at
//! process start, schema applied before the value is handed out. Multi-table
//! mutations (prospect conversion, call recording, cascading deletes) run
//! inside explicit transactions so a failure mid-sequence persists nothing.

pub mod analytics;
pub mod auth;
pub mod db;
pub mod export;
mod migrations;
pub mod notification;
pub mod workflows;

/// Initialize the `env_logger` backend for host binaries. Safe to call more
/// than once; repeat calls are ignored.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(cfg!(test)).try_init();
}
