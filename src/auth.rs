//! Identity: signup, signin, and the password-reset token cache.
//!
//! Passwords are stored as a one-way SHA-256 digest over
//! `username:password` — the username acts as a static per-user salt so two
//! users with the same password never share a hash. Raw passwords exist
//! only transiently in these functions; the store below only ever sees the
//! digest.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use crate::db::{DbError, DbUser, SalesDb};

/// One-way digest for credential storage. Deterministic: the same
/// (username, password) pair always produces the same hex string.
pub fn hash_password(username: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(username.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Create an account. Fails with `DuplicateUsername` when the username is
/// taken. The returned user never carries the raw password.
pub fn signup(db: &SalesDb, username: &str, password: &str, name: &str) -> Result<DbUser, DbError> {
    let hash = hash_password(username, password);
    db.insert_user(username, &hash, name)
}

/// Verify credentials. Unknown usernames and wrong passwords produce the
/// same `InvalidCredentials` error so callers cannot enumerate accounts
/// from the failure message.
pub fn signin(db: &SalesDb, username: &str, password: &str) -> Result<DbUser, DbError> {
    let user = db
        .get_user_by_username(username)?
        .ok_or(DbError::InvalidCredentials)?;
    if user.password_hash != hash_password(username, password) {
        return Err(DbError::InvalidCredentials);
    }
    Ok(user)
}

/// In-memory cache of outstanding password-reset tokens.
///
/// Tokens are opaque uuid-v4 strings, single-use, and expire after the
/// configured TTL. The cache is process-local: a restart invalidates every
/// outstanding token, which is acceptable for a single-device app.
pub struct ResetTokenCache {
    ttl: Duration,
    tokens: Mutex<HashMap<String, (i64, DateTime<Utc>)>>,
}

impl ResetTokenCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            tokens: Mutex::new(HashMap::new()),
        }
    }

    /// Issue a fresh token for a user. Any previously issued token for the
    /// same user stays valid until it expires or is consumed.
    pub fn issue(&self, user_id: i64) -> String {
        let token = uuid::Uuid::new_v4().to_string();
        let expires_at = Utc::now() + self.ttl;
        self.tokens
            .lock()
            .insert(token.clone(), (user_id, expires_at));
        token
    }

    /// Redeem a token, removing it from the cache. Returns the user it was
    /// issued for, or `None` when the token is unknown or expired.
    pub fn consume(&self, token: &str) -> Option<i64> {
        let mut tokens = self.tokens.lock();
        let now = Utc::now();
        tokens.retain(|_, (_, expires_at)| *expires_at > now);
        tokens.remove(token).map(|(user_id, _)| user_id)
    }
}

/// Apply a password reset: redeem the token, then overwrite the stored
/// hash. An unknown or expired token fails with `InvalidCredentials` and
/// writes nothing.
pub fn reset_password(
    db: &SalesDb,
    cache: &ResetTokenCache,
    token: &str,
    new_password: &str,
) -> Result<(), DbError> {
    let user_id = cache.consume(token).ok_or(DbError::InvalidCredentials)?;
    let user = db
        .get_user(user_id)?
        .ok_or_else(|| DbError::not_found("user", user_id))?;
    let hash = hash_password(&user.username, new_password);
    db.update_password(user_id, &hash)?;
    log::info!("Password reset applied for user {}", user_id);
    Ok(())
}
