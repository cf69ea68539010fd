//! This file defines the session record, the proof of authentication that
//! binds a client to a user.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::models::UserID;

/// A time-bounded proof of authentication.
///
/// A session is valid if and only if the current time is strictly before
/// `expires_at`. Sessions are created at login with a fixed validity window,
/// read on every authenticated request, never extended by reads, and
/// destroyed on sign-out. Expired rows are simply ignored by lookups.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// The opaque token stored in the client's cookie.
    pub token: String,
    /// The user this session belongs to.
    pub user_id: UserID,
    /// The absolute time after which this session no longer resolves.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    /// The address the session was created from.
    pub ip_address: String,
    /// The client identifier string the session was created with.
    pub user_agent: String,
    /// When the session was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Session {
    /// Whether the session is still valid at `now`.
    ///
    /// The boundary is exclusive: a session whose expiry equals `now` is
    /// already expired.
    pub fn is_valid_at(&self, now: OffsetDateTime) -> bool {
        now < self.expires_at
    }
}
