//! This file defines a user of the application and its supporting types.

use std::fmt::Display;

use email_address::EmailAddress;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A newtype wrapper for integer user IDs.
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors, and more flexible generics that can have distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserID(i64);

impl UserID {
    /// Create a user ID from an integer.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// The user ID as an integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The coarse-grained permission tier of a user.
///
/// [Role::Admin] is the only elevated role: admins see all records and may
/// mutate transactions and users. [Role::User] is the default tier and is
/// restricted to their own records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// The default, lesser role. Sees and summarizes only their own records.
    User,
    /// The elevated role. Sees all records and may perform mutations.
    Admin,
}

impl Role {
    /// The role as the string stored in the database, e.g. "ADMIN".
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }

    /// Parse a role from its database/JSON representation.
    ///
    /// Returns `None` for anything other than "USER" or "ADMIN".
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "USER" => Some(Role::User),
            "ADMIN" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user of the application.
///
/// Users are created by the first successful external-identity login (upsert
/// semantics, keyed by email) and mutated by administrators or by the
/// identity-provider sync on later logins.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// The user's ID in the database.
    pub id: UserID,
    /// The user's display name.
    pub name: String,
    /// The user's email address. Unique across all users.
    pub email: EmailAddress,
    /// Whether the email was verified by the identity provider.
    pub email_verified: bool,
    /// A URL to the user's avatar image, if one was supplied.
    pub image: Option<String>,
    /// The user's permission tier.
    pub role: Role,
    /// An optional phone number.
    pub phone: Option<String>,
    /// When the user record was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When the user record was last updated.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl User {
    /// Whether this user holds the elevated [Role::Admin] tier.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// The fields used to create a user on first login or refresh an existing one
/// on later logins.
///
/// The upsert is keyed by email: a matching user gets their name and image
/// refreshed, a missing one is created with `role`.
#[derive(Clone, Debug, PartialEq)]
pub struct UserUpsert {
    /// The display name reported by the identity provider.
    pub name: String,
    /// The email address, possibly a synthetic fallback.
    pub email: EmailAddress,
    /// Whether the identity provider vouches for the email.
    pub email_verified: bool,
    /// A URL to the avatar image, if one was supplied.
    pub image: Option<String>,
    /// The role to assign if the user does not exist yet.
    pub role: Role,
}
