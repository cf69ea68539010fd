//! The authorization gate: converts a resolved session plus a requested
//! operation into an allow/deny decision and a data-visibility scope.
//!
//! Every protected route handler goes through these functions instead of
//! re-implementing role comparisons inline.

use crate::{
    Error,
    auth::resolver::AuthSession,
    models::{User, UserID},
};

/// The visibility restriction applied to a query based on role.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Scope {
    /// Every record is visible. Granted to admins only.
    All,
    /// Only records owned by the given user are visible.
    Own(UserID),
}

impl Scope {
    /// The owner filter to apply to a store query: `None` means unrestricted.
    pub(crate) fn user_filter(self) -> Option<UserID> {
        match self {
            Scope::All => None,
            Scope::Own(user_id) => Some(user_id),
        }
    }
}

/// Require that the request carries a valid session.
///
/// # Errors
/// Returns [Error::Unauthenticated] (401) if `session` is `None`.
pub(crate) fn require_authenticated(session: Option<&AuthSession>) -> Result<&User, Error> {
    session
        .map(|session| &session.user)
        .ok_or(Error::Unauthenticated)
}

/// Require that the request carries a valid session belonging to an admin.
///
/// # Errors
/// Returns [Error::Unauthenticated] (401) if `session` is `None`, or
/// [Error::Forbidden] (403) if the session's user is not an admin.
pub(crate) fn require_admin(session: Option<&AuthSession>) -> Result<&User, Error> {
    let user = require_authenticated(session)?;

    if !user.is_admin() {
        return Err(Error::Forbidden("Forbidden: Admin access required"));
    }

    Ok(user)
}

/// The visibility scope for `user`: admins see all records, everyone else
/// sees only their own.
pub(crate) fn scope_for(user: &User) -> Scope {
    if user.is_admin() {
        Scope::All
    } else {
        Scope::Own(user.id)
    }
}

/// The visibility scope for a request that may name a specific record owner.
///
/// With no `requested_owner` this is [scope_for]. An admin may request any
/// owner's records; a non-admin may only request their own.
///
/// # Errors
/// Returns [Error::Forbidden] (403) if a non-admin requests records owned by
/// someone else.
pub(crate) fn scope_for_request(
    user: &User,
    requested_owner: Option<UserID>,
) -> Result<Scope, Error> {
    let owner = match requested_owner {
        Some(owner) => owner,
        None => return Ok(scope_for(user)),
    };

    if user.is_admin() || owner == user.id {
        Ok(Scope::Own(owner))
    } else {
        Err(Error::Forbidden("Forbidden: own records only"))
    }
}
