//! Maps an inbound request's cookie header to a verified session, or reports
//! that no valid session exists.

use std::time::Duration;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::COOKIE, request::Parts},
};
use serde::Serialize;
use time::OffsetDateTime;
use tokio::{task, time::timeout};

use crate::{
    AppState, Error,
    auth::cookie::extract_session_token,
    models::User,
    stores::{SessionStore, UserStore},
};

/// A verified, non-expired session: the proof that `user` is authenticated
/// until `expires_at`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub(crate) struct AuthSession {
    /// The authenticated user.
    pub user: User,
    /// When the session stops being valid.
    #[serde(rename = "expires", with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

/// The internal outcome of a session resolution.
///
/// Callers of [SessionResolver::resolve_session] only see a yes/no answer,
/// but the degraded case must stay distinguishable internally so that a
/// storage fault is never logged as a plain unauthenticated request.
#[derive(Debug, PartialEq)]
pub(crate) enum Resolution {
    /// A valid, non-expired session owned by an existing user.
    Session(AuthSession),
    /// No cookie, an unknown token, or an expired session. These are
    /// deliberately indistinguishable.
    NoSession,
    /// The session store was unreachable or timed out.
    Degraded(String),
}

/// Resolves session cookies against the session and user stores.
///
/// Lookups run on a blocking task bounded by a timeout so a degraded store
/// cannot hang the enclosing request. The resolver is read-only: resolving a
/// session never extends it.
#[derive(Clone, Debug)]
pub(crate) struct SessionResolver<S, U> {
    sessions: S,
    users: U,
    storage_timeout: Duration,
}

impl<S, U> SessionResolver<S, U>
where
    S: SessionStore + Clone + Send + 'static,
    U: UserStore + Clone + Send + 'static,
{
    /// Create a resolver over the given stores.
    pub(crate) fn new(sessions: S, users: U, storage_timeout: Duration) -> Self {
        Self {
            sessions,
            users,
            storage_timeout,
        }
    }

    /// Resolve the raw `Cookie` header of a request to a verified session.
    ///
    /// Returns `None` for anonymous traffic, unknown or expired tokens, and
    /// degraded storage alike: the caller-facing contract never reveals why
    /// a request is unauthenticated. Degraded lookups are logged here.
    pub(crate) async fn resolve_session(&self, cookie_header: Option<&str>) -> Option<AuthSession> {
        match self.resolve_internal(cookie_header).await {
            Resolution::Session(session) => Some(session),
            Resolution::NoSession => None,
            Resolution::Degraded(detail) => {
                tracing::warn!(
                    "session lookup degraded, treating request as unauthenticated: {detail}"
                );
                None
            }
        }
    }

    pub(crate) async fn resolve_internal(&self, cookie_header: Option<&str>) -> Resolution {
        // No cookie is the normal state for anonymous traffic, not an error.
        let token = match cookie_header.and_then(extract_session_token) {
            Some(token) => token,
            None => return Resolution::NoSession,
        };

        let sessions = self.sessions.clone();
        let users = self.users.clone();
        let lookup = task::spawn_blocking(move || {
            let session = match sessions.find_by_token(&token) {
                Ok(session) => session,
                Err(Error::NotFound(_)) => return Ok(None),
                Err(error) => return Err(error),
            };

            let user = match users.get(session.user_id) {
                Ok(user) => user,
                Err(Error::NotFound(_)) => return Ok(None),
                Err(error) => return Err(error),
            };

            Ok(Some((session, user)))
        });

        let joined = match timeout(self.storage_timeout, lookup).await {
            Ok(joined) => joined,
            Err(_elapsed) => return Resolution::Degraded("session lookup timed out".to_owned()),
        };

        let lookup_result = match joined {
            Ok(lookup_result) => lookup_result,
            Err(join_error) => {
                return Resolution::Degraded(format!("session lookup task failed: {join_error}"));
            }
        };

        match lookup_result {
            Ok(Some((session, user))) => {
                // Expiry is exclusive: a session expiring exactly now is
                // treated as if it never existed.
                if session.is_valid_at(OffsetDateTime::now_utc()) {
                    Resolution::Session(AuthSession {
                        user,
                        expires_at: session.expires_at,
                    })
                } else {
                    Resolution::NoSession
                }
            }
            Ok(None) => Resolution::NoSession,
            Err(error) => Resolution::Degraded(error.to_string()),
        }
    }
}

/// Extractor that resolves the request's session cookie, if any.
///
/// Never rejects: anonymous requests extract as `OptionalSession(None)` and
/// the [gate](crate::auth::gate) decides what that means for the operation.
pub(crate) struct OptionalSession(pub Option<AuthSession>);

impl<S> FromRequestParts<S> for OptionalSession
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let cookie_header = parts
            .headers
            .get(COOKIE)
            .and_then(|value| value.to_str().ok());

        Ok(OptionalSession(
            state.resolver.resolve_session(cookie_header).await,
        ))
    }
}
