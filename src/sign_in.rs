//! Route handlers for signing in via the external identity provider and for
//! inspecting the current session.

use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, header},
    response::Redirect,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use serde_json::{Value, json};
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    auth::{OptionalSession, SESSION_DURATION, cookie},
    models::{Role, Session, UserUpsert},
    stores::{SessionStore, UserStore},
};

/// The role assigned to a user the first time they sign in.
///
/// Later sign-ins never change the stored role, so demoting an account
/// sticks.
const FIRST_LOGIN_ROLE: Role = Role::Admin;

#[derive(Debug, Deserialize)]
pub(crate) struct CallbackParams {
    code: Option<String>,
}

/// The value recorded when a request carries no usable client address or
/// user agent.
const UNKNOWN: &str = "unknown";

fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_owned())
        .unwrap_or_else(|| UNKNOWN.to_owned())
}

fn user_agent(headers: &HeaderMap) -> String {
    headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
        .unwrap_or_else(|| UNKNOWN.to_owned())
}

/// Handler for the OAuth callback: exchanges the authorization code for an
/// identity, creates or refreshes the matching user, mints a session, and
/// redirects to the application root with the session cookie set.
pub async fn oauth_callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), Error> {
    let code = params
        .code
        .filter(|code| !code.is_empty())
        .ok_or(Error::ValidationFailed(vec![("code", false)]))?;

    let identity = state.identity_provider.exchange_code(&code).await?;
    let email = identity.resolved_email()?;

    let user = state.users.upsert(UserUpsert {
        name: identity.display_name(),
        email,
        email_verified: true,
        image: identity.avatar_url,
        role: FIRST_LOGIN_ROLE,
    })?;

    let now = OffsetDateTime::now_utc();
    let session = Session {
        token: cookie::generate_session_token(),
        user_id: user.id,
        expires_at: now + SESSION_DURATION,
        ip_address: client_ip(&headers),
        user_agent: user_agent(&headers),
        created_at: now,
    };
    state.sessions.create(&session)?;

    tracing::info!("user {} signed in", user.id);

    Ok((
        jar.add(cookie::session_cookie(session.token)),
        Redirect::to("/"),
    ))
}

/// Handler for inspecting the current session.
///
/// Anonymous requests receive `{"user": null}` rather than an error, so the
/// client can probe its sign-in state without special casing.
pub async fn get_session(OptionalSession(session): OptionalSession) -> Json<Value> {
    match session {
        Some(session) => Json(json!(session)),
        None => Json(json!({ "user": null })),
    }
}
