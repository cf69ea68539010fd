//! Route handlers for destroying the current session.

use axum::{Json, extract::State, response::Redirect};
use axum_extra::extract::cookie::CookieJar;
use serde_json::{Value, json};

use crate::{
    AppState, Error,
    auth::{SESSION_COOKIE, cookie},
    stores::SessionStore,
};

/// Delete the session named by the request's cookie, if any, and clear the
/// cookie on the client.
///
/// Signing out without a session is not an error: the end state is the same.
fn destroy_session(state: &AppState, jar: CookieJar) -> Result<CookieJar, Error> {
    if let Some(session_cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.delete_by_token(session_cookie.value())?;
    }

    Ok(jar.add(cookie::clear_session_cookie()))
}

/// Handler for browser-driven sign-out: destroys the session and redirects
/// to the application root.
pub async fn get_sign_out(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), Error> {
    let jar = destroy_session(&state, jar)?;

    Ok((jar, Redirect::to("/")))
}

/// Handler for API-driven sign-out: destroys the session and confirms in
/// JSON.
pub async fn post_sign_out(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<Value>), Error> {
    let jar = destroy_session(&state, jar)?;

    Ok((jar, Json(json!({ "success": true }))))
}

#[cfg(test)]
mod sign_out_route_tests {
    use serde_json::json;

    use crate::{
        Error, auth::SESSION_COOKIE, endpoints, models::Role,
        routing::test_fixtures::get_test_context, stores::SessionStore,
    };

    #[tokio::test]
    async fn get_sign_out_deletes_session_and_clears_cookie() {
        let context = get_test_context();
        let (_, cookie) = context.sign_in("user@test.com", Role::User);
        let token = cookie.value().to_owned();

        let response = context
            .server
            .get(endpoints::SIGN_OUT)
            .add_cookie(cookie)
            .await;

        response.assert_status_see_other();
        assert_eq!(response.header(axum::http::header::LOCATION), "/");
        assert_eq!(response.cookie(SESSION_COOKIE).value(), "");
        assert_eq!(
            context.state.sessions.find_by_token(&token),
            Err(Error::NotFound("Session"))
        );
    }

    #[tokio::test]
    async fn post_sign_out_confirms_in_json() {
        let context = get_test_context();
        let (_, cookie) = context.sign_in("user@test.com", Role::User);

        let response = context
            .server
            .post(endpoints::SIGN_OUT)
            .add_cookie(cookie)
            .await;

        response.assert_status_ok();
        response.assert_json(&json!({ "success": true }));
    }

    #[tokio::test]
    async fn signing_out_without_a_session_succeeds() {
        let context = get_test_context();

        let response = context.server.post(endpoints::SIGN_OUT).await;

        response.assert_status_ok();
        response.assert_json(&json!({ "success": true }));
    }

    #[tokio::test]
    async fn session_is_unusable_after_sign_out() {
        let context = get_test_context();
        let (_, cookie) = context.sign_in("user@test.com", Role::User);
        let reused = cookie.clone();

        context
            .server
            .post(endpoints::SIGN_OUT)
            .add_cookie(cookie)
            .await
            .assert_status_ok();

        let response = context
            .server
            .get(endpoints::SUMMARY)
            .add_cookie(reused)
            .await;

        response.assert_status_unauthorized();
    }
}
