//! Route handlers for listing, updating, and deleting users.
//!
//! User records are created through sign-in, never through this API, so
//! there is no create handler here.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    AppState, Error,
    auth::{OptionalSession, require_admin, require_authenticated, scope_for_request},
    models::{Role, User, UserID},
    stores::UserStore,
};

/// Handler for listing users, newest first.
///
/// Admins see every user; everyone else sees a list containing only
/// themselves.
pub async fn get_users(
    State(state): State<AppState>,
    OptionalSession(session): OptionalSession,
) -> Result<Json<Vec<User>>, Error> {
    let user = require_authenticated(session.as_ref())?;
    let scope = scope_for_request(user, None)?;

    let users = match scope.user_filter() {
        None => state.users.get_all()?,
        Some(user_id) => vec![state.users.get(user_id)?],
    };

    Ok(Json(users))
}

/// The raw, unvalidated body of a user update request.
#[derive(Debug, Default, Deserialize)]
pub struct UserForm {
    name: Option<String>,
    role: Option<String>,
}

impl UserForm {
    fn validated(&self) -> Result<(String, Role), Error> {
        let name = self
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty());
        let role = self.role.as_deref().and_then(Role::parse);

        match (name, role) {
            (Some(name), Some(role)) => Ok((name.to_owned(), role)),
            (name, role) => Err(Error::ValidationFailed(vec![
                ("name", name.is_some()),
                ("role", role.is_some()),
            ])),
        }
    }
}

/// Handler for updating a user's name and role. Admin-only.
pub async fn update_user(
    State(state): State<AppState>,
    OptionalSession(session): OptionalSession,
    Path(user_id): Path<i64>,
    Json(form): Json<UserForm>,
) -> Result<Json<User>, Error> {
    require_admin(session.as_ref())?;

    let (name, role) = form.validated()?;
    let user = state.users.update(UserID::new(user_id), &name, role)?;

    Ok(Json(user))
}

/// Handler for deleting a user. Admin-only.
///
/// The user's sessions and transactions are deleted along with them.
pub async fn delete_user(
    State(state): State<AppState>,
    OptionalSession(session): OptionalSession,
    Path(user_id): Path<i64>,
) -> Result<Json<Value>, Error> {
    require_admin(session.as_ref())?;

    state.users.delete(UserID::new(user_id))?;

    Ok(Json(json!({ "success": true })))
}

#[cfg(test)]
mod user_route_tests {
    use serde_json::{Value, json};

    use crate::{
        endpoints::{self, format_endpoint},
        models::{Role, UserID},
        routing::test_fixtures::get_test_context,
        stores::UserStore,
    };

    #[tokio::test]
    async fn list_requires_authentication() {
        let context = get_test_context();

        let response = context.server.get(endpoints::USERS).await;

        response.assert_status_unauthorized();
    }

    #[tokio::test]
    async fn admin_lists_every_user() {
        let context = get_test_context();
        let (_, admin_cookie) = context.sign_in("admin@test.com", Role::Admin);
        context.sign_in("user@test.com", Role::User);

        let response = context
            .server
            .get(endpoints::USERS)
            .add_cookie(admin_cookie)
            .await;

        response.assert_status_ok();
        let body: Vec<Value> = response.json();
        assert_eq!(body.len(), 2);
    }

    #[tokio::test]
    async fn user_list_contains_only_themselves() {
        let context = get_test_context();
        context.sign_in("admin@test.com", Role::Admin);
        let (user, user_cookie) = context.sign_in("user@test.com", Role::User);

        let response = context
            .server
            .get(endpoints::USERS)
            .add_cookie(user_cookie)
            .await;

        response.assert_status_ok();
        let body: Vec<Value> = response.json();
        assert_eq!(body.len(), 1);
        assert_eq!(body[0]["id"], json!(user.id.as_i64()));
    }

    #[tokio::test]
    async fn admin_updates_name_and_role() {
        let context = get_test_context();
        let (_, admin_cookie) = context.sign_in("admin@test.com", Role::Admin);
        let (user, _) = context.sign_in("user@test.com", Role::User);

        let response = context
            .server
            .put(&format_endpoint(endpoints::USER, user.id.as_i64()))
            .add_cookie(admin_cookie)
            .json(&json!({ "name": "Promoted", "role": "ADMIN" }))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["name"], json!("Promoted"));
        assert_eq!(body["role"], json!("ADMIN"));
    }

    #[tokio::test]
    async fn update_rejects_unknown_role() {
        let context = get_test_context();
        let (_, admin_cookie) = context.sign_in("admin@test.com", Role::Admin);
        let (user, _) = context.sign_in("user@test.com", Role::User);

        let response = context
            .server
            .put(&format_endpoint(endpoints::USER, user.id.as_i64()))
            .add_cookie(admin_cookie)
            .json(&json!({ "name": "Valid", "role": "SUPERUSER" }))
            .await;

        response.assert_status_bad_request();
        let body: Value = response.json();
        assert_eq!(body["details"]["name"], json!("OK"));
        assert_eq!(body["details"]["role"], json!("Missing"));
    }

    #[tokio::test]
    async fn update_is_admin_only() {
        let context = get_test_context();
        let (user, user_cookie) = context.sign_in("user@test.com", Role::User);

        let response = context
            .server
            .put(&format_endpoint(endpoints::USER, user.id.as_i64()))
            .add_cookie(user_cookie)
            .json(&json!({ "name": "Self Promoted", "role": "ADMIN" }))
            .await;

        response.assert_status_forbidden();
    }

    #[tokio::test]
    async fn admin_deletes_user() {
        let context = get_test_context();
        let (_, admin_cookie) = context.sign_in("admin@test.com", Role::Admin);
        let (user, _) = context.sign_in("user@test.com", Role::User);

        let response = context
            .server
            .delete(&format_endpoint(endpoints::USER, user.id.as_i64()))
            .add_cookie(admin_cookie)
            .await;

        response.assert_status_ok();
        response.assert_json(&json!({ "success": true }));
        assert_eq!(
            context.state.users.get(user.id),
            Err(crate::Error::NotFound("User"))
        );
    }

    #[tokio::test]
    async fn delete_missing_user_is_not_found() {
        let context = get_test_context();
        let (_, admin_cookie) = context.sign_in("admin@test.com", Role::Admin);

        let response = context
            .server
            .delete(&format_endpoint(endpoints::USER, UserID::new(404).as_i64()))
            .add_cookie(admin_cookie)
            .await;

        response.assert_status_not_found();
        response.assert_json(&json!({ "error": "User not found" }));
    }
}
