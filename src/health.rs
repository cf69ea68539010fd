//! The liveness probe.

use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};

use crate::AppState;
use crate::stores::UserStore;

/// Handler for the health probe.
///
/// Answers whether the process is serving requests and whether the database
/// responds to a trivial query. A degraded database reports 503 so that
/// orchestrators can take the instance out of rotation.
pub async fn get_health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.users.count() {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "database": "ok" })),
        ),
        Err(error) => {
            tracing::error!("health probe found the database unavailable: {error}");

            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "degraded", "database": "unavailable" })),
            )
        }
    }
}

#[cfg(test)]
mod health_route_tests {
    use serde_json::json;

    use crate::{endpoints, routing::test_fixtures::get_test_context};

    #[tokio::test]
    async fn health_reports_ok_with_a_reachable_database() {
        let context = get_test_context();

        let response = context.server.get(endpoints::HEALTH).await;

        response.assert_status_ok();
        response.assert_json(&json!({ "status": "ok", "database": "ok" }));
    }

    #[tokio::test]
    async fn health_does_not_require_authentication() {
        let context = get_test_context();

        context.server.get(endpoints::HEALTH).await.assert_status_ok();
    }
}
