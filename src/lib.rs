//! Centavo is a small financial-tracking web application: authenticated users
//! record income and expense transactions, administrators manage users and
//! view aggregate reports, and a CSV export endpoint produces downloadable
//! summaries.
//!
//! This library provides a JSON REST API. Authentication is session-cookie
//! based: sessions are minted after an opaque OAuth code exchange with an
//! external identity provider and resolved on every request by looking the
//! session token up in the application database.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod app_state;
mod auth;
mod db;
mod endpoints;
mod export;
mod health;
mod models;
mod routing;
mod sign_in;
mod sign_out;
mod stores;
mod summary;
mod transaction;
mod user;

pub use app_state::AppState;
pub use auth::oauth::{ExternalIdentity, GithubIdentityProvider, IdentityProvider};
pub use routing::build_router;

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The request carried no valid session.
    ///
    /// Deliberately carries no detail about *why* (expired vs. absent vs.
    /// storage fault): the client must not be able to distinguish a guessed
    /// token from a missing one.
    #[error("no valid session")]
    Unauthenticated,

    /// The caller is authenticated but lacks the role or ownership required
    /// for the operation. The string is a human-readable reason.
    #[error("{0}")]
    Forbidden(&'static str),

    /// A mutation was missing or had malformed required fields.
    ///
    /// Each entry is a field name and whether the field was usable, so the
    /// client receives a field-by-field breakdown.
    #[error("missing required fields")]
    ValidationFailed(Vec<(&'static str, bool)>),

    /// The requested resource was not found.
    ///
    /// The string names the kind of resource, e.g. "Transaction".
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The backing store is unreachable or timed out.
    ///
    /// Session checks degrade this to [Error::Unauthenticated] at the HTTP
    /// boundary; direct data operations surface it as a 500.
    #[error("the backing store is unavailable: {0}")]
    StorageDegraded(String),

    /// The external identity provider rejected the code exchange or returned
    /// an unusable identity.
    #[error("identity provider error: {0}")]
    IdentityProvider(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound("Resource"),
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Error::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, json!({ "error": "Unauthorized" }))
            }
            Error::Forbidden(reason) => (StatusCode::FORBIDDEN, json!({ "error": reason })),
            Error::ValidationFailed(fields) => {
                let details: serde_json::Map<String, serde_json::Value> = fields
                    .iter()
                    .map(|(name, present)| {
                        let status = if *present { "OK" } else { "Missing" };
                        ((*name).to_owned(), json!(status))
                    })
                    .collect();

                (
                    StatusCode::BAD_REQUEST,
                    json!({ "error": "Missing required fields", "details": details }),
                )
            }
            Error::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                json!({ "error": format!("{resource} not found") }),
            ),
            Error::IdentityProvider(detail) => {
                tracing::error!("identity provider error: {detail}");

                (
                    StatusCode::BAD_REQUEST,
                    json!({ "error": "Could not verify the external identity" }),
                )
            }
            // Storage and SQL faults are not intended to be shown to the client.
            Error::StorageDegraded(_) | Error::SqlError(_) => {
                tracing::error!("an unexpected error occurred: {}", self);

                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
