//! Defines the routes of the application and how each route is handled.

use axum::{
    Router,
    routing::{get, put},
};

use crate::{
    AppState, endpoints,
    export::export_transactions,
    health::get_health,
    sign_in::{get_session, oauth_callback},
    sign_out::{get_sign_out, post_sign_out},
    summary::get_summary,
    transaction::{
        create_transaction, delete_transaction, get_transactions, update_transaction,
    },
    user::{delete_user, get_users, update_user},
};

/// Create the router for the application's API.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(endpoints::HEALTH, get(get_health))
        .route(endpoints::OAUTH_CALLBACK, get(oauth_callback))
        .route(endpoints::AUTH_SESSION, get(get_session))
        .route(endpoints::SIGN_OUT, get(get_sign_out).post(post_sign_out))
        .route(endpoints::USERS, get(get_users))
        .route(endpoints::USER, put(update_user).delete(delete_user))
        .route(
            endpoints::TRANSACTIONS,
            get(get_transactions).post(create_transaction),
        )
        // The static export segment must not be swallowed by the
        // {transaction_id} capture; axum matches it first.
        .route(endpoints::EXPORT, get(export_transactions))
        .route(
            endpoints::TRANSACTION,
            put(update_transaction).delete(delete_transaction),
        )
        .route(endpoints::SUMMARY, get(get_summary))
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_fixtures {
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use async_trait::async_trait;
    use axum_extra::extract::cookie::Cookie;
    use axum_test::TestServer;
    use rusqlite::Connection;
    use time::OffsetDateTime;

    use crate::{
        AppState, Error, ExternalIdentity, IdentityProvider,
        auth::{SESSION_COOKIE, SESSION_DURATION, SessionResolver, cookie::generate_session_token},
        build_router,
        db::initialize,
        models::{Role, Session, User},
        stores::{
            SQLiteSessionStore, SQLiteTransactionStore, SQLiteUserStore, SessionStore, UserStore,
            user::test_fixtures::upsert_fields,
        },
    };

    /// A test server over a fresh in-memory database, plus direct access to
    /// the state and the raw connection behind it for seeding, asserting,
    /// and simulating storage faults.
    pub(crate) struct TestContext {
        pub(crate) server: TestServer,
        pub(crate) state: AppState,
        pub(crate) connection: Arc<Mutex<Connection>>,
    }

    impl TestContext {
        /// Create a user and a valid session for them, bypassing the OAuth
        /// handshake. Returns the user and the cookie to send with requests.
        pub(crate) fn sign_in(&self, email: &str, role: Role) -> (User, Cookie<'static>) {
            let user = self.state.users.upsert(upsert_fields(email, role)).unwrap();

            let now = OffsetDateTime::now_utc();
            let token = generate_session_token();
            self.state
                .sessions
                .create(&Session {
                    token: token.clone(),
                    user_id: user.id,
                    expires_at: now + SESSION_DURATION,
                    ip_address: "127.0.0.1".to_owned(),
                    user_agent: "test-agent".to_owned(),
                    created_at: now,
                })
                .unwrap();

            (user, Cookie::build((SESSION_COOKIE, token)).build())
        }
    }

    pub(crate) fn get_test_context() -> TestContext {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let connection = Arc::new(Mutex::new(connection));

        let users = SQLiteUserStore::new(connection.clone());
        let sessions = SQLiteSessionStore::new(connection.clone());
        let transactions = SQLiteTransactionStore::new(connection.clone());
        let resolver =
            SessionResolver::new(sessions.clone(), users.clone(), Duration::from_secs(5));
        let state = AppState {
            users,
            sessions,
            transactions,
            resolver,
            identity_provider: Arc::new(StubIdentityProvider),
        };
        let server = TestServer::new(build_router(state.clone()));

        TestContext {
            server,
            state,
            connection,
        }
    }

    /// Stands in for the live identity provider: any code other than
    /// "bad-code" exchanges for a fixed identity.
    pub(crate) struct StubIdentityProvider;

    #[async_trait]
    impl IdentityProvider for StubIdentityProvider {
        async fn exchange_code(&self, code: &str) -> Result<ExternalIdentity, Error> {
            if code == "bad-code" {
                return Err(Error::IdentityProvider("stubbed rejection".to_owned()));
            }

            Ok(ExternalIdentity {
                id: "12345".to_owned(),
                login: "octocat".to_owned(),
                name: Some("The Octocat".to_owned()),
                email: Some("octocat@example.com".to_owned()),
                avatar_url: None,
            })
        }
    }
}
