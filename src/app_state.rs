//! Defines the state of the application and its construction.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use rusqlite::Connection;

use crate::{
    Error,
    auth::{SessionResolver, oauth::IdentityProvider},
    db,
    stores::{SQLiteSessionStore, SQLiteTransactionStore, SQLiteUserStore},
};

/// How long a session lookup may take before the request is treated as
/// unauthenticated.
const STORAGE_TIMEOUT: Duration = Duration::from_secs(5);

/// The state of the application shared by the route handlers.
#[derive(Clone)]
pub struct AppState {
    /// The user store.
    pub(crate) users: SQLiteUserStore,
    /// The session store.
    pub(crate) sessions: SQLiteSessionStore,
    /// The transaction store.
    pub(crate) transactions: SQLiteTransactionStore,
    /// Resolves session cookies on inbound requests.
    pub(crate) resolver: SessionResolver<SQLiteSessionStore, SQLiteUserStore>,
    /// The external identity provider used during sign-in.
    pub(crate) identity_provider: Arc<dyn IdentityProvider>,
}

impl AppState {
    /// Create the application state over `connection`, initializing the
    /// database schema if necessary.
    ///
    /// # Errors
    /// Returns an error if the database schema could not be created.
    pub fn new(
        connection: Connection,
        identity_provider: Arc<dyn IdentityProvider>,
    ) -> Result<Self, Error> {
        db::initialize(&connection)?;

        let connection = Arc::new(Mutex::new(connection));
        let users = SQLiteUserStore::new(connection.clone());
        let sessions = SQLiteSessionStore::new(connection.clone());
        let transactions = SQLiteTransactionStore::new(connection);
        let resolver = SessionResolver::new(sessions.clone(), users.clone(), STORAGE_TIMEOUT);

        Ok(Self {
            users,
            sessions,
            transactions,
            resolver,
            identity_provider,
        })
    }
}
