//! Defines the session store trait and an implementation for the SQLite
//! backend.

use std::sync::{Arc, Mutex};

use rusqlite::{Connection, Row};

use crate::{
    Error,
    db::{CreateTable, MapRow},
    models::{Session, UserID},
};

/// Handles the creation, retrieval, and destruction of sessions.
pub trait SessionStore {
    /// Look a session up by its opaque token.
    ///
    /// Returns [Error::NotFound] if no session with the given token exists.
    /// Expiry is not checked here; that is the session resolver's job.
    fn find_by_token(&self, token: &str) -> Result<Session, Error>;

    /// Persist a new session.
    fn create(&self, session: &Session) -> Result<(), Error>;

    /// Delete the session with the given token.
    ///
    /// Deleting a token that does not exist is not an error: sign-out must be
    /// idempotent.
    fn delete_by_token(&self, token: &str) -> Result<(), Error>;
}

/// Stores sessions in a SQLite database.
///
/// Note that sessions reference the [User](crate::models::User) model, so the
/// user table must be set up in the database.
#[derive(Debug, Clone)]
pub struct SQLiteSessionStore {
    connection: Arc<Mutex<Connection>>,
}

impl SQLiteSessionStore {
    /// Create a new store for the SQLite `connection`.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }
}

impl SessionStore for SQLiteSessionStore {
    fn find_by_token(&self, token: &str) -> Result<Session, Error> {
        self.connection
            .lock()
            .unwrap()
            .prepare(
                "SELECT token, user_id, expires_at, ip_address, user_agent, created_at
                 FROM session WHERE token = :token",
            )?
            .query_row(&[(":token", &token)], Self::map_row)
            .map_err(|error| match error {
                rusqlite::Error::QueryReturnedNoRows => Error::NotFound("Session"),
                error => error.into(),
            })
    }

    fn create(&self, session: &Session) -> Result<(), Error> {
        self.connection.lock().unwrap().execute(
            "INSERT INTO session (token, user_id, expires_at, ip_address, user_agent, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            (
                &session.token,
                session.user_id.as_i64(),
                session.expires_at,
                &session.ip_address,
                &session.user_agent,
                session.created_at,
            ),
        )?;

        Ok(())
    }

    fn delete_by_token(&self, token: &str) -> Result<(), Error> {
        self.connection
            .lock()
            .unwrap()
            .execute("DELETE FROM session WHERE token = ?1", (token,))?;

        Ok(())
    }
}

impl CreateTable for SQLiteSessionStore {
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS session (
                    token TEXT PRIMARY KEY,
                    user_id INTEGER NOT NULL,
                    expires_at TEXT NOT NULL,
                    ip_address TEXT NOT NULL,
                    user_agent TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                    )",
            (),
        )?;

        Ok(())
    }
}

impl MapRow for SQLiteSessionStore {
    type ReturnType = Session;

    fn map_row_with_offset(row: &Row, offset: usize) -> Result<Session, rusqlite::Error> {
        Ok(Session {
            token: row.get(offset)?,
            user_id: UserID::new(row.get(offset + 1)?),
            expires_at: row.get(offset + 2)?,
            ip_address: row.get(offset + 3)?,
            user_agent: row.get(offset + 4)?,
            created_at: row.get(offset + 5)?,
        })
    }
}
