//! Defines the transaction store trait and an implementation for the SQLite
//! backend.

use std::sync::{Arc, Mutex};

use rusqlite::{Connection, Row, types::Type};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    db::{CreateTable, MapRow},
    models::{DatabaseID, NewTransaction, Transaction, TransactionKind, User, UserID},
    stores::user::SQLiteUserStore,
};

const TRANSACTION_COLUMNS: &str = "id, concept, amount, kind, date, user_id, created_at, updated_at";

/// Defines how transactions should be fetched from
/// [TransactionStore::get_query].
///
/// The default query returns every transaction; setting `user_id` restricts
/// the result to one user's records, which is how the OWN visibility scope is
/// applied.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TransactionQuery {
    /// Include only transactions owned by this user.
    pub user_id: Option<UserID>,
}

/// The fields an administrator may change on an existing transaction.
#[derive(Clone, Debug, PartialEq)]
pub struct TransactionUpdate {
    /// The new free-text label.
    pub concept: String,
    /// The new strictly positive magnitude in minor currency units.
    pub amount: i64,
    /// The new direction.
    pub kind: TransactionKind,
    /// The new effective date.
    pub date: Date,
}

/// Handles the creation and retrieval of transactions.
pub trait TransactionStore {
    /// Retrieve a transaction from the store.
    ///
    /// Returns [Error::NotFound] if no transaction with the given ID exists.
    fn get(&self, id: DatabaseID) -> Result<Transaction, Error>;

    /// Retrieve transactions from the store in the way defined by `query`,
    /// newest first.
    fn get_query(&self, query: TransactionQuery) -> Result<Vec<Transaction>, Error>;

    /// Retrieve transactions along with their owning users, newest first.
    fn get_query_with_users(
        &self,
        query: TransactionQuery,
    ) -> Result<Vec<(Transaction, User)>, Error>;

    /// Create a new transaction in the store.
    ///
    /// Returns [Error::NotFound] if the owning user does not exist.
    fn create(&self, fields: NewTransaction) -> Result<Transaction, Error>;

    /// Update an existing transaction.
    ///
    /// Returns [Error::NotFound] if no transaction with the given ID exists.
    fn update(&self, id: DatabaseID, fields: TransactionUpdate) -> Result<Transaction, Error>;

    /// Delete a transaction.
    ///
    /// Returns [Error::NotFound] if no transaction with the given ID exists.
    fn delete(&self, id: DatabaseID) -> Result<(), Error>;
}

/// Stores transactions in a SQLite database.
///
/// Note that transactions reference the [User](crate::models::User) model, so
/// the user table must be set up in the database.
#[derive(Debug, Clone)]
pub struct SQLiteTransactionStore {
    connection: Arc<Mutex<Connection>>,
}

impl SQLiteTransactionStore {
    /// Create a new store for the SQLite `connection`.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }
}

impl TransactionStore for SQLiteTransactionStore {
    fn get(&self, id: DatabaseID) -> Result<Transaction, Error> {
        self.connection
            .lock()
            .unwrap()
            .prepare(&format!(
                "SELECT {TRANSACTION_COLUMNS} FROM user_transaction WHERE id = :id"
            ))?
            .query_row(&[(":id", &id)], Self::map_row)
            .map_err(|error| match error {
                rusqlite::Error::QueryReturnedNoRows => Error::NotFound("Transaction"),
                error => error.into(),
            })
    }

    fn get_query(&self, query: TransactionQuery) -> Result<Vec<Transaction>, Error> {
        let connection = self.connection.lock().unwrap();

        match query.user_id {
            Some(user_id) => connection
                .prepare(&format!(
                    "SELECT {TRANSACTION_COLUMNS} FROM user_transaction
                     WHERE user_id = :user_id
                     ORDER BY created_at DESC, id DESC"
                ))?
                .query_map(&[(":user_id", &user_id.as_i64())], Self::map_row)?
                .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
                .collect(),
            None => connection
                .prepare(&format!(
                    "SELECT {TRANSACTION_COLUMNS} FROM user_transaction
                     ORDER BY created_at DESC, id DESC"
                ))?
                .query_map((), Self::map_row)?
                .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
                .collect(),
        }
    }

    fn get_query_with_users(
        &self,
        query: TransactionQuery,
    ) -> Result<Vec<(Transaction, User)>, Error> {
        let connection = self.connection.lock().unwrap();

        let map_joined_row = |row: &Row| {
            let transaction = Self::map_row(row)?;
            // The transaction columns occupy the first eight slots of the
            // joined row.
            let user = SQLiteUserStore::map_row_with_offset(row, 8)?;

            Ok((transaction, user))
        };

        match query.user_id {
            Some(user_id) => connection
                .prepare(
                    "SELECT t.id, t.concept, t.amount, t.kind, t.date, t.user_id, t.created_at, t.updated_at,
                            u.id, u.name, u.email, u.email_verified, u.image, u.role, u.phone, u.created_at, u.updated_at
                     FROM user_transaction t INNER JOIN user u ON u.id = t.user_id
                     WHERE t.user_id = :user_id
                     ORDER BY t.created_at DESC, t.id DESC",
                )?
                .query_map(&[(":user_id", &user_id.as_i64())], map_joined_row)?
                .map(|maybe_pair| maybe_pair.map_err(Error::from))
                .collect(),
            None => connection
                .prepare(
                    "SELECT t.id, t.concept, t.amount, t.kind, t.date, t.user_id, t.created_at, t.updated_at,
                            u.id, u.name, u.email, u.email_verified, u.image, u.role, u.phone, u.created_at, u.updated_at
                     FROM user_transaction t INNER JOIN user u ON u.id = t.user_id
                     ORDER BY t.created_at DESC, t.id DESC",
                )?
                .query_map((), map_joined_row)?
                .map(|maybe_pair| maybe_pair.map_err(Error::from))
                .collect(),
        }
    }

    fn create(&self, fields: NewTransaction) -> Result<Transaction, Error> {
        let now = OffsetDateTime::now_utc();

        self.connection
            .lock()
            .unwrap()
            .prepare(&format!(
                "INSERT INTO user_transaction (concept, amount, kind, date, user_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 RETURNING {TRANSACTION_COLUMNS}"
            ))?
            .query_row(
                (
                    &fields.concept,
                    fields.amount,
                    fields.kind.as_str(),
                    fields.date,
                    fields.user_id.as_i64(),
                    now,
                    now,
                ),
                Self::map_row,
            )
            .map_err(|error| match error {
                // Code 787 occurs when a FOREIGN KEY constraint failed.
                // The client tried to add a transaction for a non-existent user.
                rusqlite::Error::SqliteFailure(error, Some(_)) if error.extended_code == 787 => {
                    Error::NotFound("User")
                }
                error => error.into(),
            })
    }

    fn update(&self, id: DatabaseID, fields: TransactionUpdate) -> Result<Transaction, Error> {
        self.connection
            .lock()
            .unwrap()
            .prepare(&format!(
                "UPDATE user_transaction
                 SET concept = ?1, amount = ?2, kind = ?3, date = ?4, updated_at = ?5
                 WHERE id = ?6
                 RETURNING {TRANSACTION_COLUMNS}"
            ))?
            .query_row(
                (
                    &fields.concept,
                    fields.amount,
                    fields.kind.as_str(),
                    fields.date,
                    OffsetDateTime::now_utc(),
                    id,
                ),
                Self::map_row,
            )
            .map_err(|error| match error {
                rusqlite::Error::QueryReturnedNoRows => Error::NotFound("Transaction"),
                error => error.into(),
            })
    }

    fn delete(&self, id: DatabaseID) -> Result<(), Error> {
        let rows_affected = self
            .connection
            .lock()
            .unwrap()
            .execute("DELETE FROM user_transaction WHERE id = ?1", (id,))?;

        if rows_affected == 0 {
            return Err(Error::NotFound("Transaction"));
        }

        Ok(())
    }
}

impl CreateTable for SQLiteTransactionStore {
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS user_transaction (
                    id INTEGER PRIMARY KEY,
                    concept TEXT NOT NULL,
                    amount INTEGER NOT NULL,
                    kind TEXT NOT NULL,
                    date TEXT NOT NULL,
                    user_id INTEGER NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                    )",
            (),
        )?;

        Ok(())
    }
}

impl MapRow for SQLiteTransactionStore {
    type ReturnType = Transaction;

    fn map_row_with_offset(row: &Row, offset: usize) -> Result<Transaction, rusqlite::Error> {
        let raw_kind: String = row.get(offset + 3)?;
        let kind = TransactionKind::parse(&raw_kind).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                offset + 3,
                Type::Text,
                format!("unknown transaction kind {raw_kind}").into(),
            )
        })?;

        Ok(Transaction {
            id: row.get(offset)?,
            concept: row.get(offset + 1)?,
            amount: row.get(offset + 2)?,
            kind,
            date: row.get(offset + 4)?,
            user_id: UserID::new(row.get(offset + 5)?),
            created_at: row.get(offset + 6)?,
            updated_at: row.get(offset + 7)?,
        })
    }
}
