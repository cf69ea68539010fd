//! Defines the user store trait and an implementation for the SQLite backend.

use std::sync::{Arc, Mutex};

use email_address::EmailAddress;
use rusqlite::{Connection, Row, types::Type};
use time::OffsetDateTime;

use crate::{
    Error,
    db::{CreateTable, MapRow},
    models::{Role, User, UserID, UserUpsert},
};

const USER_COLUMNS: &str =
    "id, name, email, email_verified, image, role, phone, created_at, updated_at";

/// Handles the creation and retrieval of user records.
pub trait UserStore {
    /// Get a user by their ID.
    ///
    /// Returns [Error::NotFound] if no user with the given ID exists.
    fn get(&self, id: UserID) -> Result<User, Error>;

    /// Get a user by their email.
    ///
    /// Returns [Error::NotFound] if no user with the given email exists.
    fn get_by_email(&self, email: &EmailAddress) -> Result<User, Error>;

    /// Create a user, or refresh an existing one.
    ///
    /// The upsert is keyed by email: if a user with the email already exists,
    /// their name, image, and verification flag are refreshed and their role
    /// and phone number are left alone. Otherwise a new user is created with
    /// the given role.
    fn upsert(&self, fields: UserUpsert) -> Result<User, Error>;

    /// Update the name and role of an existing user.
    ///
    /// Returns [Error::NotFound] if no user with the given ID exists.
    fn update(&self, id: UserID, name: &str, role: Role) -> Result<User, Error>;

    /// Delete a user.
    ///
    /// Returns [Error::NotFound] if no user with the given ID exists.
    fn delete(&self, id: UserID) -> Result<(), Error>;

    /// Get all users, newest first.
    fn get_all(&self) -> Result<Vec<User>, Error>;

    /// The number of users in the store.
    fn count(&self) -> Result<i64, Error>;
}

/// Stores user records in a SQLite database.
#[derive(Debug, Clone)]
pub struct SQLiteUserStore {
    connection: Arc<Mutex<Connection>>,
}

impl SQLiteUserStore {
    /// Create a new store for the SQLite `connection`.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }
}

impl UserStore for SQLiteUserStore {
    fn get(&self, id: UserID) -> Result<User, Error> {
        self.connection
            .lock()
            .unwrap()
            .prepare(&format!("SELECT {USER_COLUMNS} FROM user WHERE id = :id"))?
            .query_row(&[(":id", &id.as_i64())], Self::map_row)
            .map_err(|error| match error {
                rusqlite::Error::QueryReturnedNoRows => Error::NotFound("User"),
                error => error.into(),
            })
    }

    fn get_by_email(&self, email: &EmailAddress) -> Result<User, Error> {
        self.connection
            .lock()
            .unwrap()
            .prepare(&format!(
                "SELECT {USER_COLUMNS} FROM user WHERE email = :email"
            ))?
            .query_row(&[(":email", &email.to_string())], Self::map_row)
            .map_err(|error| match error {
                rusqlite::Error::QueryReturnedNoRows => Error::NotFound("User"),
                error => error.into(),
            })
    }

    fn upsert(&self, fields: UserUpsert) -> Result<User, Error> {
        let now = OffsetDateTime::now_utc();

        let user = self
            .connection
            .lock()
            .unwrap()
            .prepare(&format!(
                "INSERT INTO user (name, email, email_verified, image, role, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(email) DO UPDATE SET
                     name = excluded.name,
                     email_verified = excluded.email_verified,
                     image = excluded.image,
                     updated_at = excluded.updated_at
                 RETURNING {USER_COLUMNS}"
            ))?
            .query_row(
                (
                    &fields.name,
                    fields.email.to_string(),
                    fields.email_verified,
                    &fields.image,
                    fields.role.as_str(),
                    now,
                    now,
                ),
                Self::map_row,
            )?;

        Ok(user)
    }

    fn update(&self, id: UserID, name: &str, role: Role) -> Result<User, Error> {
        self.connection
            .lock()
            .unwrap()
            .prepare(&format!(
                "UPDATE user SET name = ?1, role = ?2, updated_at = ?3 WHERE id = ?4
                 RETURNING {USER_COLUMNS}"
            ))?
            .query_row(
                (name, role.as_str(), OffsetDateTime::now_utc(), id.as_i64()),
                Self::map_row,
            )
            .map_err(|error| match error {
                rusqlite::Error::QueryReturnedNoRows => Error::NotFound("User"),
                error => error.into(),
            })
    }

    fn delete(&self, id: UserID) -> Result<(), Error> {
        let rows_affected = self
            .connection
            .lock()
            .unwrap()
            .execute("DELETE FROM user WHERE id = ?1", (id.as_i64(),))?;

        if rows_affected == 0 {
            return Err(Error::NotFound("User"));
        }

        Ok(())
    }

    fn get_all(&self) -> Result<Vec<User>, Error> {
        self.connection
            .lock()
            .unwrap()
            .prepare(&format!(
                "SELECT {USER_COLUMNS} FROM user ORDER BY created_at DESC, id DESC"
            ))?
            .query_map((), Self::map_row)?
            .map(|maybe_user| maybe_user.map_err(Error::from))
            .collect()
    }

    fn count(&self) -> Result<i64, Error> {
        self.connection
            .lock()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM user", (), |row| row.get(0))
            .map_err(Error::from)
    }
}

impl CreateTable for SQLiteUserStore {
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS user (
                    id INTEGER PRIMARY KEY,
                    name TEXT NOT NULL,
                    email TEXT UNIQUE NOT NULL,
                    email_verified INTEGER NOT NULL,
                    image TEXT,
                    role TEXT NOT NULL,
                    phone TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                    )",
            (),
        )?;

        Ok(())
    }
}

impl MapRow for SQLiteUserStore {
    type ReturnType = User;

    fn map_row_with_offset(row: &Row, offset: usize) -> Result<User, rusqlite::Error> {
        let raw_email: String = row.get(offset + 2)?;
        let raw_role: String = row.get(offset + 5)?;
        let role = Role::parse(&raw_role).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                offset + 5,
                Type::Text,
                format!("unknown role {raw_role}").into(),
            )
        })?;

        Ok(User {
            id: UserID::new(row.get(offset)?),
            name: row.get(offset + 1)?,
            email: EmailAddress::new_unchecked(raw_email),
            email_verified: row.get(offset + 3)?,
            image: row.get(offset + 4)?,
            role,
            phone: row.get(offset + 6)?,
            created_at: row.get(offset + 7)?,
            updated_at: row.get(offset + 8)?,
        })
    }
}

#[cfg(test)]
pub(crate) mod test_fixtures {
    use std::str::FromStr;

    use email_address::EmailAddress;

    use crate::models::{Role, UserUpsert};

    pub(crate) fn upsert_fields(email: &str, role: Role) -> UserUpsert {
        UserUpsert {
            name: "Test User".to_owned(),
            email: EmailAddress::from_str(email).unwrap(),
            email_verified: true,
            image: None,
            role,
        }
    }
}

#[cfg(test)]
mod user_store_tests {
    use std::{
        str::FromStr,
        sync::{Arc, Mutex},
    };

    use email_address::EmailAddress;
    use rusqlite::Connection;

    use crate::{
        Error,
        db::CreateTable,
        models::{Role, UserID, UserUpsert},
    };

    use super::{SQLiteUserStore, UserStore, test_fixtures::upsert_fields};

    fn get_store() -> SQLiteUserStore {
        let connection = Connection::open_in_memory().unwrap();
        SQLiteUserStore::create_table(&connection).unwrap();

        SQLiteUserStore::new(Arc::new(Mutex::new(connection)))
    }

    #[test]
    fn upsert_creates_user() {
        let store = get_store();

        let user = store
            .upsert(upsert_fields("hello@world.com", Role::Admin))
            .unwrap();

        assert!(user.id.as_i64() > 0);
        assert_eq!(user.email.as_str(), "hello@world.com");
        assert_eq!(user.role, Role::Admin);
    }

    #[test]
    fn upsert_with_existing_email_refreshes_instead_of_duplicating() {
        let store = get_store();

        let first = store
            .upsert(upsert_fields("hello@world.com", Role::User))
            .unwrap();
        let second = store
            .upsert(UserUpsert {
                name: "Renamed".to_owned(),
                image: Some("https://example.com/avatar.png".to_owned()),
                // A different role on a later login must not clobber the
                // stored one.
                role: Role::Admin,
                ..upsert_fields("hello@world.com", Role::User)
            })
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.name, "Renamed");
        assert_eq!(
            second.image.as_deref(),
            Some("https://example.com/avatar.png")
        );
        assert_eq!(second.role, Role::User);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn get_user_fails_with_non_existent_id() {
        let store = get_store();

        assert_eq!(store.get(UserID::new(42)), Err(Error::NotFound("User")));
    }

    #[test]
    fn get_user_succeeds_with_existing_id() {
        let store = get_store();
        let test_user = store
            .upsert(upsert_fields("foo@bar.baz", Role::User))
            .unwrap();

        let retrieved_user = store.get(test_user.id).unwrap();

        assert_eq!(retrieved_user, test_user);
    }

    #[test]
    fn get_user_by_email_succeeds() {
        let store = get_store();
        let test_user = store
            .upsert(upsert_fields("foo@bar.baz", Role::User))
            .unwrap();

        let retrieved_user = store.get_by_email(&test_user.email).unwrap();

        assert_eq!(retrieved_user, test_user);
    }

    #[test]
    fn get_user_by_email_fails_with_unknown_email() {
        let store = get_store();

        let email = EmailAddress::from_str("nosuchuser@foo.bar").unwrap();

        assert_eq!(store.get_by_email(&email), Err(Error::NotFound("User")));
    }

    #[test]
    fn update_changes_name_and_role() {
        let store = get_store();
        let user = store
            .upsert(upsert_fields("foo@bar.baz", Role::User))
            .unwrap();

        let updated = store.update(user.id, "New Name", Role::Admin).unwrap();

        assert_eq!(updated.name, "New Name");
        assert_eq!(updated.role, Role::Admin);
        assert_eq!(updated.email, user.email);
    }

    #[test]
    fn update_missing_user_fails() {
        let store = get_store();

        assert_eq!(
            store.update(UserID::new(99), "Nobody", Role::User),
            Err(Error::NotFound("User"))
        );
    }

    #[test]
    fn delete_removes_user() {
        let store = get_store();
        let user = store
            .upsert(upsert_fields("foo@bar.baz", Role::User))
            .unwrap();

        store.delete(user.id).unwrap();

        assert_eq!(store.get(user.id), Err(Error::NotFound("User")));
    }

    #[test]
    fn delete_missing_user_fails() {
        let store = get_store();

        assert_eq!(store.delete(UserID::new(7)), Err(Error::NotFound("User")));
    }

    #[test]
    fn get_all_returns_every_user() {
        let store = get_store();
        store
            .upsert(upsert_fields("first@test.com", Role::User))
            .unwrap();
        store
            .upsert(upsert_fields("second@test.com", Role::Admin))
            .unwrap();

        let users = store.get_all().unwrap();

        assert_eq!(users.len(), 2);
        assert_eq!(store.count().unwrap(), 2);
    }
}
