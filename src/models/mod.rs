//! The domain models of the application: users, sessions, and transactions.

mod session;
mod transaction;
mod user;

pub use session::Session;
pub use transaction::{NewTransaction, Transaction, TransactionKind};
pub use user::{Role, User, UserID, UserUpsert};

/// Alias for the integer type used for the IDs of database records.
pub type DatabaseID = i64;
