//! Contains traits and implementations for objects that store the domain
//! [models](crate::models).

pub(crate) mod session;
pub(crate) mod transaction;
pub(crate) mod user;

pub use session::{SQLiteSessionStore, SessionStore};
pub use transaction::{SQLiteTransactionStore, TransactionQuery, TransactionStore, TransactionUpdate};
pub use user::{SQLiteUserStore, UserStore};
