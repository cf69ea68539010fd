//! This file defines the type `Transaction`, the core type of the
//! financial-tracking part of the application.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::models::{DatabaseID, UserID};

/// Whether a transaction brought money in or moved money out.
///
/// The direction of a transaction is carried by this field, not by the sign
/// of the amount: amounts are always non-negative magnitudes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    /// Money earned.
    Income,
    /// Money spent.
    Expense,
}

impl TransactionKind {
    /// The kind as the string stored in the database, e.g. "INCOME".
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "INCOME",
            TransactionKind::Expense => "EXPENSE",
        }
    }

    /// Parse a kind from its database/JSON representation.
    ///
    /// Returns `None` for anything other than "INCOME" or "EXPENSE".
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "INCOME" => Some(TransactionKind::Income),
            "EXPENSE" => Some(TransactionKind::Expense),
            _ => None,
        }
    }
}

impl Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single financial event: money was either spent or earned.
///
/// Amounts are stored in minor currency units as non-negative magnitudes; a
/// reversal is modeled as a new record of the opposite kind, never as a
/// negated amount.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// The ID of the transaction in the database.
    pub id: DatabaseID,
    /// A free-text label describing what the transaction was for.
    pub concept: String,
    /// The magnitude of the transaction in minor currency units. Always
    /// strictly positive.
    pub amount: i64,
    /// Whether this is income or an expense.
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// The date the financial event took effect, distinct from when the
    /// record was created.
    pub date: Date,
    /// The user this transaction belongs to.
    pub user_id: UserID,
    /// When the record was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When the record was last updated.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// The validated fields for creating a transaction.
///
/// Handlers validate the raw request body and only then construct this type,
/// so stores can assume `amount > 0` and a non-empty concept.
#[derive(Clone, Debug, PartialEq)]
pub struct NewTransaction {
    /// A free-text label describing what the transaction is for.
    pub concept: String,
    /// The strictly positive magnitude in minor currency units.
    pub amount: i64,
    /// Whether this is income or an expense.
    pub kind: TransactionKind,
    /// The date the financial event took effect.
    pub date: Date,
    /// The user the transaction belongs to.
    pub user_id: UserID,
}
