//! The scoped financial summary: totals over the transactions the caller is
//! allowed to see, plus the user count for administrators.

use std::sync::OnceLock;

use axum::{Json, extract::State};
use numfmt::{Formatter, Precision};
use serde::Serialize;

use crate::{
    AppState, Error,
    auth::{OptionalSession, require_authenticated, scope_for_request},
    models::{Transaction, TransactionKind},
    stores::{TransactionQuery, TransactionStore, UserStore},
};

/// The income/expense totals over a set of transactions, in minor currency
/// units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FinancialSummary {
    /// The sum of all income amounts.
    pub income: i64,
    /// The sum of all expense amounts, as a non-negative magnitude.
    pub expenses: i64,
    /// `income - expenses`. Negative when more was spent than earned.
    pub balance: i64,
}

/// Total the given transactions.
///
/// Expenses are totalled as magnitudes, so the balance is always exactly
/// `income - expenses`. The result does not depend on the order of the
/// transactions.
pub fn summarize(transactions: &[Transaction]) -> FinancialSummary {
    let mut summary = FinancialSummary::default();

    for transaction in transactions {
        match transaction.kind {
            TransactionKind::Income => summary.income += transaction.amount,
            TransactionKind::Expense => summary.expenses += transaction.amount,
        }
    }

    summary.balance = summary.income - summary.expenses;

    summary
}

/// Format an amount in minor currency units as a display string, e.g.
/// `"$1,500,000"`.
///
/// The JSON API and the CSV export serve raw minor units; this is the
/// display adapter for clients that render amounts for humans.
pub fn format_amount(amount: i64) -> String {
    static POSITIVE_FMT: OnceLock<Formatter> = OnceLock::new();

    let positive_fmt = POSITIVE_FMT.get_or_init(|| {
        Formatter::currency("$")
            .unwrap()
            .precision(Precision::Decimals(0))
    });

    static NEGATIVE_FMT: OnceLock<Formatter> = OnceLock::new();

    let negative_fmt = NEGATIVE_FMT.get_or_init(|| {
        Formatter::currency("-$")
            .unwrap()
            .precision(Precision::Decimals(0))
    });

    if amount < 0 {
        negative_fmt.fmt_string(amount.unsigned_abs() as f64)
    } else if amount > 0 {
        positive_fmt.fmt_string(amount as f64)
    } else {
        // Zero is hardcoded as "0", so we must specify the formatted string for zero
        "$0".to_owned()
    }
}

/// The JSON body of the summary report.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    #[serde(flatten)]
    summary: FinancialSummary,
    total_users: i64,
}

/// Handler for the summary report.
///
/// Admins see totals over every transaction and the real user count; everyone
/// else sees totals over their own transactions and a user count of one.
pub async fn get_summary(
    State(state): State<AppState>,
    OptionalSession(session): OptionalSession,
) -> Result<Json<SummaryResponse>, Error> {
    let user = require_authenticated(session.as_ref())?;
    let scope = scope_for_request(user, None)?;

    let transactions = state.transactions.get_query(TransactionQuery {
        user_id: scope.user_filter(),
    })?;
    let summary = summarize(&transactions);

    let total_users = if user.is_admin() {
        state.users.count()?
    } else {
        1
    };

    Ok(Json(SummaryResponse {
        summary,
        total_users,
    }))
}
