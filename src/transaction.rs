//! Route handlers for listing, creating, updating, and deleting transactions.
//!
//! Listing is available to any authenticated user within their visibility
//! scope; mutations are admin-only.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use time::{Date, macros::format_description};

use crate::{
    AppState, Error,
    auth::{OptionalSession, require_admin, require_authenticated, scope_for_request},
    models::{DatabaseID, NewTransaction, Transaction, TransactionKind, User, UserID},
    stores::{TransactionQuery, TransactionStore, TransactionUpdate},
};

/// The subset of the owning user included with each listed transaction.
#[derive(Debug, Serialize)]
struct OwnerSummary {
    id: UserID,
    name: String,
    email: String,
}

impl From<User> for OwnerSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email.to_string(),
        }
    }
}

/// A transaction joined with a summary of its owner, as returned by the list
/// endpoint.
#[derive(Debug, Serialize)]
pub struct TransactionWithOwner {
    #[serde(flatten)]
    transaction: Transaction,
    user: OwnerSummary,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TransactionListParams {
    /// Restrict the list to one user's transactions. Non-admins may only
    /// name themselves.
    user_id: Option<i64>,
}

/// Handler for listing transactions, newest first.
pub async fn get_transactions(
    State(state): State<AppState>,
    OptionalSession(session): OptionalSession,
    Query(params): Query<TransactionListParams>,
) -> Result<Json<Vec<TransactionWithOwner>>, Error> {
    let user = require_authenticated(session.as_ref())?;
    let scope = scope_for_request(user, params.user_id.map(UserID::new))?;

    let rows = state.transactions.get_query_with_users(TransactionQuery {
        user_id: scope.user_filter(),
    })?;

    Ok(Json(
        rows.into_iter()
            .map(|(transaction, owner)| TransactionWithOwner {
                transaction,
                user: owner.into(),
            })
            .collect(),
    ))
}

/// The raw, unvalidated body of a create or update request.
///
/// Every field is optional at the deserialization layer so that a missing
/// field produces a field-by-field validation response instead of a
/// deserializer error.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionForm {
    concept: Option<String>,
    amount: Option<i64>,
    #[serde(rename = "type")]
    kind: Option<String>,
    date: Option<String>,
    user_id: Option<i64>,
}

impl TransactionForm {
    /// Validate the shared fields, reporting each field's status.
    ///
    /// A field that is present but unusable (an empty concept, a
    /// non-positive amount, an unknown kind, an unparseable date) counts as
    /// missing.
    fn validated_fields(&self) -> Result<(String, i64, TransactionKind, Date), Error> {
        let concept = self
            .concept
            .as_deref()
            .map(str::trim)
            .filter(|concept| !concept.is_empty());
        let amount = self.amount.filter(|&amount| amount > 0);
        let kind = self.kind.as_deref().and_then(TransactionKind::parse);
        let date = self.date.as_deref().and_then(|raw| {
            Date::parse(raw, format_description!("[year]-[month]-[day]")).ok()
        });

        match (concept, amount, kind, date) {
            (Some(concept), Some(amount), Some(kind), Some(date)) => {
                Ok((concept.to_owned(), amount, kind, date))
            }
            (concept, amount, kind, date) => Err(Error::ValidationFailed(vec![
                ("concept", concept.is_some()),
                ("amount", amount.is_some()),
                ("type", kind.is_some()),
                ("date", date.is_some()),
            ])),
        }
    }

    fn validated_create(&self) -> Result<NewTransaction, Error> {
        let user_id = self.user_id.map(UserID::new);

        // The owner is reported alongside the shared fields so the client
        // sees the full picture in one response.
        match (self.validated_fields(), user_id) {
            (Ok((concept, amount, kind, date)), Some(user_id)) => Ok(NewTransaction {
                concept,
                amount,
                kind,
                date,
                user_id,
            }),
            (result, user_id) => {
                let mut fields = match result {
                    Ok(_) => vec![
                        ("concept", true),
                        ("amount", true),
                        ("type", true),
                        ("date", true),
                    ],
                    Err(Error::ValidationFailed(fields)) => fields,
                    Err(error) => return Err(error),
                };
                fields.push(("userId", user_id.is_some()));

                Err(Error::ValidationFailed(fields))
            }
        }
    }

    fn validated_update(&self) -> Result<TransactionUpdate, Error> {
        let (concept, amount, kind, date) = self.validated_fields()?;

        Ok(TransactionUpdate {
            concept,
            amount,
            kind,
            date,
        })
    }
}

/// Handler for creating a transaction on behalf of a user. Admin-only.
pub async fn create_transaction(
    State(state): State<AppState>,
    OptionalSession(session): OptionalSession,
    Json(form): Json<TransactionForm>,
) -> Result<(StatusCode, Json<Transaction>), Error> {
    require_admin(session.as_ref())?;

    let fields = form.validated_create()?;
    let transaction = state.transactions.create(fields)?;

    Ok((StatusCode::CREATED, Json(transaction)))
}

/// Handler for updating an existing transaction. Admin-only.
///
/// The owner of a transaction cannot be changed; a misattributed record is
/// deleted and recreated instead.
pub async fn update_transaction(
    State(state): State<AppState>,
    OptionalSession(session): OptionalSession,
    Path(transaction_id): Path<DatabaseID>,
    Json(form): Json<TransactionForm>,
) -> Result<Json<Transaction>, Error> {
    require_admin(session.as_ref())?;

    let fields = form.validated_update()?;
    let transaction = state.transactions.update(transaction_id, fields)?;

    Ok(Json(transaction))
}

/// Handler for deleting a transaction. Admin-only.
pub async fn delete_transaction(
    State(state): State<AppState>,
    OptionalSession(session): OptionalSession,
    Path(transaction_id): Path<DatabaseID>,
) -> Result<Json<Value>, Error> {
    require_admin(session.as_ref())?;

    state.transactions.delete(transaction_id)?;

    Ok(Json(json!({ "success": true })))
}
