//! Route handler for downloading the visible transactions as a CSV file.

use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue, header},
};
use time::macros::format_description;

use crate::{
    AppState, Error,
    auth::{OptionalSession, require_authenticated, scope_for_request},
    stores::{TransactionQuery, TransactionStore},
};

const CSV_HEADER: [&str; 5] = ["date", "concept", "type", "amount", "user"];

/// Handler for the CSV export.
///
/// The rows are the same transactions the caller would see in the list
/// endpoint, in the same order.
pub async fn export_transactions(
    State(state): State<AppState>,
    OptionalSession(session): OptionalSession,
) -> Result<(HeaderMap, Vec<u8>), Error> {
    let user = require_authenticated(session.as_ref())?;
    let scope = scope_for_request(user, None)?;

    let rows = state.transactions.get_query_with_users(TransactionQuery {
        user_id: scope.user_filter(),
    })?;

    let date_format = format_description!("[year]-[month]-[day]");
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(CSV_HEADER)
        .map_err(|error| Error::StorageDegraded(format!("could not write CSV: {error}")))?;

    for (transaction, owner) in rows {
        let date = transaction
            .date
            .format(date_format)
            .map_err(|error| Error::StorageDegraded(format!("could not format date: {error}")))?;

        writer
            .write_record([
                date.as_str(),
                transaction.concept.as_str(),
                transaction.kind.as_str(),
                transaction.amount.to_string().as_str(),
                owner.email.as_str(),
            ])
            .map_err(|error| Error::StorageDegraded(format!("could not write CSV: {error}")))?;
    }

    let body = writer
        .into_inner()
        .map_err(|error| Error::StorageDegraded(format!("could not write CSV: {error}")))?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/csv; charset=utf-8"),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_static("attachment; filename=\"transactions.csv\""),
    );

    Ok((headers, body))
}

#[cfg(test)]
mod export_route_tests {
    use time::macros::date;

    use crate::{
        endpoints,
        models::{NewTransaction, Role, TransactionKind, UserID},
        routing::test_fixtures::{TestContext, get_test_context},
        stores::TransactionStore,
    };

    fn seed_transaction(context: &TestContext, user_id: UserID, concept: &str, amount: i64) {
        context
            .state
            .transactions
            .create(NewTransaction {
                concept: concept.to_owned(),
                amount,
                kind: TransactionKind::Expense,
                date: date!(2025 - 06 - 15),
                user_id,
            })
            .unwrap();
    }

    #[tokio::test]
    async fn export_requires_authentication() {
        let context = get_test_context();

        let response = context.server.get(endpoints::EXPORT).await;

        response.assert_status_unauthorized();
    }

    #[tokio::test]
    async fn export_is_a_csv_attachment() {
        let context = get_test_context();
        let (user, cookie) = context.sign_in("user@test.com", Role::User);
        seed_transaction(&context, user.id, "Groceries", 1_250);

        let response = context
            .server
            .get(endpoints::EXPORT)
            .add_cookie(cookie)
            .await;

        response.assert_status_ok();
        assert!(
            response
                .header(axum::http::header::CONTENT_TYPE)
                .to_str()
                .unwrap()
                .starts_with("text/csv")
        );
        assert!(
            response
                .header(axum::http::header::CONTENT_DISPOSITION)
                .to_str()
                .unwrap()
                .contains("transactions.csv")
        );

        let body = response.text();
        let mut lines = body.lines();
        assert_eq!(lines.next(), Some("date,concept,type,amount,user"));
        assert_eq!(
            lines.next(),
            Some("2025-06-15,Groceries,EXPENSE,1250,user@test.com")
        );
    }

    #[tokio::test]
    async fn export_is_scoped_to_the_caller() {
        let context = get_test_context();
        let (admin, _) = context.sign_in("admin@test.com", Role::Admin);
        let (user, cookie) = context.sign_in("user@test.com", Role::User);
        seed_transaction(&context, admin.id, "Admin entry", 100);
        seed_transaction(&context, user.id, "User entry", 200);

        let response = context
            .server
            .get(endpoints::EXPORT)
            .add_cookie(cookie)
            .await;

        response.assert_status_ok();
        let body = response.text();
        assert!(body.contains("User entry"));
        assert!(!body.contains("Admin entry"));
    }
}
