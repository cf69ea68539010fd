//! The API endpoint URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/users/{user_id}', use
//! [format_endpoint].

/// Liveness probe that also reports whether the database is reachable.
pub const HEALTH: &str = "/api/health";
/// The OAuth callback that exchanges an authorization code for a session.
pub const OAUTH_CALLBACK: &str = "/api/auth/callback/github";
/// The route for inspecting the current session.
pub const AUTH_SESSION: &str = "/api/auth/session";
/// The route for destroying the current session.
pub const SIGN_OUT: &str = "/api/auth/signout";
/// The route to list users.
pub const USERS: &str = "/api/users";
/// The route to update or delete a single user.
pub const USER: &str = "/api/users/{user_id}";
/// The route to list or create transactions.
pub const TRANSACTIONS: &str = "/api/transactions";
/// The route to update or delete a single transaction.
pub const TRANSACTION: &str = "/api/transactions/{transaction_id}";
/// The route for the scoped income/expense/balance summary.
pub const SUMMARY: &str = "/api/summary";
/// The route for downloading the visible transactions as CSV.
pub const EXPORT: &str = "/api/transactions/export";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/api/users/{user_id}', '{user_id}' is
/// the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let mut param_start = None;
    let mut param_end = None;

    for (i, c) in endpoint_path.chars().enumerate() {
        if c == '{' {
            param_start = Some(i);
        } else if param_start.is_some() && c == '}' {
            param_end = Some(i + 1);
            break;
        }
    }

    let param_start = match param_start {
        Some(start) => start,
        None => return endpoint_path.to_string(),
    };

    let param_end = param_end.unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
