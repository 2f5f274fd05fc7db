//! The backend API endpoint paths.
//!
//! For endpoints that take a parameter, e.g., '/api/budgets/{budget_id}/', use [format_endpoint].
//! Every backend path ends with a slash.

use std::fmt::Display;

/// The monthly budget summary, takes a `month=YYYY-MM` query.
pub const MONTHLY_SUMMARY: &str = "/api/budgets/monthly_summary/";
/// The budget status report, takes a `month=YYYY-MM-01` query.
pub const BUDGET_STATUS: &str = "/api/budgets/status/";
/// The alerts for budgets near or over their limit, takes a `month=YYYY-MM-01` query.
pub const BUDGET_ALERTS: &str = "/api/budgets/alerts/";
/// The route for checking what a proposed transaction would do to its budget.
pub const CHECK_TRANSACTION_IMPACT: &str = "/api/budgets/check_transaction_impact/";
/// The route to list and create budgets.
pub const BUDGETS: &str = "/api/budgets/";
/// The route to update or delete a budget.
pub const BUDGET: &str = "/api/budgets/{budget_id}/";
/// The route to list and create categories.
pub const CATEGORIES: &str = "/api/categories/";
/// The route to update or delete a category.
pub const CATEGORY: &str = "/api/categories/{category_id}/";
/// The route to list transactions.
pub const TRANSACTIONS: &str = "/api/transactions/";
/// The route for logging in a user.
pub const LOG_IN: &str = "/api/auth/login/";
/// The route for logging out the current user.
pub const LOG_OUT: &str = "/api/auth/logout/";
/// The route for registering a new user.
pub const REGISTER: &str = "/api/auth/register/";
/// The route for updating the user's profile.
pub const PROFILE_UPDATE: &str = "/api/auth/profile-update/";
/// The route for changing the user's password.
pub const CHANGE_PASSWORD: &str = "/api/auth/change-password/";
/// The route for downloading all of the user's data.
pub const EXPORT_DATA: &str = "/api/auth/export-data/";

/// The proxy server's health check.
pub const HEALTH: &str = "/healthz";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/api/budgets/{budget_id}/', '{budget_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: impl Display) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_string();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|end| param_start + end + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
