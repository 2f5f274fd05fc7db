//! The backend API as seen by the store.
//!
//! [BudgetApi] is the seam between the client state and the REST backend:
//! [crate::HttpClient] implements it over HTTP and tests substitute an
//! in-memory backend.

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    Error,
    budget::{Budget, BudgetForm},
    category::{Category, CategoryForm},
    id::ResourceId,
    month::Month,
    transaction::{TransactionFilter, TransactionPage},
};

/// Shown when an error response carries no usable message.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong. Please try again.";

/// The backend operations the client relies on.
#[async_trait]
pub trait BudgetApi: Send + Sync {
    /// The raw monthly summary payload for `month`.
    ///
    /// The payload is returned unparsed, [crate::adapt_monthly_summary] turns
    /// it into an overview.
    async fn monthly_summary(&self, month: Month) -> Result<Value, Error>;

    /// All budgets, or only those of `month`.
    async fn list_budgets(&self, month: Option<Month>) -> Result<Vec<Budget>, Error>;

    /// Create a budget.
    async fn create_budget(&self, form: &BudgetForm) -> Result<Budget, Error>;

    /// Replace the budget with `id`.
    async fn update_budget(&self, id: &ResourceId, form: &BudgetForm) -> Result<Budget, Error>;

    /// Delete the budget with `id`.
    async fn delete_budget(&self, id: &ResourceId) -> Result<(), Error>;

    /// All categories.
    async fn list_categories(&self) -> Result<Vec<Category>, Error>;

    /// Create a category.
    async fn create_category(&self, form: &CategoryForm) -> Result<Category, Error>;

    /// Replace the category with `id`.
    async fn update_category(&self, id: &ResourceId, form: &CategoryForm)
    -> Result<Category, Error>;

    /// Delete the category with `id`.
    ///
    /// The backend deletes the category's budgets and leaves its
    /// transactions uncategorised.
    async fn delete_category(&self, id: &ResourceId) -> Result<(), Error>;

    /// One page of transactions matching `filter`.
    async fn list_transactions(&self, filter: &TransactionFilter)
    -> Result<TransactionPage, Error>;
}

/// Pick the user-facing message out of an error response body.
///
/// The first of these that is present wins: `message`, the first entry of
/// `non_field_errors`, `detail`. Anything else gives
/// [GENERIC_ERROR_MESSAGE].
pub fn extract_error_message(body: &Value) -> String {
    let non_blank = |value: &Value| {
        value
            .as_str()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_owned)
    };

    body.get("message")
        .and_then(non_blank)
        .or_else(|| {
            body.get("non_field_errors")
                .and_then(Value::as_array)
                .and_then(|errors| errors.first())
                .and_then(non_blank)
        })
        .or_else(|| body.get("detail").and_then(non_blank))
        .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_owned())
}
