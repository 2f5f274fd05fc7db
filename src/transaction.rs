//! Transactions as returned by the backend and the filters used to list them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    id::ResourceId,
    month::iso_date,
};

/// Whether money came in or went out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Money received, never counted against a budget.
    Income,
    /// Money spent.
    Expense,
}

/// An expense or income.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The id of the transaction.
    pub id: ResourceId,

    /// The amount of money, always positive. The direction is given by
    /// `transaction_type`.
    pub amount: Decimal,

    /// A text description of what the transaction was for.
    #[serde(default)]
    pub description: String,

    /// The category of the transaction.
    ///
    /// `None` if the transaction was never categorised or its category was
    /// deleted.
    #[serde(default)]
    pub category: Option<ResourceId>,

    /// Income or expense.
    pub transaction_type: TransactionType,

    /// When the transaction happened.
    #[serde(with = "iso_date")]
    pub date: Date,
}

impl Transaction {
    /// Whether the transaction is an expense.
    pub fn is_expense(&self) -> bool {
        self.transaction_type == TransactionType::Expense
    }
}

/// Query filters for listing transactions.
///
/// Unset filters are left out of the query string.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransactionFilter {
    /// Free-text search over descriptions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Only transactions in this category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<ResourceId>,
    /// Only income or only expenses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_type: Option<TransactionType>,
    /// Earliest date, inclusive.
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "iso_date::option::serialize"
    )]
    pub date_from: Option<Date>,
    /// Latest date, inclusive.
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "iso_date::option::serialize"
    )]
    pub date_to: Option<Date>,
    /// Smallest amount, inclusive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_min: Option<Decimal>,
    /// Largest amount, inclusive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_max: Option<Decimal>,
    /// The 1-based page number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
    /// The page size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

impl TransactionFilter {
    /// Encode the filter as a URL query string, without the leading `?`.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidResponse] if the filter cannot be encoded, which
    /// should not happen for the field types used here.
    pub fn to_query_string(&self) -> Result<String, Error> {
        serde_urlencoded::to_string(self).map_err(|error| {
            tracing::error!("could not encode transaction filter {self:?}: {error}");
            Error::InvalidResponse(error.to_string())
        })
    }
}

/// One page of transactions.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TransactionPage {
    /// Total number of transactions matching the filter.
    pub count: u64,
    /// URL of the next page.
    #[serde(default)]
    pub next: Option<String>,
    /// URL of the previous page.
    #[serde(default)]
    pub previous: Option<String>,
    /// The transactions on this page.
    pub results: Vec<Transaction>,
}
