//! Budgets and the statuses derived from them.
//!
//! A [Budget] is a spending limit for one category in one month. A
//! [BudgetStatus] compares that limit to what has been spent, and a
//! [BudgetOverview] collects every status of a month with aggregate totals.

use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};

use crate::{Error, category::Category, id::ResourceId, month::Month};

/// A spending limit for one category in one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    /// The id of the budget.
    pub id: ResourceId,

    /// The category the budget limits.
    pub category: Category,

    /// The most that should be spent in the category during `month`.
    pub amount: Decimal,

    /// The month the budget applies to.
    pub month: Month,

    /// ISO 8601 creation timestamp, absent in summary payloads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    /// ISO 8601 timestamp of the last update, absent in summary payloads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// The request body for creating or updating a budget.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetForm {
    /// The category to budget for.
    pub category_id: ResourceId,
    /// The budgeted amount, always greater than zero.
    pub amount: Decimal,
    /// Serialized as `YYYY-MM-01`.
    pub month: Month,
}

impl BudgetForm {
    /// Create a budget form.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidAmount] if `amount` is zero or negative.
    pub fn new(category_id: ResourceId, amount: Decimal, month: Month) -> Result<Self, Error> {
        if amount <= Decimal::ZERO {
            return Err(Error::InvalidAmount);
        }

        Ok(Self {
            category_id,
            amount,
            month,
        })
    }
}

/// How much of a budget has been used.
///
/// Not persisted, it is derived from the backend's monthly summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetStatus {
    /// The budget being tracked.
    pub budget: Budget,
    /// Total expenses in the budget's category and month.
    pub spent: Decimal,
    /// `budget.amount - spent`, negative when the budget is exceeded.
    pub remaining: Decimal,
    /// `spent` as a percentage of `budget.amount`, 0 when the amount is 0.
    pub percentage: f64,
    /// Whether the budget has been exceeded.
    pub is_exceeded: bool,
}

impl BudgetStatus {
    /// Derive the status of `budget` given the amount `spent`.
    ///
    /// `is_exceeded` is taken as given rather than recomputed so that the
    /// caller decides what counts as exceeded.
    pub fn new(budget: Budget, spent: Decimal, is_exceeded: bool) -> Self {
        Self {
            remaining: budget.amount - spent,
            percentage: percentage_used(spent, budget.amount),
            spent,
            budget,
            is_exceeded,
        }
    }

    /// The ID used for alerts about this budget, `<budget id>-<YYYY-MM>`.
    ///
    /// Spending changes within a month keep the same ID.
    pub fn alert_id(&self) -> String {
        format!("{}-{}", self.budget.id, self.budget.month.query_value())
    }
}

/// `spent` as a percentage of `amount`, rounded to two decimal places.
///
/// Returns 0 when `amount` is not positive instead of dividing by zero.
pub fn percentage_used(spent: Decimal, amount: Decimal) -> f64 {
    if amount <= Decimal::ZERO {
        return 0.0;
    }

    (spent / amount * Decimal::ONE_HUNDRED)
        .round_dp(2)
        .to_f64()
        .unwrap_or(0.0)
}

/// All budget statuses of a month and their totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetOverview {
    /// Sum of the budgeted amounts.
    pub total_budgeted: Decimal,
    /// Sum of the amounts spent.
    pub total_spent: Decimal,
    /// `total_budgeted - total_spent`.
    pub total_remaining: Decimal,
    /// One status per budget in the month.
    pub budgets: Vec<BudgetStatus>,
    /// The month the overview describes.
    pub month: Month,
}

impl BudgetOverview {
    /// An overview with no budgets and zeroed totals.
    pub fn empty(month: Month) -> Self {
        Self::from_statuses(month, Vec::new())
    }

    /// Build an overview whose totals are the sums over `budgets`.
    pub fn from_statuses(month: Month, budgets: Vec<BudgetStatus>) -> Self {
        let total_budgeted: Decimal = budgets.iter().map(|status| status.budget.amount).sum();
        let total_spent: Decimal = budgets.iter().map(|status| status.spent).sum();

        Self {
            total_budgeted,
            total_spent,
            total_remaining: total_budgeted - total_spent,
            budgets,
            month,
        }
    }

    /// Find the status of the budget with `id`.
    pub fn find(&self, id: &ResourceId) -> Option<&BudgetStatus> {
        self.budgets.iter().find(|status| &status.budget.id == id)
    }
}
