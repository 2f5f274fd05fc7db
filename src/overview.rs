//! Converts the backend's monthly summary into a [BudgetOverview].
//!
//! The backend reports one flat record per budget. The adapter nests each
//! record into a [Budget] with its [Category], derives the status fields and
//! sums the totals. Missing or malformed data degrades to an empty overview so
//! that a change in the backend's payload shows "no budgets" instead of
//! failing the page.

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use crate::{
    budget::{Budget, BudgetOverview, BudgetStatus},
    category::{Category, DEFAULT_CATEGORY_COLOR},
    id::ResourceId,
    month::Month,
};

/// The only status string that marks a budget as exceeded.
pub const OVER_BUDGET_STATUS: &str = "over_budget";

/// One entry of `budget_details` in the monthly summary payload.
#[derive(Debug, Deserialize)]
struct SummaryDetail {
    budget_id: ResourceId,
    category_id: ResourceId,
    category_name: String,
    #[serde(default)]
    category_color: Option<String>,
    budget_amount: Decimal,
    spent_amount: Decimal,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    month: Option<String>,
}

impl SummaryDetail {
    fn into_status(self, fallback_month: Month) -> BudgetStatus {
        let month = self
            .month
            .as_deref()
            .and_then(|text| text.parse().ok())
            .unwrap_or(fallback_month);

        let budget = Budget {
            id: self.budget_id,
            category: Category {
                id: self.category_id,
                name: self.category_name,
                color: self
                    .category_color
                    .unwrap_or_else(|| DEFAULT_CATEGORY_COLOR.to_owned()),
                description: None,
            },
            amount: self.budget_amount,
            month,
            created_at: None,
            updated_at: None,
        };

        let is_exceeded = self.status.as_deref() == Some(OVER_BUDGET_STATUS);

        BudgetStatus::new(budget, self.spent_amount, is_exceeded)
    }
}

/// Convert a monthly summary `payload` into a [BudgetOverview].
///
/// `requested_month` is used when the payload does not state its month. The
/// exceeded flag comes only from the backend's `status` field. Entries of
/// `budget_details` that cannot be read are skipped, and a missing or
/// non-array `budget_details` gives an overview with no budgets and zeroed
/// totals. The totals are always the sums over the returned budgets.
pub fn adapt_monthly_summary(payload: &Value, requested_month: Month) -> BudgetOverview {
    let month = payload
        .get("month")
        .and_then(Value::as_str)
        .and_then(|text| text.parse().ok())
        .unwrap_or(requested_month);

    let Some(details) = payload.get("budget_details").and_then(Value::as_array) else {
        tracing::warn!(
            "monthly summary for {month} has no budget_details list, treating it as no budgets"
        );
        return BudgetOverview::empty(month);
    };

    let statuses = details
        .iter()
        .filter_map(|detail| match SummaryDetail::deserialize(detail) {
            Ok(detail) => Some(detail.into_status(month)),
            Err(error) => {
                tracing::warn!("skipping malformed budget detail {detail}: {error}");
                None
            }
        })
        .collect();

    let overview = BudgetOverview::from_statuses(month, statuses);
    log_total_mismatch(payload, "total_budgeted", overview.total_budgeted);
    log_total_mismatch(payload, "total_spent", overview.total_spent);

    overview
}

fn log_total_mismatch(payload: &Value, field: &str, computed: Decimal) {
    let reported = payload
        .get(field)
        .and_then(|value| <Decimal as Deserialize>::deserialize(value).ok());

    if let Some(reported) = reported
        && reported != computed
    {
        tracing::debug!("backend reported {field} = {reported} but the budgets sum to {computed}");
    }
}

#[cfg(test)]
mod adapt_monthly_summary_tests {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use serde_json::{Value, json};

    use crate::{id::ResourceId, month::Month};

    use super::adapt_monthly_summary;

    fn january() -> Month {
        Month::new(2024, 1).unwrap()
    }

    fn detail(id: i64, name: &str, amount: &str, spent: &str, status: &str) -> Value {
        json!({
            "budget_id": id,
            "category_id": id + 100,
            "category_name": name,
            "category_color": "#123456",
            "budget_amount": amount,
            "spent_amount": spent,
            "remaining_amount": "0.00",
            "percentage_used": 0.0,
            "status": status,
            "month": "2024-01-01"
        })
    }

    #[test]
    fn nests_details_into_budget_statuses() {
        let payload = json!({
            "total_budgeted": "1000.00",
            "total_spent": "910.00",
            "total_remaining": "90.00",
            "month": "2024-01-01",
            "budget_details": [detail(3, "Food", "500.00", "450.00", "near_limit")]
        });

        let overview = adapt_monthly_summary(&payload, january());
        let status = &overview.budgets[0];

        assert_eq!(status.budget.id, ResourceId::from("3"));
        assert_eq!(status.budget.category.id, ResourceId::from("103"));
        assert_eq!(status.budget.category.name, "Food");
        assert_eq!(status.budget.category.color, "#123456");
        assert_eq!(status.budget.month, january());
        assert_eq!(status.spent, dec!(450.00));
        assert_eq!(status.remaining, dec!(50.00));
        assert_eq!(status.percentage, 90.0);
        assert!(!status.is_exceeded);
    }

    #[test]
    fn exceeded_only_when_status_is_over_budget() {
        let payload = json!({
            "month": "2024-01-01",
            "budget_details": [
                detail(1, "Over", "100", "150", "over_budget"),
                detail(2, "Near", "100", "150", "near_limit"),
                detail(3, "Odd", "100", "50", "something_else"),
                detail(4, "Flagged", "100", "50", "over_budget"),
            ]
        });

        let overview = adapt_monthly_summary(&payload, january());
        let exceeded: Vec<bool> = overview.budgets.iter().map(|s| s.is_exceeded).collect();

        assert_eq!(exceeded, vec![true, false, false, true]);
    }

    #[test]
    fn remaining_is_amount_minus_spent_exactly() {
        let payload = json!({
            "budget_details": [
                detail(1, "A", "0.10", "0.20", "over_budget"),
                detail(2, "B", "333.33", "111.11", "under_budget"),
            ]
        });

        for status in adapt_monthly_summary(&payload, january()).budgets {
            assert_eq!(status.remaining, status.budget.amount - status.spent);
        }
    }

    #[test]
    fn missing_budget_details_gives_empty_overview() {
        let payload = json!({
            "total_budgeted": "500.00",
            "total_spent": "100.00",
            "total_remaining": "400.00",
            "month": "2024-01-01"
        });

        let overview = adapt_monthly_summary(&payload, january());

        assert!(overview.budgets.is_empty());
        assert_eq!(overview.total_budgeted, Decimal::ZERO);
        assert_eq!(overview.total_spent, Decimal::ZERO);
        assert_eq!(overview.total_remaining, Decimal::ZERO);
    }

    #[test]
    fn non_object_payload_gives_empty_overview() {
        for payload in [json!(null), json!([]), json!("oops"), json!({ "budget_details": {} })] {
            let overview = adapt_monthly_summary(&payload, january());

            assert!(overview.budgets.is_empty());
            assert_eq!(overview.month, january());
        }
    }

    #[test]
    fn skips_malformed_entries_and_sums_the_rest() {
        let payload = json!({
            "budget_details": [
                detail(1, "Food", "800", "650", "under_budget"),
                { "budget_id": 2, "category_name": "Broken" },
                detail(3, "Fun", "300", "270", "near_limit"),
            ]
        });

        let overview = adapt_monthly_summary(&payload, january());

        assert_eq!(overview.budgets.len(), 2);
        assert_eq!(overview.total_budgeted, dec!(1100));
        assert_eq!(overview.total_spent, dec!(920));
        assert_eq!(overview.total_remaining, dec!(180));
    }

    #[test]
    fn reads_numeric_money_values() {
        let payload = json!({
            "total_budgeted": 800,
            "total_spent": 650.5,
            "budget_details": [{
                "budget_id": 1,
                "category_id": 2,
                "category_name": "Food",
                "budget_amount": 800,
                "spent_amount": 650.5,
                "status": "near_limit"
            }]
        });

        let overview = adapt_monthly_summary(&payload, january());
        let status = &overview.budgets[0];

        assert_eq!(status.budget.amount, dec!(800));
        assert_eq!(status.spent, dec!(650.5));
        assert_eq!(status.remaining, dec!(149.5));
        assert_eq!(overview.total_budgeted, dec!(800));
        assert_eq!(overview.total_spent, dec!(650.5));
    }

    #[test]
    fn uses_payload_month_over_requested_month() {
        let payload = json!({ "month": "2024-02-01", "budget_details": [] });

        let overview = adapt_monthly_summary(&payload, january());

        assert_eq!(overview.month, Month::new(2024, 2).unwrap());
    }

    #[test]
    fn does_not_modify_payload() {
        let payload = json!({ "budget_details": [detail(1, "Food", "10", "5", "under_budget")] });
        let before = payload.clone();

        adapt_monthly_summary(&payload, january());

        assert_eq!(payload, before);
    }
}
