//! Budget tracking from raw transactions.
//!
//! Computes, from budgets and transactions, the same figures the backend
//! reports in its monthly summary: how much was spent per budget, whether a
//! budget is under, near or over its limit, which budgets need an alert, and
//! what a proposed expense would do to a budget. [monthly_summary] produces the
//! payload that [crate::adapt_monthly_summary] consumes.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    budget::{Budget, percentage_used},
    id::ResourceId,
    money::format_currency,
    month::Month,
    transaction::{Transaction, TransactionType},
};

/// Budgets at or above this percentage are near their limit.
pub const NEAR_LIMIT_THRESHOLD: f64 = 80.0;

/// Where spending stands relative to the budgeted amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpendingStatus {
    /// Less than [NEAR_LIMIT_THRESHOLD] percent used.
    UnderBudget,
    /// At least [NEAR_LIMIT_THRESHOLD] percent used, not more than the amount.
    NearLimit,
    /// More than the budgeted amount spent.
    OverBudget,
}

impl SpendingStatus {
    /// Classify `spent` against the budgeted `amount`.
    pub fn classify(spent: Decimal, amount: Decimal) -> Self {
        if spent > amount {
            SpendingStatus::OverBudget
        } else if percentage_used(spent, amount) >= NEAR_LIMIT_THRESHOLD {
            SpendingStatus::NearLimit
        } else {
            SpendingStatus::UnderBudget
        }
    }

    /// The alert level shown for this status.
    pub fn alert_level(self) -> AlertLevel {
        match self {
            SpendingStatus::UnderBudget => AlertLevel::None,
            SpendingStatus::NearLimit => AlertLevel::Warning,
            SpendingStatus::OverBudget => AlertLevel::Danger,
        }
    }
}

/// How loudly a budget should be flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    /// Nothing to report.
    None,
    /// Close to the limit.
    Warning,
    /// Over the limit.
    Danger,
}

/// The tracked status of one budget, in the backend's flat record shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetDetail {
    /// The id of the budget.
    pub budget_id: ResourceId,
    /// The id of the budgeted category.
    pub category_id: ResourceId,
    /// The name of the budgeted category.
    pub category_name: String,
    /// The colour of the budgeted category.
    pub category_color: String,
    /// The budgeted amount.
    pub budget_amount: Decimal,
    /// Expenses in the category during the month.
    pub spent_amount: Decimal,
    /// `budget_amount - spent_amount`.
    pub remaining_amount: Decimal,
    /// `spent_amount` as a percentage of `budget_amount`.
    pub percentage_used: f64,
    /// Under, near or over the limit.
    pub status: SpendingStatus,
    /// The alert level matching `status`.
    pub alert_level: AlertLevel,
    /// The budget's month.
    pub month: Month,
}

/// Sum of the expenses that count against `budget`.
///
/// Only expenses in the budget's category and month count. Income,
/// uncategorised transactions and other months are ignored.
pub fn spent_against(budget: &Budget, transactions: &[Transaction]) -> Decimal {
    transactions
        .iter()
        .filter(|transaction| counts_against(budget, transaction))
        .map(|transaction| transaction.amount)
        .sum()
}

fn counts_against(budget: &Budget, transaction: &Transaction) -> bool {
    transaction.is_expense()
        && transaction.category.as_ref() == Some(&budget.category.id)
        && budget.month.contains(transaction.date)
}

/// Compute the tracked status of `budget` from `transactions`.
pub fn calculate_budget_status(budget: &Budget, transactions: &[Transaction]) -> BudgetDetail {
    let spent = spent_against(budget, transactions);
    let status = SpendingStatus::classify(spent, budget.amount);

    BudgetDetail {
        budget_id: budget.id.clone(),
        category_id: budget.category.id.clone(),
        category_name: budget.category.name.clone(),
        category_color: budget.category.color.clone(),
        budget_amount: budget.amount,
        spent_amount: spent,
        remaining_amount: budget.amount - spent,
        percentage_used: percentage_used(spent, budget.amount),
        status,
        alert_level: status.alert_level(),
        month: budget.month,
    }
}

/// Totals over the budgets of a month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryTotals {
    /// Sum of the budgeted amounts.
    pub total_budgeted: Decimal,
    /// Sum of the amounts spent.
    pub total_spent: Decimal,
    /// `total_budgeted - total_spent`.
    pub total_remaining: Decimal,
    /// `total_spent` as a percentage of `total_budgeted`.
    pub overall_percentage_used: f64,
    /// Number of budgets in the month.
    pub budget_count: usize,
    /// Number of budgets under their limit.
    pub budgets_under_limit: usize,
    /// Number of budgets near their limit.
    pub budgets_near_limit: usize,
    /// Number of budgets over their limit.
    pub budgets_over_limit: usize,
}

impl SummaryTotals {
    fn of(details: &[BudgetDetail]) -> Self {
        let total_budgeted: Decimal = details.iter().map(|d| d.budget_amount).sum();
        let total_spent: Decimal = details.iter().map(|d| d.spent_amount).sum();
        let count_status = |status| details.iter().filter(|d| d.status == status).count();

        Self {
            total_budgeted,
            total_spent,
            total_remaining: total_budgeted - total_spent,
            overall_percentage_used: percentage_used(total_spent, total_budgeted),
            budget_count: details.len(),
            budgets_under_limit: count_status(SpendingStatus::UnderBudget),
            budgets_near_limit: count_status(SpendingStatus::NearLimit),
            budgets_over_limit: count_status(SpendingStatus::OverBudget),
        }
    }
}

/// The monthly summary payload, as served by the backend's
/// `monthly_summary` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySummary {
    /// The totals, serialized inline.
    #[serde(flatten)]
    pub totals: SummaryTotals,
    /// The summarised month.
    pub month: Month,
    /// One record per budget of the month.
    pub budget_details: Vec<BudgetDetail>,
}

fn details_of_month(
    budgets: &[Budget],
    transactions: &[Transaction],
    month: Month,
) -> Vec<BudgetDetail> {
    budgets
        .iter()
        .filter(|budget| budget.month == month)
        .map(|budget| calculate_budget_status(budget, transactions))
        .collect()
}

/// Summarise the budgets of `month`. Budgets of other months are ignored.
pub fn monthly_summary(
    budgets: &[Budget],
    transactions: &[Transaction],
    month: Month,
) -> MonthlySummary {
    let budget_details = details_of_month(budgets, transactions, month);

    MonthlySummary {
        totals: SummaryTotals::of(&budget_details),
        month,
        budget_details,
    }
}

/// The payload of the backend's budget `status` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetStatusReport {
    /// The reported month.
    pub month: Month,
    /// Totals over `budgets`.
    pub summary: SummaryTotals,
    /// One record per budget of the month.
    pub budgets: Vec<BudgetDetail>,
}

/// The status report of `month`, with the same figures as [monthly_summary].
pub fn budget_status(
    budgets: &[Budget],
    transactions: &[Transaction],
    month: Month,
) -> BudgetStatusReport {
    let details = details_of_month(budgets, transactions, month);

    BudgetStatusReport {
        month,
        summary: SummaryTotals::of(&details),
        budgets: details,
    }
}

/// Why the backend raised a budget alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitAlertType {
    /// The budget is near its limit.
    ApproachingLimit,
    /// More than the budgeted amount was spent.
    LimitExceeded,
}

/// One entry of the backend's budget alert list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitAlert {
    /// The budget the alert is about.
    pub budget_id: ResourceId,
    /// The name of the budgeted category.
    pub category_name: String,
    /// Near or over the limit.
    pub alert_type: LimitAlertType,
    /// The text shown to the user.
    pub message: String,
    /// The budgeted amount.
    #[serde(default)]
    pub budget_amount: Decimal,
    /// The amount spent.
    #[serde(default)]
    pub spent_amount: Decimal,
    /// `spent_amount` as a percentage of `budget_amount`.
    #[serde(default)]
    pub percentage_used: f64,
}

impl LimitAlert {
    fn from_detail(detail: BudgetDetail) -> Option<Self> {
        let (alert_type, message) = match detail.status {
            SpendingStatus::UnderBudget => return None,
            SpendingStatus::NearLimit => (
                LimitAlertType::ApproachingLimit,
                format!(
                    "You have used {:.1}% of your {} budget",
                    detail.percentage_used, detail.category_name
                ),
            ),
            SpendingStatus::OverBudget => (
                LimitAlertType::LimitExceeded,
                format!(
                    "You have exceeded your {} budget by {}",
                    detail.category_name,
                    format_currency(detail.spent_amount - detail.budget_amount)
                ),
            ),
        };

        Some(Self {
            budget_id: detail.budget_id,
            category_name: detail.category_name,
            alert_type,
            message,
            budget_amount: detail.budget_amount,
            spent_amount: detail.spent_amount,
            percentage_used: detail.percentage_used,
        })
    }
}

/// The payload of the backend's budget `alerts` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitAlertList {
    /// Number of alerts.
    pub count: usize,
    /// One alert per budget near or over its limit.
    pub alerts: Vec<LimitAlert>,
}

/// The alerts for the budgets of `month` that are near or over their limit.
pub fn budget_alerts(
    budgets: &[Budget],
    transactions: &[Transaction],
    month: Month,
) -> LimitAlertList {
    let alerts: Vec<LimitAlert> = details_of_month(budgets, transactions, month)
        .into_iter()
        .filter_map(LimitAlert::from_detail)
        .collect();

    LimitAlertList {
        count: alerts.len(),
        alerts,
    }
}

/// A transaction the user is about to enter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedTransaction {
    /// The category the transaction would be filed under.
    pub category: Option<ResourceId>,
    /// The amount of the transaction.
    pub amount: Decimal,
    /// When the transaction would happen.
    #[serde(with = "crate::month::iso_date")]
    pub date: Date,
    /// Income or expense.
    pub transaction_type: TransactionType,
}

/// What a proposed expense would do to its budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionImpact {
    /// The affected budget.
    pub budget_id: ResourceId,
    /// Spending before the transaction.
    pub current_spent: Decimal,
    /// Spending after the transaction.
    pub new_spent: Decimal,
    /// Percentage used after the transaction.
    pub new_percentage: f64,
    /// Status before the transaction.
    pub previous_status: SpendingStatus,
    /// Status after the transaction.
    pub new_status: SpendingStatus,
    /// Whether the status changes.
    pub status_changed: bool,
    /// Alert level after the transaction.
    pub new_alert_level: AlertLevel,
}

/// Work out how `proposed` would affect its budget.
///
/// Returns `None` if the transaction is income, has no category, or there is
/// no budget for its category and month.
pub fn transaction_impact(
    budgets: &[Budget],
    transactions: &[Transaction],
    proposed: &ProposedTransaction,
) -> Option<TransactionImpact> {
    if proposed.transaction_type != TransactionType::Expense {
        return None;
    }

    let category = proposed.category.as_ref()?;
    let budget = budgets
        .iter()
        .find(|budget| &budget.category.id == category && budget.month.contains(proposed.date))?;

    let current_spent = spent_against(budget, transactions);
    let new_spent = current_spent + proposed.amount;
    let previous_status = SpendingStatus::classify(current_spent, budget.amount);
    let new_status = SpendingStatus::classify(new_spent, budget.amount);

    Some(TransactionImpact {
        budget_id: budget.id.clone(),
        current_spent,
        new_spent,
        new_percentage: percentage_used(new_spent, budget.amount),
        previous_status,
        new_status,
        status_changed: previous_status != new_status,
        new_alert_level: new_status.alert_level(),
    })
}

#[cfg(test)]
mod tracking_tests {
    use rust_decimal_macros::dec;

    use crate::{
        id::ResourceId,
        month::Month,
        test_utils::{test_budget, test_transaction},
        transaction::TransactionType,
    };

    use super::{
        AlertLevel, LimitAlertType, ProposedTransaction, SpendingStatus, budget_alerts,
        budget_status, calculate_budget_status, monthly_summary, transaction_impact,
    };

    #[test]
    fn no_transactions_is_under_budget() {
        let budget = test_budget(1, "Food", dec!(500));

        let detail = calculate_budget_status(&budget, &[]);

        assert_eq!(detail.spent_amount, dec!(0));
        assert_eq!(detail.remaining_amount, dec!(500));
        assert_eq!(detail.percentage_used, 0.0);
        assert_eq!(detail.status, SpendingStatus::UnderBudget);
        assert_eq!(detail.alert_level, AlertLevel::None);
    }

    #[test]
    fn near_limit_from_eighty_percent() {
        let budget = test_budget(1, "Food", dec!(500));
        let transactions = [test_transaction(1, &budget, dec!(425), "2024-01-15")];

        let detail = calculate_budget_status(&budget, &transactions);

        assert_eq!(detail.percentage_used, 85.0);
        assert_eq!(detail.status, SpendingStatus::NearLimit);
        assert_eq!(detail.alert_level, AlertLevel::Warning);
    }

    #[test]
    fn over_limit_when_spent_exceeds_amount() {
        let budget = test_budget(1, "Food", dec!(500));
        let transactions = [test_transaction(1, &budget, dec!(600), "2024-01-15")];

        let detail = calculate_budget_status(&budget, &transactions);

        assert_eq!(detail.remaining_amount, dec!(-100));
        assert_eq!(detail.percentage_used, 120.0);
        assert_eq!(detail.status, SpendingStatus::OverBudget);
        assert_eq!(detail.alert_level, AlertLevel::Danger);
    }

    #[test]
    fn spending_exactly_the_amount_is_not_over_budget() {
        assert_eq!(
            SpendingStatus::classify(dec!(500), dec!(500)),
            SpendingStatus::NearLimit
        );
    }

    #[test]
    fn ignores_income_other_months_and_other_categories() {
        let budget = test_budget(1, "Food", dec!(500));
        let other = test_budget(2, "Rent", dec!(500));
        let mut income = test_transaction(2, &budget, dec!(1000), "2024-01-20");
        income.transaction_type = TransactionType::Income;
        let transactions = [
            test_transaction(1, &budget, dec!(100), "2024-01-15"),
            income,
            test_transaction(3, &budget, dec!(300), "2024-02-01"),
            test_transaction(4, &other, dec!(300), "2024-01-10"),
        ];

        let detail = calculate_budget_status(&budget, &transactions);

        assert_eq!(detail.spent_amount, dec!(100));
        assert_eq!(detail.percentage_used, 20.0);
    }

    #[test]
    fn summary_counts_budgets_by_status() {
        let food = test_budget(1, "Food", dec!(500));
        let transport = test_budget(2, "Transport", dec!(300));
        let entertainment = test_budget(3, "Entertainment", dec!(200));
        let transactions = [
            test_transaction(1, &food, dec!(450), "2024-01-15"),
            test_transaction(2, &transport, dec!(360), "2024-01-15"),
            test_transaction(3, &entertainment, dec!(100), "2024-01-15"),
        ];

        let summary = monthly_summary(
            &[food, transport, entertainment],
            &transactions,
            Month::new(2024, 1).unwrap(),
        );

        assert_eq!(summary.totals.total_budgeted, dec!(1000));
        assert_eq!(summary.totals.total_spent, dec!(910));
        assert_eq!(summary.totals.total_remaining, dec!(90));
        assert_eq!(summary.totals.overall_percentage_used, 91.0);
        assert_eq!(summary.totals.budget_count, 3);
        assert_eq!(summary.totals.budgets_under_limit, 1);
        assert_eq!(summary.totals.budgets_near_limit, 1);
        assert_eq!(summary.totals.budgets_over_limit, 1);
    }

    #[test]
    fn summary_without_budgets_is_zeroed() {
        let summary = monthly_summary(&[], &[], Month::new(2024, 1).unwrap());

        assert_eq!(summary.totals.budget_count, 0);
        assert_eq!(summary.totals.total_budgeted, dec!(0));
        assert_eq!(summary.totals.overall_percentage_used, 0.0);
        assert!(summary.budget_details.is_empty());
    }

    #[test]
    fn summary_serializes_money_as_strings() {
        let budget = test_budget(1, "Food", dec!(500.00));
        let transactions = [test_transaction(1, &budget, dec!(150.00), "2024-01-15")];

        let summary = monthly_summary(&[budget], &transactions, Month::new(2024, 1).unwrap());
        let payload = serde_json::to_value(&summary).unwrap();

        assert_eq!(payload["total_budgeted"], "500.00");
        assert_eq!(payload["total_remaining"], "350.00");
        assert_eq!(payload["month"], "2024-01-01");
        assert_eq!(payload["budget_details"][0]["status"], "under_budget");
        assert_eq!(payload["budget_details"][0]["budget_id"], "1");
    }

    #[test]
    fn impact_of_expense_pushing_budget_near_limit() {
        let budget = test_budget(1, "Food", dec!(500));
        let proposed = ProposedTransaction {
            category: Some(budget.category.id.clone()),
            amount: dec!(450),
            date: crate::month::parse_date("2024-01-15").unwrap(),
            transaction_type: TransactionType::Expense,
        };

        let impact = transaction_impact(&[budget], &[], &proposed).unwrap();

        assert_eq!(impact.budget_id, ResourceId::from(1));
        assert_eq!(impact.new_spent, dec!(450));
        assert_eq!(impact.new_percentage, 90.0);
        assert!(impact.status_changed);
        assert_eq!(impact.new_alert_level, AlertLevel::Warning);
    }

    #[test]
    fn income_and_unbudgeted_transactions_have_no_impact() {
        let budget = test_budget(1, "Food", dec!(500));
        let mut proposed = ProposedTransaction {
            category: Some(budget.category.id.clone()),
            amount: dec!(50),
            date: crate::month::parse_date("2024-01-15").unwrap(),
            transaction_type: TransactionType::Income,
        };
        let budgets = [budget];

        assert_eq!(transaction_impact(&budgets, &[], &proposed), None);

        proposed.transaction_type = TransactionType::Expense;
        proposed.date = crate::month::parse_date("2024-03-15").unwrap();
        assert_eq!(transaction_impact(&budgets, &[], &proposed), None);

        proposed.date = crate::month::parse_date("2024-01-15").unwrap();
        proposed.category = None;
        assert_eq!(transaction_impact(&budgets, &[], &proposed), None);
    }

    #[test]
    fn alerts_only_for_budgets_near_or_over_limit() {
        let food = test_budget(1, "Food", dec!(500));
        let transport = test_budget(2, "Transport", dec!(300));
        let fun = test_budget(3, "Fun", dec!(200));
        let transactions = [
            test_transaction(1, &food, dec!(425), "2024-01-15"),
            test_transaction(2, &transport, dec!(400), "2024-01-15"),
            test_transaction(3, &fun, dec!(20), "2024-01-15"),
        ];

        let list = budget_alerts(
            &[food, transport, fun],
            &transactions,
            Month::new(2024, 1).unwrap(),
        );

        assert_eq!(list.count, 2);
        let approaching = &list.alerts[0];
        assert_eq!(approaching.budget_id, ResourceId::from(1));
        assert_eq!(approaching.alert_type, LimitAlertType::ApproachingLimit);
        assert!(approaching.message.contains("85.0%"), "{}", approaching.message);
        let exceeded = &list.alerts[1];
        assert_eq!(exceeded.category_name, "Transport");
        assert_eq!(exceeded.alert_type, LimitAlertType::LimitExceeded);
        assert!(exceeded.message.contains("exceeded"), "{}", exceeded.message);
        assert!(exceeded.message.contains("$100.00"), "{}", exceeded.message);
    }

    #[test]
    fn no_alerts_when_under_budget() {
        let food = test_budget(1, "Food", dec!(500));
        let transactions = [test_transaction(1, &food, dec!(100), "2024-01-15")];

        let list = budget_alerts(&[food], &transactions, Month::new(2024, 1).unwrap());

        assert_eq!(list.count, 0);
        assert!(list.alerts.is_empty());
    }

    #[test]
    fn status_report_nests_totals_under_summary() {
        let food = test_budget(1, "Food", dec!(500.00));
        let transactions = [test_transaction(1, &food, dec!(150.00), "2024-01-15")];

        let report = budget_status(&[food], &transactions, Month::new(2024, 1).unwrap());
        let payload = serde_json::to_value(&report).unwrap();

        assert_eq!(payload["summary"]["total_spent"], "150.00");
        assert_eq!(payload["summary"]["budgets_under_limit"], 1);
        assert_eq!(payload["budgets"][0]["remaining_amount"], "350.00");
        assert_eq!(payload["budgets"][0]["alert_level"], "none");
        assert_eq!(payload["month"], "2024-01-01");
    }
}
