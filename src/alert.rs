//! Budget alerts for budgets that are exceeded or close to their limit.
//!
//! Alerts are derived from a month's budget statuses every time the overview
//! is fetched. The user may dismiss an alert for the rest of the session.

use std::collections::HashSet;

use serde::Serialize;

use crate::{
    budget::{BudgetOverview, BudgetStatus},
    money::format_currency,
};

/// Budgets using at least this percentage of their amount get a warning.
pub const WARNING_THRESHOLD: f64 = 90.0;

/// Why an alert was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// The budget has been exceeded.
    Exceeded,
    /// The budget is at or above [WARNING_THRESHOLD] percent.
    Warning,
}

/// Display priority, [AlertPriority::High] sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertPriority {
    /// Exceeded budgets.
    High,
    /// Budgets close to their limit.
    Medium,
}

/// A notice about one budget.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetAlert {
    /// `<budget id>-<YYYY-MM>`, see [BudgetStatus::alert_id].
    pub id: String,
    /// Why the alert was raised.
    #[serde(rename = "type")]
    pub kind: AlertKind,
    /// Short heading.
    pub title: String,
    /// The text shown to the user.
    pub message: String,
    /// The status that triggered the alert.
    #[serde(rename = "budgetStatus")]
    pub budget_status: BudgetStatus,
    /// Display priority.
    pub priority: AlertPriority,
}

impl BudgetAlert {
    /// The alert for `status`, if it needs one.
    ///
    /// An exceeded budget always gets an [AlertKind::Exceeded] alert and never
    /// also a warning.
    fn for_status(status: &BudgetStatus) -> Option<Self> {
        let category = &status.budget.category.name;

        let (kind, title, message, priority) = if status.is_exceeded {
            (
                AlertKind::Exceeded,
                "Budget Exceeded",
                format!(
                    "You have exceeded your {category} budget by {}",
                    format_currency(status.remaining.abs())
                ),
                AlertPriority::High,
            )
        } else if status.percentage >= WARNING_THRESHOLD {
            (
                AlertKind::Warning,
                "Budget Warning",
                format!(
                    "You have used {:.0}% of your {category} budget",
                    status.percentage.round()
                ),
                AlertPriority::Medium,
            )
        } else {
            return None;
        };

        Some(Self {
            id: status.alert_id(),
            kind,
            title: title.to_owned(),
            message,
            budget_status: status.clone(),
            priority,
        })
    }
}

/// The IDs of the alerts the user has dismissed this session.
///
/// Not persisted, a new session starts with nothing dismissed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DismissedAlerts(HashSet<String>);

impl DismissedAlerts {
    /// Dismiss the alert with `id`.
    pub fn dismiss(&mut self, id: impl Into<String>) {
        self.0.insert(id.into());
    }

    /// Whether the alert with `id` has been dismissed.
    pub fn is_dismissed(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    /// Forget every dismissal.
    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// The number of dismissed alerts.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing has been dismissed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Build the active alerts for `statuses`, skipping dismissed ones.
///
/// High priority alerts come first. Alerts of equal priority are ordered by
/// percentage used, highest first.
pub fn classify_alerts(statuses: &[BudgetStatus], dismissed: &DismissedAlerts) -> Vec<BudgetAlert> {
    let mut alerts: Vec<BudgetAlert> = statuses
        .iter()
        .filter(|status| !dismissed.is_dismissed(&status.alert_id()))
        .filter_map(BudgetAlert::for_status)
        .collect();

    alerts.sort_by(|a, b| {
        a.priority.cmp(&b.priority).then_with(|| {
            b.budget_status
                .percentage
                .total_cmp(&a.budget_status.percentage)
        })
    });

    alerts
}

/// Alerts split by kind for grouped display.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AlertGroups {
    /// Exceeded budgets.
    pub critical: Vec<BudgetAlert>,
    /// Budgets close to their limit.
    pub warning: Vec<BudgetAlert>,
}

/// Split `alerts` into critical and warning alerts, keeping their order.
pub fn group_alerts(alerts: Vec<BudgetAlert>) -> AlertGroups {
    let (critical, warning): (Vec<_>, Vec<_>) = alerts
        .into_iter()
        .partition(|alert| alert.kind == AlertKind::Exceeded);

    AlertGroups { critical, warning }
}

/// The session's alert view: classifies overviews and remembers dismissals.
#[derive(Debug, Clone, Default)]
pub struct AlertCenter {
    dismissed: DismissedAlerts,
}

impl AlertCenter {
    /// Create an alert center with nothing dismissed.
    pub fn new() -> Self {
        Self::default()
    }

    /// The active alerts for `overview`.
    pub fn active(&self, overview: &BudgetOverview) -> Vec<BudgetAlert> {
        classify_alerts(&overview.budgets, &self.dismissed)
    }

    /// The active alerts for `overview`, grouped by kind.
    pub fn grouped(&self, overview: &BudgetOverview) -> AlertGroups {
        group_alerts(self.active(overview))
    }

    /// Hide the alert with `id` for the rest of the session.
    pub fn dismiss(&mut self, id: impl Into<String>) {
        let id = id.into();
        tracing::debug!("dismissing budget alert {id}");
        self.dismissed.dismiss(id);
    }

    /// Show every dismissed alert again.
    pub fn clear(&mut self) {
        self.dismissed.clear();
    }

    /// The dismissed alert IDs.
    pub fn dismissed(&self) -> &DismissedAlerts {
        &self.dismissed
    }
}
