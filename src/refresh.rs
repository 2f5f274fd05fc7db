//! Periodic refresh of the overview while the alerts view is open.

use std::{sync::Arc, time::Duration};

use tokio::{
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};

use crate::{api::BudgetApi, store::BudgetStore};

/// How often the alerts view refetches the overview.
pub const DEFAULT_REFRESH_PERIOD: Duration = Duration::from_secs(60);

/// Starts background refreshes of a [BudgetStore].
pub struct AlertRefresher;

impl AlertRefresher {
    /// Fetch the overview of the store's current month now and then every
    /// `period`, until the returned handle is stopped or dropped.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<A>(store: Arc<BudgetStore<A>>, period: Duration) -> RefreshHandle
    where
        A: BudgetApi + 'static,
    {
        let task = tokio::spawn(async move {
            tracing::debug!("alert refresh started ({period:?} period)");

            let mut ticks = interval(period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticks.tick().await;

                let month = store.state().current_month;
                // Failures are recorded in the store's state.
                if let Err(error) = store.fetch_budget_overview(month).await {
                    tracing::debug!("alert refresh of {month} failed: {error}");
                }
            }
        });

        RefreshHandle { task }
    }
}

/// Keeps a refresh running. The refresh stops when this is dropped.
#[derive(Debug)]
pub struct RefreshHandle {
    task: JoinHandle<()>,
}

impl RefreshHandle {
    /// Stop refreshing.
    pub fn stop(self) {
        // Drop aborts the task.
    }

    /// Whether the refresh task has ended.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.task.abort();
        tracing::debug!("alert refresh stopped");
    }
}
