//! The client store: the [BudgetState] plus the operations that change it.
//!
//! A [BudgetStore] performs requests through a [BudgetApi] and feeds the
//! outcomes through [reduce]. Successful mutations are followed by the
//! [FollowUp]s of the registered [MutationHook]s, by default a success
//! notification and a refetch of the current month's overview.

use std::{
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Instant,
};

use tokio::sync::broadcast;

use crate::{
    Error,
    api::BudgetApi,
    budget::{Budget, BudgetForm, BudgetOverview},
    category::{Category, CategoryForm},
    id::ResourceId,
    month::Month,
    notification::{Notification, NotificationGate},
    overview::adapt_monthly_summary,
    state::{Action, BudgetState, reduce},
};

const NOTIFICATION_CAPACITY: usize = 16;

/// A change that the backend accepted.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// A budget was created.
    BudgetCreated(Budget),
    /// A budget was updated.
    BudgetUpdated(Budget),
    /// The budget with the id was deleted.
    BudgetDeleted(ResourceId),
    /// A category was created.
    CategoryCreated(Category),
    /// A category was updated.
    CategoryUpdated(Category),
    /// The category with the id was deleted.
    CategoryDeleted(ResourceId),
}

impl Mutation {
    /// The message shown to the user once the mutation is done.
    pub fn success_message(&self) -> &'static str {
        match self {
            Mutation::BudgetCreated(_) => "Budget created successfully",
            Mutation::BudgetUpdated(_) => "Budget updated successfully",
            Mutation::BudgetDeleted(_) => "Budget deleted successfully",
            Mutation::CategoryCreated(_) => "Category created successfully",
            Mutation::CategoryUpdated(_) => "Category updated successfully",
            Mutation::CategoryDeleted(_) => "Category deleted successfully",
        }
    }

    fn action(&self) -> Action {
        match self {
            Mutation::BudgetCreated(budget) | Mutation::BudgetUpdated(budget) => {
                Action::BudgetSaved(budget.clone())
            }
            Mutation::BudgetDeleted(id) => Action::BudgetRemoved(id.clone()),
            Mutation::CategoryCreated(category) | Mutation::CategoryUpdated(category) => {
                Action::CategorySaved(category.clone())
            }
            Mutation::CategoryDeleted(id) => Action::CategoryRemoved(id.clone()),
        }
    }
}

/// Work to do after a mutation has been applied to the state.
#[derive(Debug, Clone, PartialEq)]
pub enum FollowUp {
    /// Fetch the overview of the month again.
    RefetchOverview(Month),
    /// Show a notification.
    Notify(Notification),
}

/// Decides what happens after a successful mutation.
///
/// Hooks run in registration order and only see the state, they never
/// perform requests themselves.
pub trait MutationHook: Send + Sync {
    /// The follow-ups for `mutation`, given the state after it was applied.
    fn after_mutation(&self, mutation: &Mutation, state: &BudgetState) -> Vec<FollowUp>;
}

/// Refetches the current month so that totals and alerts match the backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct RefetchOverview;

impl MutationHook for RefetchOverview {
    fn after_mutation(&self, _mutation: &Mutation, state: &BudgetState) -> Vec<FollowUp> {
        vec![FollowUp::RefetchOverview(state.current_month)]
    }
}

/// Tells the user that the mutation worked.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotifyOnSuccess;

impl MutationHook for NotifyOnSuccess {
    fn after_mutation(&self, mutation: &Mutation, _state: &BudgetState) -> Vec<FollowUp> {
        vec![FollowUp::Notify(Notification::success(
            mutation.success_message(),
        ))]
    }
}

/// Holds the client state and performs the operations on it.
///
/// Share it between tasks with an [Arc]. Locks are only held while reducing,
/// never across a request.
pub struct BudgetStore<A> {
    api: Arc<A>,
    state: Mutex<BudgetState>,
    notification_gate: Mutex<NotificationGate>,
    notifications: broadcast::Sender<Notification>,
    hooks: Vec<Arc<dyn MutationHook>>,
}

impl<A: BudgetApi> BudgetStore<A> {
    /// A store viewing `current_month` with the default hooks.
    pub fn new(api: Arc<A>, current_month: Month) -> Self {
        Self::with_hooks(
            api,
            current_month,
            vec![Arc::new(NotifyOnSuccess), Arc::new(RefetchOverview)],
        )
    }

    /// A store viewing `current_month` that runs `hooks` after each
    /// successful mutation.
    pub fn with_hooks(
        api: Arc<A>,
        current_month: Month,
        hooks: Vec<Arc<dyn MutationHook>>,
    ) -> Self {
        let (notifications, _receiver) = broadcast::channel(NOTIFICATION_CAPACITY);

        Self {
            api,
            state: Mutex::new(BudgetState::new(current_month)),
            notification_gate: Mutex::new(NotificationGate::default()),
            notifications,
            hooks,
        }
    }

    /// Replace the notification debounce.
    pub fn with_notification_gate(self, gate: NotificationGate) -> Self {
        Self {
            notification_gate: Mutex::new(gate),
            ..self
        }
    }

    /// The backend the store talks to.
    pub fn api(&self) -> &A {
        &self.api
    }

    /// A snapshot of the current state.
    pub fn state(&self) -> BudgetState {
        self.lock_state().clone()
    }

    /// Receive the notifications that pass the debounce.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    /// Fetch the overview of `month`.
    ///
    /// The state is marked as loading before this function returns, and
    /// loading ends when the returned future completes, whether the fetch
    /// succeeded or not. On failure the previous overview is kept and the
    /// error message is stored. If another fetch is started in the meantime,
    /// this fetch's outcome is discarded. Dropping the future before it
    /// completes also ends loading.
    pub fn fetch_budget_overview(
        &self,
        month: Month,
    ) -> impl Future<Output = Result<BudgetOverview, Error>> + Send + '_ {
        let generation = self.dispatch(Action::FetchStarted).fetch_generation;
        tracing::debug!("fetching overview of {} (fetch {generation})", month.query_value());
        let mut guard = FetchGuard {
            store: self,
            generation,
            finished: false,
        };

        async move {
            let _ = &guard;
            let result = self
                .api
                .monthly_summary(month)
                .await
                .map(|payload| adapt_monthly_summary(&payload, month));
            guard.finished = true;

            match &result {
                Ok(overview) => {
                    self.dispatch(Action::FetchSucceeded {
                        generation,
                        overview: overview.clone(),
                    });
                }
                Err(error) => {
                    tracing::warn!("could not fetch overview of {month}: {error}");
                    let state = self.dispatch(Action::FetchFailed {
                        generation,
                        message: error.to_string(),
                    });

                    if state.fetch_generation == generation {
                        self.notify(Notification::error(error.to_string()));
                    }
                }
            }

            result
        }
    }

    /// View `month` and fetch its overview.
    pub async fn set_current_month(&self, month: Month) -> Result<BudgetOverview, Error> {
        self.dispatch(Action::MonthSelected(month));
        self.fetch_budget_overview(month).await
    }

    /// Load the budgets of the current month.
    pub async fn load_budgets(&self) -> Result<Vec<Budget>, Error> {
        let month = self.state().current_month;
        let budgets = self.check(self.api.list_budgets(Some(month)).await)?;
        self.dispatch(Action::BudgetsLoaded(budgets.clone()));

        Ok(budgets)
    }

    /// Load all categories.
    pub async fn load_categories(&self) -> Result<Vec<Category>, Error> {
        let categories = self.check(self.api.list_categories().await)?;
        self.dispatch(Action::CategoriesLoaded(categories.clone()));

        Ok(categories)
    }

    /// Create a budget.
    ///
    /// # Errors
    ///
    /// Returns the backend's error. The cached budgets and overview are left
    /// untouched and the error message is stored in the state.
    pub async fn create_budget(&self, form: &BudgetForm) -> Result<Budget, Error> {
        let budget = self.check(self.api.create_budget(form).await)?;
        self.apply(Mutation::BudgetCreated(budget.clone())).await;

        Ok(budget)
    }

    /// Update the budget with `id`.
    pub async fn update_budget(&self, id: &ResourceId, form: &BudgetForm) -> Result<Budget, Error> {
        let budget = self.check(self.api.update_budget(id, form).await)?;
        self.apply(Mutation::BudgetUpdated(budget.clone())).await;

        Ok(budget)
    }

    /// Delete the budget with `id`.
    pub async fn delete_budget(&self, id: &ResourceId) -> Result<(), Error> {
        self.check(self.api.delete_budget(id).await)?;
        self.apply(Mutation::BudgetDeleted(id.clone())).await;

        Ok(())
    }

    /// Create a category.
    pub async fn create_category(&self, form: &CategoryForm) -> Result<Category, Error> {
        let category = self.check(self.api.create_category(form).await)?;
        self.apply(Mutation::CategoryCreated(category.clone())).await;

        Ok(category)
    }

    /// Update the category with `id`.
    pub async fn update_category(
        &self,
        id: &ResourceId,
        form: &CategoryForm,
    ) -> Result<Category, Error> {
        let category = self.check(self.api.update_category(id, form).await)?;
        self.apply(Mutation::CategoryUpdated(category.clone())).await;

        Ok(category)
    }

    /// Delete the category with `id`. Its cached budgets are dropped too.
    pub async fn delete_category(&self, id: &ResourceId) -> Result<(), Error> {
        self.check(self.api.delete_category(id).await)?;
        self.apply(Mutation::CategoryDeleted(id.clone())).await;

        Ok(())
    }

    /// Forget the last error.
    pub fn clear_error(&self) {
        self.dispatch(Action::ErrorCleared);
    }

    fn lock_state(&self) -> MutexGuard<'_, BudgetState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn dispatch(&self, action: Action) -> BudgetState {
        let mut state = self.lock_state();
        *state = reduce(state.clone(), action);
        state.clone()
    }

    fn check<T>(&self, result: Result<T, Error>) -> Result<T, Error> {
        if let Err(error) = &result {
            tracing::warn!("request failed: {error}");
            self.dispatch(Action::RequestFailed(error.to_string()));
            self.notify(Notification::error(error.to_string()));
        }

        result
    }

    async fn apply(&self, mutation: Mutation) {
        let state = self.dispatch(mutation.action());
        let follow_ups: Vec<FollowUp> = self
            .hooks
            .iter()
            .flat_map(|hook| hook.after_mutation(&mutation, &state))
            .collect();

        for follow_up in follow_ups {
            match follow_up {
                FollowUp::RefetchOverview(month) => {
                    // Already recorded in the state, the mutation itself succeeded.
                    if let Err(error) = self.fetch_budget_overview(month).await {
                        tracing::warn!("refetch after {mutation:?} failed: {error}");
                    }
                }
                FollowUp::Notify(notification) => self.notify(notification),
            }
        }
    }

    fn notify(&self, notification: Notification) {
        let allowed = self
            .notification_gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .try_pass(Instant::now());

        if !allowed {
            tracing::debug!("suppressed notification {notification:?}");
            return;
        }

        // Nobody may be listening.
        let _ = self.notifications.send(notification);
    }
}

/// Ends the loading state of a fetch whose future is dropped early.
struct FetchGuard<'a, A: BudgetApi> {
    store: &'a BudgetStore<A>,
    generation: u64,
    finished: bool,
}

impl<A: BudgetApi> Drop for FetchGuard<'_, A> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::debug!("overview fetch {} was cancelled", self.generation);
            self.store.dispatch(Action::FetchCancelled {
                generation: self.generation,
            });
        }
    }
}
