//! The client state and the pure transitions between states.
//!
//! [reduce] never performs I/O, the [crate::BudgetStore] performs requests
//! and feeds their outcomes back in as [Action]s.

use crate::{
    budget::{Budget, BudgetOverview},
    category::Category,
    id::ResourceId,
    month::Month,
};

/// Everything the client caches about the user's budgets.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetState {
    /// The month being viewed.
    pub current_month: Month,
    /// Cached budgets.
    pub budgets: Vec<Budget>,
    /// Cached categories.
    pub categories: Vec<Category>,
    /// The last overview fetched, kept when a later fetch fails.
    pub overview: Option<BudgetOverview>,
    /// Whether the latest overview fetch is in flight.
    pub is_loading: bool,
    /// The message of the last failure, if not cleared since.
    pub error: Option<String>,
    /// The generation of the latest overview fetch. Responses of older
    /// fetches are discarded.
    pub fetch_generation: u64,
}

impl BudgetState {
    /// An empty state viewing `current_month`.
    pub fn new(current_month: Month) -> Self {
        Self {
            current_month,
            budgets: Vec::new(),
            categories: Vec::new(),
            overview: None,
            is_loading: false,
            error: None,
            fetch_generation: 0,
        }
    }
}

/// Something that happened to the client state.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// The user switched to another month.
    MonthSelected(Month),
    /// A new overview fetch was started, its generation is the new
    /// [BudgetState::fetch_generation].
    FetchStarted,
    /// An overview fetch finished.
    FetchSucceeded {
        /// The generation of the fetch.
        generation: u64,
        /// The fetched overview.
        overview: BudgetOverview,
    },
    /// An overview fetch failed.
    FetchFailed {
        /// The generation of the fetch.
        generation: u64,
        /// The user-facing error message.
        message: String,
    },
    /// An overview fetch was abandoned before it finished.
    FetchCancelled {
        /// The generation of the fetch.
        generation: u64,
    },
    /// The budget list was loaded.
    BudgetsLoaded(Vec<Budget>),
    /// The category list was loaded.
    CategoriesLoaded(Vec<Category>),
    /// A budget was created or updated.
    BudgetSaved(Budget),
    /// A budget was deleted.
    BudgetRemoved(ResourceId),
    /// A category was created or updated.
    CategorySaved(Category),
    /// A category was deleted, along with its budgets.
    CategoryRemoved(ResourceId),
    /// A request other than an overview fetch failed.
    RequestFailed(String),
    /// The user dismissed the error.
    ErrorCleared,
}

/// Apply `action` to `state` and return the next state.
pub fn reduce(mut state: BudgetState, action: Action) -> BudgetState {
    match action {
        Action::MonthSelected(month) => state.current_month = month,
        Action::FetchStarted => {
            state.fetch_generation += 1;
            state.is_loading = true;
            state.error = None;
        }
        Action::FetchSucceeded {
            generation,
            overview,
        } => {
            if is_stale(&state, generation) {
                return state;
            }
            state.overview = Some(overview);
            state.is_loading = false;
        }
        Action::FetchFailed {
            generation,
            message,
        } => {
            if is_stale(&state, generation) {
                return state;
            }
            state.error = Some(message);
            state.is_loading = false;
        }
        Action::FetchCancelled { generation } => {
            if !is_stale(&state, generation) {
                state.is_loading = false;
            }
        }
        Action::BudgetsLoaded(budgets) => state.budgets = budgets,
        Action::CategoriesLoaded(categories) => state.categories = categories,
        Action::BudgetSaved(budget) => upsert(&mut state.budgets, budget, |b| &b.id),
        Action::BudgetRemoved(id) => state.budgets.retain(|budget| budget.id != id),
        Action::CategorySaved(category) => {
            for budget in &mut state.budgets {
                if budget.category.id == category.id {
                    budget.category = category.clone();
                }
            }
            upsert(&mut state.categories, category, |c| &c.id);
        }
        Action::CategoryRemoved(id) => {
            state.categories.retain(|category| category.id != id);
            state.budgets.retain(|budget| budget.category.id != id);
        }
        Action::RequestFailed(message) => state.error = Some(message),
        Action::ErrorCleared => state.error = None,
    }

    state
}

fn is_stale(state: &BudgetState, generation: u64) -> bool {
    let stale = generation != state.fetch_generation;

    if stale {
        tracing::debug!(
            "discarding overview response of fetch {generation}, latest fetch is {}",
            state.fetch_generation
        );
    }

    stale
}

fn upsert<T>(items: &mut Vec<T>, item: T, id: impl Fn(&T) -> &ResourceId) {
    match items.iter().position(|existing| id(existing) == id(&item)) {
        Some(index) => items[index] = item,
        None => items.push(item),
    }
}
