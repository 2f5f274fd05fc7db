#![allow(missing_docs)]

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicI64, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use axum::Router;
use rust_decimal::Decimal;
use serde_json::Value;
use tokio::{net::TcpListener, sync::Notify};

use crate::{
    Error,
    api::BudgetApi,
    budget::{Budget, BudgetForm},
    category::{Category, CategoryForm, DEFAULT_CATEGORY_COLOR},
    id::ResourceId,
    month::{Month, parse_date},
    tracking::monthly_summary,
    transaction::{Transaction, TransactionFilter, TransactionPage, TransactionType},
};

/// A January 2024 budget whose category shares the budget's id.
pub(crate) fn test_budget(id: i64, name: &str, amount: Decimal) -> Budget {
    Budget {
        id: ResourceId::from(id),
        category: Category {
            id: ResourceId::from(id),
            name: name.to_owned(),
            color: "#ff0000".to_owned(),
            description: None,
        },
        amount,
        month: Month::new(2024, 1).expect("valid month"),
        created_at: None,
        updated_at: None,
    }
}

/// An expense filed under `budget`'s category.
pub(crate) fn test_transaction(id: i64, budget: &Budget, amount: Decimal, date: &str) -> Transaction {
    Transaction {
        id: ResourceId::from(id),
        amount,
        description: format!("transaction {id}"),
        category: Some(budget.category.id.clone()),
        transaction_type: TransactionType::Expense,
        date: parse_date(date).expect("valid date"),
    }
}

/// Serve `app` on an unused local port and return its origin.
pub(crate) async fn spawn_backend(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Could not bind test backend");
    let addr = listener.local_addr().expect("Could not get local address");

    tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("Test backend stopped unexpectedly");
    });

    format!("http://{addr}")
}

/// An origin nothing is listening on.
pub(crate) async fn unused_local_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Could not bind");
    let addr = listener.local_addr().expect("Could not get local address");
    drop(listener);

    format!("http://{addr}")
}

#[derive(Default)]
struct FakeData {
    budgets: Vec<Budget>,
    categories: Vec<Category>,
    transactions: Vec<Transaction>,
}

/// An in-memory backend that computes monthly summaries the way the real
/// backend does.
#[derive(Default)]
pub(crate) struct FakeBudgetApi {
    data: Mutex<FakeData>,
    next_id: AtomicI64,
    failure: Mutex<Option<Error>>,
    summary_failure: Mutex<Option<Error>>,
    paused_months: Mutex<HashMap<String, Arc<Notify>>>,
    summary_calls: AtomicUsize,
}

impl FakeBudgetApi {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicI64::new(100),
            ..Default::default()
        }
    }

    pub(crate) fn with_budgets(budgets: Vec<Budget>, transactions: Vec<Transaction>) -> Self {
        let api = Self::new();
        {
            let mut data = api.lock_data();
            data.categories = budgets.iter().map(|b| b.category.clone()).collect();
            data.budgets = budgets;
            data.transactions = transactions;
        }
        api
    }

    /// Make every following request fail with `error`, or succeed again with
    /// `None`.
    pub(crate) fn fail_with(&self, error: Option<Error>) {
        *self.failure.lock().unwrap_or_else(PoisonError::into_inner) = error;
    }

    /// Make only summary requests fail with `error`.
    pub(crate) fn fail_summary_with(&self, error: Option<Error>) {
        *self
            .summary_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = error;
    }

    /// Hold summary requests for `month` until the returned notify is
    /// signalled.
    pub(crate) fn pause_summary(&self, month: Month) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.paused_months
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(month.query_value(), notify.clone());
        notify
    }

    pub(crate) fn summary_calls(&self) -> usize {
        self.summary_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn add_transaction(&self, transaction: Transaction) {
        self.lock_data().transactions.push(transaction);
    }

    pub(crate) fn budget_count(&self) -> usize {
        self.lock_data().budgets.len()
    }

    fn lock_data(&self) -> MutexGuard<'_, FakeData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_failure(&self) -> Result<(), Error> {
        match self
            .failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn next_id(&self) -> ResourceId {
        ResourceId::from(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn find_category(&self, id: &ResourceId) -> Result<Category, Error> {
        self.lock_data()
            .categories
            .iter()
            .find(|category| &category.id == id)
            .cloned()
            .ok_or_else(not_found)
    }
}

fn not_found() -> Error {
    Error::Api {
        status: 404,
        message: "Not found.".to_owned(),
    }
}

fn category_from_form(id: ResourceId, form: &CategoryForm) -> Category {
    let value = serde_json::to_value(form).expect("Could not serialize category form");

    Category {
        id,
        name: form.name().to_owned(),
        color: value["color"]
            .as_str()
            .unwrap_or(DEFAULT_CATEGORY_COLOR)
            .to_owned(),
        description: value["description"].as_str().map(str::to_owned),
    }
}

#[async_trait]
impl BudgetApi for FakeBudgetApi {
    async fn monthly_summary(&self, month: Month) -> Result<Value, Error> {
        self.summary_calls.fetch_add(1, Ordering::SeqCst);

        let paused = self
            .paused_months
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&month.query_value())
            .cloned();
        if let Some(notify) = paused {
            notify.notified().await;
        }

        self.check_failure()?;
        if let Some(error) = self
            .summary_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            return Err(error);
        }

        let data = self.lock_data();
        let summary = monthly_summary(&data.budgets, &data.transactions, month);
        serde_json::to_value(summary).map_err(|e| Error::InvalidResponse(e.to_string()))
    }

    async fn list_budgets(&self, month: Option<Month>) -> Result<Vec<Budget>, Error> {
        self.check_failure()?;

        Ok(self
            .lock_data()
            .budgets
            .iter()
            .filter(|budget| month.is_none_or(|month| budget.month == month))
            .cloned()
            .collect())
    }

    async fn create_budget(&self, form: &BudgetForm) -> Result<Budget, Error> {
        self.check_failure()?;

        let budget = Budget {
            id: self.next_id(),
            category: self.find_category(&form.category_id)?,
            amount: form.amount,
            month: form.month,
            created_at: None,
            updated_at: None,
        };
        self.lock_data().budgets.push(budget.clone());

        Ok(budget)
    }

    async fn update_budget(&self, id: &ResourceId, form: &BudgetForm) -> Result<Budget, Error> {
        self.check_failure()?;

        let category = self.find_category(&form.category_id)?;
        let mut data = self.lock_data();
        let budget = data
            .budgets
            .iter_mut()
            .find(|budget| &budget.id == id)
            .ok_or_else(not_found)?;
        budget.category = category;
        budget.amount = form.amount;
        budget.month = form.month;

        Ok(budget.clone())
    }

    async fn delete_budget(&self, id: &ResourceId) -> Result<(), Error> {
        self.check_failure()?;

        let mut data = self.lock_data();
        let before = data.budgets.len();
        data.budgets.retain(|budget| &budget.id != id);

        if data.budgets.len() == before {
            return Err(not_found());
        }

        Ok(())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, Error> {
        self.check_failure()?;

        Ok(self.lock_data().categories.clone())
    }

    async fn create_category(&self, form: &CategoryForm) -> Result<Category, Error> {
        self.check_failure()?;

        let category = category_from_form(self.next_id(), form);
        self.lock_data().categories.push(category.clone());

        Ok(category)
    }

    async fn update_category(
        &self,
        id: &ResourceId,
        form: &CategoryForm,
    ) -> Result<Category, Error> {
        self.check_failure()?;

        let updated = category_from_form(id.clone(), form);
        let mut data = self.lock_data();
        let category = data
            .categories
            .iter_mut()
            .find(|category| &category.id == id)
            .ok_or_else(not_found)?;
        *category = updated.clone();

        for budget in data.budgets.iter_mut().filter(|b| &b.category.id == id) {
            budget.category = updated.clone();
        }

        Ok(updated)
    }

    async fn delete_category(&self, id: &ResourceId) -> Result<(), Error> {
        self.check_failure()?;

        let mut data = self.lock_data();
        data.categories.retain(|category| &category.id != id);
        data.budgets.retain(|budget| &budget.category.id != id);
        for transaction in data.transactions.iter_mut() {
            if transaction.category.as_ref() == Some(id) {
                transaction.category = None;
            }
        }

        Ok(())
    }

    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<TransactionPage, Error> {
        self.check_failure()?;

        let results: Vec<Transaction> = self
            .lock_data()
            .transactions
            .iter()
            .filter(|t| filter.transaction_type.is_none_or(|kind| t.transaction_type == kind))
            .cloned()
            .collect();

        Ok(TransactionPage {
            count: results.len() as u64,
            next: None,
            previous: None,
            results,
        })
    }
}
