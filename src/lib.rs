//! Budgetwatch tracks monthly category budgets against a personal finance
//! REST backend.
//!
//! The library turns the backend's monthly summary into budget statuses,
//! classifies budget alerts, keeps a client-side store in sync with the
//! backend, and provides a small proxy server that forwards browser requests
//! to the backend origin.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod alert;
mod api;
mod budget;
mod category;
mod client;
mod config;
mod endpoints;
mod id;
mod logging;
mod money;
mod month;
mod notification;
mod overview;
mod proxy;
mod refresh;
mod routing;
mod state;
mod store;
mod tracking;
mod transaction;

#[cfg(test)]
mod test_utils;

pub use alert::{
    AlertCenter, AlertGroups, AlertKind, AlertPriority, BudgetAlert, DismissedAlerts,
    WARNING_THRESHOLD, classify_alerts, group_alerts,
};
pub use api::{BudgetApi, GENERIC_ERROR_MESSAGE, extract_error_message};
pub use budget::{Budget, BudgetForm, BudgetOverview, BudgetStatus};
pub use category::{Category, CategoryForm};
pub use client::{
    ChangePasswordForm, HttpClient, LoginForm, LoginResponse, ProfileForm, RegisterForm, Session,
    UserProfile,
};
pub use config::{ClientConfig, ProxyConfig};
pub use id::ResourceId;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use money::format_currency;
pub use month::Month;
pub use notification::{Notification, NotificationGate, NotificationKind};
pub use overview::adapt_monthly_summary;
pub use proxy::{ProxyState, proxy_request};
pub use refresh::{AlertRefresher, DEFAULT_REFRESH_PERIOD, RefreshHandle};
pub use routing::build_router;
pub use state::{Action, BudgetState, reduce};
pub use store::{BudgetStore, FollowUp, Mutation, MutationHook, NotifyOnSuccess, RefetchOverview};
pub use tracking::{
    AlertLevel, BudgetDetail, BudgetStatusReport, LimitAlert, LimitAlertList, LimitAlertType,
    MonthlySummary, ProposedTransaction, SpendingStatus, SummaryTotals, TransactionImpact,
    budget_alerts, budget_status, calculate_budget_status, monthly_summary, transaction_impact,
};
pub use transaction::{Transaction, TransactionFilter, TransactionPage, TransactionType};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {error}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                tracing::error!("failed to install signal handler: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum Error {
    /// The backend rejected the bearer token.
    ///
    /// The session is cleared when this error is produced, the user has to
    /// log in again.
    #[error("your session has expired, please log in again")]
    Unauthorized,

    /// The backend answered with a non-success status code.
    ///
    /// `message` is the user-facing text extracted from the response body
    /// with [extract_error_message].
    #[error("{message}")]
    Api {
        /// The HTTP status code of the response.
        status: u16,
        /// The user-facing error message.
        message: String,
    },

    /// The request could not be sent or the response could not be read.
    #[error("could not reach the server: {0}")]
    Network(String),

    /// The backend answered with a body that does not have the expected shape.
    #[error("unexpected response from the server: {0}")]
    InvalidResponse(String),

    /// A month string was not in the `YYYY-MM` or `YYYY-MM-DD` format.
    #[error("\"{0}\" is not a valid month, expected YYYY-MM")]
    InvalidMonth(String),

    /// A date string was not in the `YYYY-MM-DD` format.
    #[error("\"{0}\" is not a valid date, expected YYYY-MM-DD")]
    InvalidDate(String),

    /// A budget amount was zero or negative.
    #[error("budget amount must be greater than zero")]
    InvalidAmount,

    /// An empty string was used to create a category name.
    #[error("Category name cannot be empty")]
    EmptyCategoryName,

    /// The configured backend URL could not be used.
    #[error("invalid backend URL \"{0}\"")]
    InvalidBackendUrl(String),

    /// The proxy could not forward a request to the backend.
    #[error("could not forward the request to the backend: {0}")]
    BadGateway(String),
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            Error::InvalidResponse(value.to_string())
        } else {
            Error::Network(value.to_string())
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::BadGateway(_) | Error::Network(_) => StatusCode::BAD_GATEWAY,
            Error::Unauthorized => StatusCode::UNAUTHORIZED,
            Error::Api { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Error::InvalidMonth(_)
            | Error::InvalidDate(_)
            | Error::InvalidAmount
            | Error::EmptyCategoryName => StatusCode::BAD_REQUEST,
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
