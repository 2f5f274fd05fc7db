//! HTTP client for the finance backend.
//!
//! Every authenticated request carries the session's bearer token. A `401`
//! on an authenticated request logs the user out by clearing the [Session].

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    Error,
    api::{BudgetApi, extract_error_message},
    budget::{Budget, BudgetForm},
    category::{Category, CategoryForm},
    config::ClientConfig,
    endpoints::{self, format_endpoint},
    id::ResourceId,
    month::Month,
    tracking::{BudgetStatusReport, LimitAlertList, ProposedTransaction, TransactionImpact},
    transaction::{TransactionFilter, TransactionPage},
};

#[derive(Debug, Default)]
struct Tokens {
    access: Option<String>,
    refresh: Option<String>,
}

/// The logged in user's tokens, shared between clones.
#[derive(Debug, Clone, Default)]
pub struct Session {
    tokens: Arc<RwLock<Tokens>>,
}

impl Session {
    /// A session with no user logged in.
    pub fn new() -> Self {
        Self::default()
    }

    /// A session using an existing access token.
    pub fn with_token(access: impl Into<String>) -> Self {
        let session = Self::new();
        session.set_tokens(access.into(), None);
        session
    }

    /// The current access token.
    pub fn access_token(&self) -> Option<String> {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .access
            .clone()
    }

    fn refresh_token(&self) -> Option<String> {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .refresh
            .clone()
    }

    /// Whether a user is logged in.
    pub fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }

    fn set_tokens(&self, access: String, refresh: Option<String>) {
        let mut tokens = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
        tokens.access = Some(access);
        tokens.refresh = refresh;
    }

    /// Log out locally by forgetting the tokens.
    pub fn clear(&self) {
        let mut tokens = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
        *tokens = Tokens::default();
    }
}

/// The credentials for logging in.
#[derive(Debug, Clone, Serialize)]
pub struct LoginForm {
    /// The user's email address.
    pub email: String,
    /// The user's password.
    pub password: String,
}

/// The details needed to register a new user.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterForm {
    /// The new user's email address, also their username.
    pub email: String,
    /// The new password.
    pub password: String,
    /// The new password again.
    pub password_confirm: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
}

/// Profile fields the user may change.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileForm {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Email address.
    pub email: String,
}

/// The body for changing the user's password.
#[derive(Debug, Clone, Serialize)]
pub struct ChangePasswordForm {
    /// The current password.
    pub old_password: String,
    /// The new password.
    pub new_password: String,
    /// The new password again.
    pub new_password_confirm: String,
}

/// A user as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserProfile {
    /// The id of the user.
    pub id: ResourceId,
    /// Email address.
    pub email: String,
    /// Given name.
    #[serde(default)]
    pub first_name: String,
    /// Family name.
    #[serde(default)]
    pub last_name: String,
}

/// The response to logging in or registering.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    /// The logged in user.
    pub user: UserProfile,
    /// The bearer token for subsequent requests.
    pub access: String,
    /// The token used to log out.
    #[serde(default)]
    pub refresh: Option<String>,
    /// A confirmation message.
    #[serde(default)]
    pub message: Option<String>,
}

/// List endpoints may or may not be paginated.
#[derive(Deserialize)]
#[serde(untagged)]
enum Listing<T> {
    Page { results: Vec<T> },
    Plain(Vec<T>),
}

impl<T> Listing<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Listing::Page { results } => results,
            Listing::Plain(items) => items,
        }
    }
}

/// Client for the finance backend's REST API.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    session: Session,
}

impl HttpClient {
    /// Create a client for the backend at `config.base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &ClientConfig, session: Session) -> Result<Self, Error> {
        let client = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            session,
        })
    }

    /// The session whose token is sent with each request.
    pub fn session(&self) -> &Session {
        &self.session
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self.client.request(method, format!("{}{path}", self.base_url));

        match self.session.access_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn anonymous_request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, format!("{}{path}", self.base_url))
    }

    /// Send `request` and turn error statuses into [Error]s.
    ///
    /// With `authenticated`, a `401` clears the session and gives
    /// [Error::Unauthorized], otherwise it is reported like any other
    /// rejection.
    async fn send(&self, request: RequestBuilder, authenticated: bool) -> Result<Response, Error> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED && authenticated {
            tracing::warn!("the backend rejected the session token, logging out");
            self.session.clear();
            return Err(Error::Unauthorized);
        }

        if !status.is_success() {
            let body = response.json::<Value>().await.unwrap_or(Value::Null);
            let message = extract_error_message(&body);
            tracing::debug!("backend responded with {status}: {body}");
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, Error> {
        let response = self.send(request, true).await?;
        Ok(response.json().await?)
    }

    async fn send_empty(&self, request: RequestBuilder) -> Result<(), Error> {
        self.send(request, true).await.map(|_| ())
    }

    /// Log in and store the returned tokens in the session.
    pub async fn login(&self, form: &LoginForm) -> Result<LoginResponse, Error> {
        let request = self
            .anonymous_request(Method::POST, endpoints::LOG_IN)
            .json(form);
        self.start_session(request).await
    }

    /// Register a new user, who is logged in straight away.
    pub async fn register(&self, form: &RegisterForm) -> Result<LoginResponse, Error> {
        let request = self
            .anonymous_request(Method::POST, endpoints::REGISTER)
            .json(form);
        self.start_session(request).await
    }

    async fn start_session(&self, request: RequestBuilder) -> Result<LoginResponse, Error> {
        let response: LoginResponse = self.send(request, false).await?.json().await?;
        self.session
            .set_tokens(response.access.clone(), response.refresh.clone());
        tracing::info!("logged in as {}", response.user.email);

        Ok(response)
    }

    /// Log out on the backend and forget the tokens.
    ///
    /// The tokens are forgotten even if the backend request fails.
    pub async fn logout(&self) -> Result<(), Error> {
        let body = serde_json::json!({ "refresh": self.session.refresh_token() });
        let result = self
            .send_empty(self.request(Method::POST, endpoints::LOG_OUT).json(&body))
            .await;
        self.session.clear();

        result
    }

    /// Update the user's profile.
    pub async fn update_profile(&self, form: &ProfileForm) -> Result<UserProfile, Error> {
        self.send_json(self.request(Method::PUT, endpoints::PROFILE_UPDATE).json(form))
            .await
    }

    /// Change the user's password.
    pub async fn change_password(&self, form: &ChangePasswordForm) -> Result<(), Error> {
        self.send_empty(self.request(Method::POST, endpoints::CHANGE_PASSWORD).json(form))
            .await
    }

    /// Download all of the user's data as the raw file contents.
    pub async fn export_data(&self) -> Result<Vec<u8>, Error> {
        let response = self
            .send(self.request(Method::GET, endpoints::EXPORT_DATA), true)
            .await?;

        Ok(response.bytes().await?.to_vec())
    }

    /// The backend's status report of the budgets of `month`.
    pub async fn budget_status(&self, month: Month) -> Result<BudgetStatusReport, Error> {
        let request = self
            .request(Method::GET, endpoints::BUDGET_STATUS)
            .query(&[("month", month.to_string())]);

        self.send_json(request).await
    }

    /// The backend's alerts for the budgets of `month` near or over their
    /// limit.
    pub async fn budget_alerts(&self, month: Month) -> Result<LimitAlertList, Error> {
        let request = self
            .request(Method::GET, endpoints::BUDGET_ALERTS)
            .query(&[("month", month.to_string())]);

        self.send_json(request).await
    }

    /// Ask the backend what `proposed` would do to its budget.
    ///
    /// Returns `None` when the backend reports no impact.
    pub async fn check_transaction_impact(
        &self,
        proposed: &ProposedTransaction,
    ) -> Result<Option<TransactionImpact>, Error> {
        let payload: Value = self
            .send_json(
                self.request(Method::POST, endpoints::CHECK_TRANSACTION_IMPACT)
                    .json(proposed),
            )
            .await?;

        if payload.get("has_impact").and_then(Value::as_bool) != Some(true) {
            return Ok(None);
        }

        TransactionImpact::deserialize(&payload)
            .map(Some)
            .map_err(|error| Error::InvalidResponse(error.to_string()))
    }
}

#[async_trait]
impl BudgetApi for HttpClient {
    async fn monthly_summary(&self, month: Month) -> Result<Value, Error> {
        let request = self
            .request(Method::GET, endpoints::MONTHLY_SUMMARY)
            .query(&[("month", month.query_value())]);

        self.send_json(request).await
    }

    async fn list_budgets(&self, month: Option<Month>) -> Result<Vec<Budget>, Error> {
        let mut request = self.request(Method::GET, endpoints::BUDGETS);
        if let Some(month) = month {
            request = request.query(&[("month", month.to_string())]);
        }

        let listing: Listing<Budget> = self.send_json(request).await?;
        Ok(listing.into_vec())
    }

    async fn create_budget(&self, form: &BudgetForm) -> Result<Budget, Error> {
        self.send_json(self.request(Method::POST, endpoints::BUDGETS).json(form))
            .await
    }

    async fn update_budget(&self, id: &ResourceId, form: &BudgetForm) -> Result<Budget, Error> {
        let path = format_endpoint(endpoints::BUDGET, id);
        self.send_json(self.request(Method::PUT, &path).json(form))
            .await
    }

    async fn delete_budget(&self, id: &ResourceId) -> Result<(), Error> {
        let path = format_endpoint(endpoints::BUDGET, id);
        self.send_empty(self.request(Method::DELETE, &path)).await
    }

    async fn list_categories(&self) -> Result<Vec<Category>, Error> {
        let listing: Listing<Category> = self
            .send_json(self.request(Method::GET, endpoints::CATEGORIES))
            .await?;
        Ok(listing.into_vec())
    }

    async fn create_category(&self, form: &CategoryForm) -> Result<Category, Error> {
        self.send_json(self.request(Method::POST, endpoints::CATEGORIES).json(form))
            .await
    }

    async fn update_category(
        &self,
        id: &ResourceId,
        form: &CategoryForm,
    ) -> Result<Category, Error> {
        let path = format_endpoint(endpoints::CATEGORY, id);
        self.send_json(self.request(Method::PUT, &path).json(form))
            .await
    }

    async fn delete_category(&self, id: &ResourceId) -> Result<(), Error> {
        let path = format_endpoint(endpoints::CATEGORY, id);
        self.send_empty(self.request(Method::DELETE, &path)).await
    }

    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<TransactionPage, Error> {
        let query = filter.to_query_string()?;
        let path = if query.is_empty() {
            endpoints::TRANSACTIONS.to_owned()
        } else {
            format!("{}?{query}", endpoints::TRANSACTIONS)
        };

        self.send_json(self.request(Method::GET, &path)).await
    }
}
