//! Hosted backend over HTTP: PostgREST-style table endpoints under `/rest/v1`
//! and GoTrue-style auth endpoints under `/auth/v1`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_RANGE;
use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{instrument, warn};

use crate::store::connection::StoreConfig;
use crate::store::error::StoreError;
use crate::store::schema::Table;
use crate::store::{AuthProvider, AuthSession, AuthUser, DataStore, Filter, Query, Row};

const AUTH_TABLE: &str = "auth.users";
const UNIQUE_VIOLATION: &str = "23505";
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct RestStore {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    access_token: Option<String>,
    max_retries: u32,
    retry_backoff: Duration,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    user: AuthUser,
}

impl RestStore {
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        if config.url.is_empty() || config.api_key.is_empty() {
            return Err(StoreError::Unavailable(
                "store url and api key must be configured".to_string(),
            ));
        }
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            access_token: None,
            max_retries: config.max_retries(),
            retry_backoff: config.retry_backoff(),
        })
    }

    fn table_url(&self, table: Table) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.api_key);
        self.http
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(bearer)
    }

    /// Sends the request built by `build`, retrying transient failures with
    /// exponential backoff. Non-idempotent requests are only retried when they
    /// never reached the server.
    async fn execute<F>(&self, target: &str, idempotent: bool, build: F) -> Result<Response, StoreError>
    where
        F: Fn() -> RequestBuilder + Send + Sync,
    {
        let mut attempt = 0u32;
        loop {
            let (error, reached_server) = match build().send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => (rejection(target, response).await, true),
                Err(e) => {
                    let reached_server = !e.is_connect();
                    (StoreError::from(e), reached_server)
                }
            };
            let retryable = error.is_transient() && (idempotent || !reached_server);
            if !retryable || attempt >= self.max_retries {
                return Err(error);
            }
            let delay = backoff_delay(self.retry_backoff, attempt);
            warn!("call to {target} failed: {error}, retrying in {delay:?}");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

/// `base * 2^attempt`, capped at [`MAX_RETRY_DELAY`].
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.checked_mul(2u32.saturating_pow(attempt))
        .unwrap_or(MAX_RETRY_DELAY)
        .min(MAX_RETRY_DELAY)
}

async fn rejection(target: &str, response: Response) -> StoreError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    classify_rejection(target, status, &body)
}

pub fn classify_rejection(target: &str, status: u16, body: &str) -> StoreError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    if status == 409 || parsed.code.as_deref() == Some(UNIQUE_VIOLATION) {
        return StoreError::Conflict {
            table: target.to_string(),
        };
    }
    let message = parsed
        .message
        .or(parsed.msg)
        .or(parsed.error_description)
        .unwrap_or_else(|| body.to_string());
    StoreError::Rejected { status, message }
}

pub fn filter_params(filters: &[Filter]) -> Vec<(String, String)> {
    filters
        .iter()
        .map(|filter| (filter.column.to_string(), format!("eq.{}", filter.value)))
        .collect()
}

pub fn select_params(query: &Query) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];
    params.extend(filter_params(&query.filters));
    if let Some(order) = query.order {
        let direction = if order.descending { "desc" } else { "asc" };
        params.push(("order".to_string(), format!("{}.{}", order.column, direction)));
    }
    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    params
}

/// Total from a `Content-Range` header such as `0-24/3573` or `*/0`.
pub fn parse_content_range(header: &str) -> Option<u64> {
    header.rsplit_once('/')?.1.trim().parse().ok()
}

#[async_trait]
impl DataStore for RestStore {
    #[instrument(skip(self))]
    async fn select(&self, query: &Query) -> Result<Vec<Row>, StoreError> {
        let url = self.table_url(query.table);
        let params = select_params(query);
        let table = query.table.to_string();
        let response = self
            .execute(&table, true, || self.request(Method::GET, &url).query(&params))
            .await?;
        response
            .json::<Vec<Row>>()
            .await
            .map_err(|e| StoreError::decode(&table, e))
    }

    #[instrument(skip(self))]
    async fn count(&self, query: &Query) -> Result<u64, StoreError> {
        let url = self.table_url(query.table);
        let mut params = vec![("select".to_string(), "id".to_string())];
        params.extend(filter_params(&query.filters));
        let table = query.table.to_string();
        let response = self
            .execute(&table, true, || {
                self.request(Method::HEAD, &url)
                    .query(&params)
                    .header("Prefer", "count=exact")
            })
            .await?;
        response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_content_range)
            .ok_or_else(|| StoreError::decode(&table, "missing or malformed Content-Range"))
    }

    #[instrument(skip(self, row))]
    async fn insert(&self, table: Table, row: Row) -> Result<(), StoreError> {
        let url = self.table_url(table);
        let body = Value::Object(row);
        self.execute(table.as_ref(), false, || {
            self.request(Method::POST, &url)
                .header("Prefer", "return=minimal")
                .json(&body)
        })
        .await?;
        Ok(())
    }

    #[instrument(skip(self, patch))]
    async fn update(
        &self,
        table: Table,
        patch: Row,
        filters: &[Filter],
    ) -> Result<(), StoreError> {
        let url = self.table_url(table);
        let params = filter_params(filters);
        let body = Value::Object(patch);
        self.execute(table.as_ref(), true, || {
            self.request(Method::PATCH, &url)
                .query(&params)
                .header("Prefer", "return=minimal")
                .json(&body)
        })
        .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, table: Table, filters: &[Filter]) -> Result<(), StoreError> {
        let url = self.table_url(table);
        let params = filter_params(filters);
        self.execute(table.as_ref(), true, || {
            self.request(Method::DELETE, &url).query(&params)
        })
        .await?;
        Ok(())
    }

    fn with_access_token(&self, access_token: &str) -> Arc<dyn DataStore> {
        Arc::new(Self {
            access_token: Some(access_token.to_string()),
            ..self.clone()
        })
    }
}

#[async_trait]
impl AuthProvider for RestStore {
    #[instrument(skip(self, password))]
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, StoreError> {
        let url = self.auth_url("signup");
        let body = json!({ "email": email, "password": password });
        let response = self
            .execute(AUTH_TABLE, false, || {
                self.http
                    .post(&url)
                    .header("apikey", &self.api_key)
                    .json(&body)
            })
            .await?;
        let body: Value = response
            .json()
            .await
            .map_err(|e| StoreError::decode(AUTH_TABLE, e))?;
        // with email confirmation on, the user comes back bare instead of inside a session
        let user = match body.get("user") {
            Some(user) if user.is_object() => user.clone(),
            _ => body,
        };
        serde_json::from_value(user).map_err(|e| StoreError::decode(AUTH_TABLE, e))
    }

    #[instrument(skip(self, password))]
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, StoreError> {
        let url = self.auth_url("token");
        let body = json!({ "email": email, "password": password });
        let result = self
            .execute(AUTH_TABLE, true, || {
                self.http
                    .post(&url)
                    .query(&[("grant_type", "password")])
                    .header("apikey", &self.api_key)
                    .json(&body)
            })
            .await;
        let response = match result {
            Ok(response) => response,
            Err(StoreError::Rejected { status: 400, .. }) => {
                return Err(StoreError::InvalidCredentials)
            }
            Err(e) => return Err(e),
        };
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| StoreError::decode(AUTH_TABLE, e))?;
        Ok(AuthSession {
            user: token.user,
            access_token: token.access_token,
        })
    }
}
