use axum::extract::rejection::{FormRejection, JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::store::error::StoreError;

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Login required")]
    AuthRequired,
    #[error("Admin access required")]
    Forbidden,
    #[error("Already upvoted")]
    DuplicateUpvote,
    #[error("Invalid credentials or unconfirmed email")]
    BadCredentials,
    #[error("Too many attempts, try again later")]
    RateLimited,
    #[error("requested object doesn't exist")]
    NotFound,
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("data store unavailable: {0}")]
    DataStoreUnavailable(StoreError),
}

impl From<StoreError> for RequestError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::InvalidCredentials => Self::BadCredentials,
            e => Self::DataStoreUnavailable(e),
        }
    }
}

#[derive(Clone, Debug, Error)]
pub enum ValidationError {
    #[error("input value is invalid: `{value}`, reason: {reason}")]
    InvalidInput { value: String, reason: String },
    #[error("{field} is required")]
    MissingField { field: &'static str },
    #[error("{reason}")]
    Refused { reason: String },
    #[error("malformed request: {reason}")]
    Malformed { reason: String },
}

impl From<PathRejection> for ValidationError {
    fn from(e: PathRejection) -> Self {
        Self::Malformed {
            reason: e.body_text(),
        }
    }
}

impl From<FormRejection> for ValidationError {
    fn from(e: FormRejection) -> Self {
        Self::Malformed {
            reason: e.body_text(),
        }
    }
}

impl From<JsonRejection> for ValidationError {
    fn from(e: JsonRejection) -> Self {
        Self::Malformed {
            reason: e.body_text(),
        }
    }
}

impl RequestError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::AuthRequired | Self::BadCredentials => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::DuplicateUpvote => StatusCode::CONFLICT,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::DataStoreUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the caller, internal failures are not spelled out.
    pub fn public_message(&self) -> String {
        match self {
            Self::DataStoreUnavailable(_) => "Something went wrong".to_string(),
            e => e.to_string(),
        }
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        if let Self::DataStoreUnavailable(e) = &self {
            error!("received internal error for user request: {e}");
        }
        let error = json!({ "error": self.public_message() }).to_string();
        (
            self.status(),
            [("content-type", "application/json")],
            error,
        )
            .into_response()
    }
}

/// Failure of a browser-facing route: guards redirect instead of answering 401/403.
#[derive(Debug)]
pub struct PageError(pub RequestError);

impl From<RequestError> for PageError {
    fn from(e: RequestError) -> Self {
        Self(e)
    }
}

impl From<StoreError> for PageError {
    fn from(e: StoreError) -> Self {
        Self(e.into())
    }
}

impl From<ValidationError> for PageError {
    fn from(e: ValidationError) -> Self {
        Self(e.into())
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        match self.0 {
            RequestError::AuthRequired => Redirect::to("/login").into_response(),
            RequestError::Forbidden => Redirect::to("/").into_response(),
            e => e.into_response(),
        }
    }
}

#[derive(Clone, Debug, Error)]
pub enum SessionError {
    #[error("missing or malformed session token")]
    BadToken,
    #[error("session cannot be found")]
    TokenNotFound,
    #[error("session has expired")]
    TokenExpired,
}

impl From<SessionError> for RequestError {
    fn from(_: SessionError) -> Self {
        Self::AuthRequired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_credentials_from_store_become_bad_credentials() {
        let e: RequestError = StoreError::InvalidCredentials.into();
        assert!(matches!(e, RequestError::BadCredentials));
        assert_eq!(e.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn store_failures_are_reported_generically() {
        let e: RequestError = StoreError::Unavailable("connection refused".into()).into();
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(e.public_message(), "Something went wrong");
    }

    #[test]
    fn page_errors_redirect_on_guards() {
        let response = PageError(RequestError::AuthRequired).into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/login");

        let response = PageError(RequestError::Forbidden).into_response();
        assert_eq!(response.headers()["location"], "/");

        let response = PageError(RequestError::DuplicateUpvote).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
