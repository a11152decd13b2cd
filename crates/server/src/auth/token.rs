use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::async_trait;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::{Authorization, HeaderMapExt};
use tracing::debug;

use crate::error::RequestError;
use crate::models::session::Identity;
use crate::server::state::AppState;

pub const SESSION_COOKIE: &str = "pitwatch_session";

/// Caller identity if the request carries a live session, from the session
/// cookie or an `Authorization: Bearer` header.
#[derive(Clone, Debug)]
pub struct MaybeIdentity(pub Option<Identity>);

impl MaybeIdentity {
    pub fn require_login(self) -> Result<Identity, RequestError> {
        self.0.ok_or(RequestError::AuthRequired)
    }

    pub fn require_admin(self) -> Result<Identity, RequestError> {
        let identity = self.require_login()?;
        if !identity.is_admin() {
            return Err(RequestError::Forbidden);
        }
        Ok(identity)
    }

    pub fn username(&self) -> Option<&str> {
        self.0.as_ref().map(|identity| identity.username.as_str())
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for MaybeIdentity {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = session_token(&parts.headers) else {
            return Ok(Self(None));
        };
        match state.sessions.resolve(&token) {
            Ok(identity) => Ok(Self(Some(identity))),
            Err(e) => {
                debug!("ignoring session token: {e}");
                Ok(Self(None))
            }
        }
    }
}

/// Strict variant for JSON routes: no session answers 401.
#[async_trait]
impl FromRequestParts<Arc<AppState>> for Identity {
    type Rejection = RequestError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers).ok_or(RequestError::AuthRequired)?;
        Ok(state.sessions.resolve(&token)?)
    }
}

/// Session token from the cookie, else from `Authorization: Bearer`.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        return Some(cookie.value().to_string());
    }
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|Authorization(bearer)| bearer.token().to_string())
}

pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

pub fn expired_session_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}

#[cfg(test)]
mod tests {
    use axum::http::header::{AUTHORIZATION, COOKIE};
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn cookie_wins_over_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(session_token(&headers).as_deref(), Some("from-header"));

        headers.insert(COOKIE, HeaderValue::from_static("pitwatch_session=from-cookie"));
        assert_eq!(session_token(&headers).as_deref(), Some("from-cookie"));
    }

    #[test]
    fn no_token_without_either_header() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("other=value"));
        assert_eq!(session_token(&headers), None);
    }
}
