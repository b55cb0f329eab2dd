//! Session lookup for the HTTP API
//!
//! Callers present an opaque token, either as `Authorization: Bearer <token>`
//! or as the `ap_session` cookie. Tokens map to user ids through a static table.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, State},
    http::{header, request::Parts, HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use ap_core::{Error, Result};

use crate::error::ApiError;

pub const SESSION_COOKIE: &str = "ap_session";

/// Shared state for authentication
#[derive(Clone, Debug, Default)]
pub struct AuthState {
    /// token -> user id
    tokens: Arc<HashMap<String, String>>,
}

impl AuthState {
    pub fn new(tokens: HashMap<String, String>) -> Self {
        Self {
            tokens: Arc::new(tokens),
        }
    }

    /// Parses a `token=user,token=user` list; blank entries are skipped
    pub fn parse(list: &str) -> Result<Self> {
        let mut tokens = HashMap::new();
        for entry in list.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (token, user) = entry
                .split_once('=')
                .map(|(t, u)| (t.trim(), u.trim()))
                .filter(|(t, u)| !t.is_empty() && !u.is_empty())
                .ok_or_else(|| {
                    Error::Config(format!("Invalid auth token entry '{}', expected token=user", entry))
                })?;
            tokens.insert(token.to_string(), user.to_string());
        }
        Ok(Self::new(tokens))
    }

    pub fn user_for(&self, token: &str) -> Option<&str> {
        self.tokens.get(token).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Token from the Authorization header, falling back to the session cookie
fn session_token(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if bearer.is_some() {
        return bearer;
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|t| !t.is_empty())
}

/// The signed-in user, if any. Set on every request by [`identify`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CurrentUser(pub Option<String>);

impl CurrentUser {
    pub fn id(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> std::result::Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<CurrentUser>().cloned().unwrap_or_default())
    }
}

/// A signed-in user; rejects anonymous requests with 401
#[derive(Clone, Debug)]
pub struct AuthUser(pub String);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> std::result::Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .and_then(|user| user.0.clone())
            .map(AuthUser)
            .ok_or_else(ApiError::unauthorized)
    }
}

/// Resolves the session token and attaches a [`CurrentUser`] to the request
pub async fn identify(State(auth): State<AuthState>, mut request: Request<Body>, next: Next) -> Response {
    let user = session_token(request.headers())
        .and_then(|token| auth.user_for(token))
        .map(str::to_string);
    request.extensions_mut().insert(CurrentUser(user));
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_parse_token_table() {
        let auth = AuthState::parse(" abc=alice, def = bob ,,").unwrap();
        assert_eq!(auth.len(), 2);
        assert_eq!(auth.user_for("abc"), Some("alice"));
        assert_eq!(auth.user_for("def"), Some("bob"));
        assert_eq!(auth.user_for("nope"), None);

        assert!(AuthState::parse("").unwrap().is_empty());
        assert!(matches!(AuthState::parse("missing-user"), Err(Error::Config(_))));
        assert!(matches!(AuthState::parse("token="), Err(Error::Config(_))));
    }

    #[test]
    fn test_session_token_sources() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_token(&headers), None);

        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; ap_session=cookie-token"));
        assert_eq!(session_token(&headers), Some("cookie-token"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer header-token"));
        assert_eq!(session_token(&headers), Some("header-token"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(session_token(&headers), Some("cookie-token"));
    }
}
