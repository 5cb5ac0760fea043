//! User resolution for agent requests.
//!
//! The agent server calls a [`UserResolver`] before serving any agent
//! endpoint. The resolver decides who the request acts as, and which
//! capability groups that identity carries.

use std::collections::HashMap;

use async_trait::async_trait;
use axum::http::{HeaderMap, request::Parts};
use thiserror::Error;

use sqlagent_core::User;

use crate::middleware::session::request_cookies;

/// Errors returned by a [`UserResolver`].
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The request carries no usable identity.
    #[error("authentication required")]
    AuthRequired,
}

/// What a resolver may inspect about an inbound request.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    cookies: HashMap<String, String>,
    headers: HeaderMap,
}

impl RequestContext {
    /// Capture cookies and headers from a request.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut cookies = HashMap::new();
        for cookie in request_cookies(headers) {
            // First occurrence wins, matching `read_session_email`.
            cookies
                .entry(cookie.name().to_owned())
                .or_insert_with(|| cookie.value().to_owned());
        }
        Self {
            cookies,
            headers: headers.clone(),
        }
    }

    /// Capture cookies and headers from request parts.
    #[must_use]
    pub fn from_parts(parts: &Parts) -> Self {
        Self::from_headers(&parts.headers)
    }

    /// Value of the named cookie, if sent.
    #[must_use]
    pub fn get_cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// All request headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

/// Maps a request to the user it acts as.
#[async_trait]
pub trait UserResolver: Send + Sync {
    /// Resolve the user for a request.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::AuthRequired` if the request cannot be attributed
    /// to anyone.
    async fn resolve_user(&self, context: &RequestContext) -> Result<User, ResolveError>;
}

/// Resolver that trusts the session cookie.
///
/// Any non-empty cookie value is accepted and the resulting user belongs to
/// the `admin` group only. The cookie is not checked against the credential
/// store, so a disabled account keeps access until the cookie is cleared.
#[derive(Debug, Clone)]
pub struct CookieUserResolver {
    cookie_name: String,
}

impl CookieUserResolver {
    /// Create a resolver reading the named cookie.
    #[must_use]
    pub fn new(cookie_name: impl Into<String>) -> Self {
        Self {
            cookie_name: cookie_name.into(),
        }
    }
}

#[async_trait]
impl UserResolver for CookieUserResolver {
    async fn resolve_user(&self, context: &RequestContext) -> Result<User, ResolveError> {
        match context.get_cookie(&self.cookie_name) {
            Some(email) if !email.is_empty() => Ok(User::admin(email)),
            _ => Err(ResolveError::AuthRequired),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;
    use axum::http::header::COOKIE;

    use sqlagent_core::ADMIN_GROUP;

    use super::*;

    fn context(cookie: &str) -> RequestContext {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(cookie).unwrap());
        RequestContext::from_headers(&headers)
    }

    #[test]
    fn test_context_cookie_lookup() {
        let ctx = context("a=1; b=2; a=3");
        assert_eq!(ctx.get_cookie("a"), Some("1"));
        assert_eq!(ctx.get_cookie("b"), Some("2"));
        assert_eq!(ctx.get_cookie("c"), None);
        assert!(ctx.headers().contains_key(COOKIE));
    }

    #[tokio::test]
    async fn test_cookie_resolver_admits_any_value() {
        let resolver = CookieUserResolver::new("sqlagent_email");
        let user = resolver
            .resolve_user(&context("sqlagent_email=a@x.com"))
            .await
            .unwrap();
        assert_eq!(user.id, "a@x.com");
        assert_eq!(user.email, "a@x.com");
        assert_eq!(user.group_memberships, vec![ADMIN_GROUP.to_string()]);

        let user = resolver
            .resolve_user(&context("sqlagent_email=whoever"))
            .await
            .unwrap();
        assert_eq!(user.email, "whoever");
    }

    #[tokio::test]
    async fn test_cookie_resolver_rejects_missing_or_empty() {
        let resolver = CookieUserResolver::new("sqlagent_email");

        let err = resolver
            .resolve_user(&RequestContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::AuthRequired));

        let err = resolver
            .resolve_user(&context("sqlagent_email="))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::AuthRequired));

        let err = resolver
            .resolve_user(&context("other_cookie=a@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::AuthRequired));
    }
}
