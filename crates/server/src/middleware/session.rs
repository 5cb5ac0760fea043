//! Session cookie issuing and reading.
//!
//! The session is a plain, unsigned cookie whose value is the authenticated
//! email. There is no server-side store: presence of a non-empty value is
//! what admits a request.

use axum::http::HeaderMap;
use axum::http::header::COOKIE;
use cookie::Cookie;

use crate::config::CookieConfig;

/// Build the cookie set on successful login.
#[must_use]
pub fn login_cookie(config: &CookieConfig, email: &str) -> Cookie<'static> {
    Cookie::build((config.name.clone(), email.to_owned()))
        .http_only(true)
        .path("/")
        .same_site(config.same_site)
        .secure(config.secure)
        .build()
}

/// Build the cookie that clears the session on logout.
///
/// Same name, path and flags as the login cookie, with an empty value,
/// `Max-Age=0` and an expiry in the past.
#[must_use]
pub fn removal_cookie(config: &CookieConfig) -> Cookie<'static> {
    let mut cookie = Cookie::build((config.name.clone(), ""))
        .http_only(true)
        .path("/")
        .same_site(config.same_site)
        .secure(config.secure)
        .build();
    cookie.make_removal();
    cookie
}

/// Iterate every cookie carried by the request's `Cookie` headers.
///
/// Unparseable pairs and non-UTF-8 headers are skipped.
pub fn request_cookies(headers: &HeaderMap) -> impl Iterator<Item = Cookie<'static>> + '_ {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| Cookie::split_parse(raw.to_owned()))
        .filter_map(Result::ok)
}

/// Read the session email from the request headers.
///
/// Returns `None` when the cookie is absent or its value is empty.
#[must_use]
pub fn read_session_email(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    request_cookies(headers)
        .find(|cookie| cookie.name() == cookie_name)
        .map(|cookie| cookie.value().to_owned())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;
    use cookie::SameSite;

    use super::*;

    fn headers(values: &[&str]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for value in values {
            headers.append(COOKIE, HeaderValue::from_str(value).unwrap());
        }
        headers
    }

    #[test]
    fn test_login_cookie_attributes() {
        let rendered = login_cookie(&CookieConfig::default(), "a@x.com").to_string();
        assert!(rendered.starts_with("sqlagent_email=a@x.com"));
        assert!(rendered.contains("HttpOnly"));
        assert!(rendered.contains("Path=/"));
        assert!(rendered.contains("SameSite=Lax"));
        assert!(!rendered.contains("Secure"));
    }

    #[test]
    fn test_login_cookie_respects_policy() {
        let config = CookieConfig {
            name: "sid".to_string(),
            secure: true,
            same_site: SameSite::None,
        };
        let rendered = login_cookie(&config, "a@x.com").to_string();
        assert!(rendered.starts_with("sid=a@x.com"));
        assert!(rendered.contains("SameSite=None"));
        assert!(rendered.contains("Secure"));
    }

    #[test]
    fn test_removal_cookie_expires_immediately() {
        let rendered = removal_cookie(&CookieConfig::default()).to_string();
        assert!(rendered.starts_with("sqlagent_email=;"));
        assert!(rendered.contains("Max-Age=0"));
        assert!(rendered.contains("Expires="));
        assert!(rendered.contains("Path=/"));
    }

    #[test]
    fn test_read_session_email() {
        let h = headers(&["theme=dark; sqlagent_email=a@x.com"]);
        assert_eq!(
            read_session_email(&h, "sqlagent_email").as_deref(),
            Some("a@x.com")
        );
    }

    #[test]
    fn test_read_session_email_across_multiple_headers() {
        let h = headers(&["theme=dark", "sqlagent_email=b@x.com"]);
        assert_eq!(
            read_session_email(&h, "sqlagent_email").as_deref(),
            Some("b@x.com")
        );
    }

    #[test]
    fn test_read_session_email_absent_or_empty() {
        assert_eq!(read_session_email(&HeaderMap::new(), "sqlagent_email"), None);
        assert_eq!(
            read_session_email(&headers(&["other=1"]), "sqlagent_email"),
            None
        );
        assert_eq!(
            read_session_email(&headers(&["sqlagent_email="]), "sqlagent_email"),
            None
        );
    }

    #[test]
    fn test_any_value_is_accepted_verbatim() {
        // No validation: the value need not even look like an email.
        let h = headers(&["sqlagent_email=anything"]);
        assert_eq!(
            read_session_email(&h, "sqlagent_email").as_deref(),
            Some("anything")
        );
    }
}
