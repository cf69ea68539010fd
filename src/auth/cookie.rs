//! Defines the session cookie contract and helpers for reading and writing it.

use axum_extra::extract::cookie::{Cookie, SameSite};
use rand::Rng;
use time::{Duration, OffsetDateTime};

/// The fixed, well-known name of the session cookie.
pub(crate) const SESSION_COOKIE: &str = "session_token";

/// The fixed validity window of a session: 30 days, expressed to the client
/// as `Max-Age=2592000`. Sessions are not extended by reads.
pub(crate) const SESSION_DURATION: Duration = Duration::days(30);

/// Extract the session token from a raw `Cookie` header value.
///
/// Returns `None` if the header has no cookie under [SESSION_COOKIE].
/// Malformed pairs elsewhere in the header are skipped rather than treated
/// as an error, since the rest of the header may still be usable.
pub(crate) fn extract_session_token(cookie_header: &str) -> Option<String> {
    Cookie::split_parse(cookie_header.to_owned())
        .filter_map(|maybe_cookie| maybe_cookie.ok())
        .find(|cookie| cookie.name() == SESSION_COOKIE)
        .map(|cookie| cookie.value_trimmed().to_owned())
}

/// Build the Set-Cookie value that attaches a session token to the client.
pub(crate) fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .max_age(SESSION_DURATION)
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .build()
}

/// Build the Set-Cookie value that deletes the session cookie on the client.
pub(crate) fn clear_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .max_age(Duration::ZERO)
        .expires(OffsetDateTime::UNIX_EPOCH)
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .build()
}

/// Generate an opaque session token (64 character hex string).
pub(crate) fn generate_session_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();

    bytes.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

#[cfg(test)]
mod cookie_tests {
    use axum_extra::extract::cookie::SameSite;
    use time::Duration;

    use super::{
        SESSION_COOKIE, clear_session_cookie, extract_session_token, generate_session_token,
        session_cookie,
    };

    #[test]
    fn extracts_token_from_multi_cookie_header() {
        let header = format!("theme=dark; {SESSION_COOKIE}=abc123; locale=es-CO");

        assert_eq!(extract_session_token(&header), Some("abc123".to_owned()));
    }

    #[test]
    fn returns_none_when_cookie_absent() {
        assert_eq!(extract_session_token("theme=dark; locale=es-CO"), None);
        assert_eq!(extract_session_token(""), None);
    }

    #[test]
    fn skips_malformed_pairs() {
        let header = format!("garbage-without-equals; {SESSION_COOKIE}=abc123");

        assert_eq!(extract_session_token(&header), Some("abc123".to_owned()));
    }

    #[test]
    fn session_cookie_carries_required_attributes() {
        let cookie = session_cookie("abc123".to_owned());

        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.value(), "abc123");
        assert_eq!(cookie.max_age(), Some(Duration::days(30)));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        let cookie = clear_session_cookie();

        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(Duration::ZERO));
    }

    #[test]
    fn generated_tokens_are_unique_hex() {
        let first = generate_session_token();
        let second = generate_session_token();

        assert_eq!(first.len(), 64);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(first, second);
    }
}
