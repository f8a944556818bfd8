//! Session token minting and request extraction.
//!
//! # Purpose
//! Sessions are opaque high-entropy tokens (32 bytes, URL-safe base64)
//! carried either in the `x-meshgate-session` header or in an HttpOnly
//! cookie. This module mints session records and pulls the token out of
//! inbound requests; lookup and expiry live in the store.
use crate::auth::random_token;
use crate::model::Session;
use axum::http::HeaderMap;
use chrono::{Duration, Utc};

pub const SESSION_HEADER: &str = "x-meshgate-session";
pub const SESSION_COOKIE: &str = "meshgate_session";

pub fn mint_session(identity_id: &str, ttl_seconds: i64) -> Session {
    let now = Utc::now();
    Session {
        id: random_token(32),
        identity_id: identity_id.to_string(),
        created_at: now,
        expires_at: now + Duration::seconds(ttl_seconds),
        last_used_at: now,
    }
}

/// Extract the session token from the header or, failing that, the cookie.
pub fn session_token_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get(SESSION_HEADER)
        && let Ok(token) = value.to_str()
        && !token.is_empty()
    {
        return Some(token.to_string());
    }
    cookie_value(headers, SESSION_COOKIE)
}

/// `Set-Cookie` value for a freshly minted session.
pub fn session_cookie(token: &str, ttl_seconds: i64) -> String {
    format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}"
    )
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(axum::http::header::COOKIE)?.to_str().ok()?;
    for pair in raw.split(';') {
        let (key, value) = pair.trim().split_once('=')?;
        if key == name {
            return Some(value.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_takes_precedence_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(SESSION_HEADER, "from-header".parse().unwrap());
        headers.insert(
            axum::http::header::COOKIE,
            format!("{SESSION_COOKIE}=from-cookie").parse().unwrap(),
        );
        assert_eq!(
            session_token_from_headers(&headers).as_deref(),
            Some("from-header")
        );
    }

    #[test]
    fn cookie_is_parsed_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            format!("theme=dark; {SESSION_COOKIE}=tok123; lang=en")
                .parse()
                .unwrap(),
        );
        assert_eq!(session_token_from_headers(&headers).as_deref(), Some("tok123"));
    }

    #[test]
    fn missing_token_yields_none() {
        assert!(session_token_from_headers(&HeaderMap::new()).is_none());
    }

    #[test]
    fn minted_sessions_have_entropy_and_deadline() {
        let a = mint_session("ident-1", 3600);
        let b = mint_session("ident-1", 3600);
        assert_ne!(a.id, b.id);
        // 32 bytes of entropy encode to 43 base64url chars.
        assert!(a.id.len() >= 43);
        assert!(a.expires_at > a.created_at);
    }
}
