//! Session translation between the browser cookie and the backend token
//!
//! The browser only ever holds the backend session token in an HttpOnly
//! cookie. Inbound, the cookie becomes the envelope's `token` field; outbound,
//! login and logout responses decide whether the cookie is set or cleared, and
//! the token is stripped from the body before it reaches the browser.

use crate::domain::envelope::fields;
use crate::domain::{CookieDomain, RequestedMethod, ResponseEnvelope, SessionToken};
use derive_more::Debug;
use http::header::{COOKIE, SET_COOKIE};
use http::{HeaderMap, HeaderValue};
use serde_json::Value;
use tracing::warn;

/// Name of the cookie holding the backend session token
pub const SESSION_COOKIE_NAME: &str = "parsonySession";

/// Attributes that make a browser drop the cookie immediately
const EXPIRED_COOKIE_ATTRIBUTES: &str = "Path=/; Expires=Thu, 01 Jan 1970 00:00:00 GMT";

/// What a backend response means for the session cookie
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieDirective {
    #[debug("SetToken(<redacted>)")]
    SetToken(String),
    Clear,
    NoOp,
}

/// Reads and writes the session cookie
#[derive(Debug, Clone, Default)]
pub struct SessionTranslator {
    root_domain: Option<CookieDomain>,
}

impl SessionTranslator {
    pub fn new(root_domain: Option<CookieDomain>) -> Self {
        Self { root_domain }
    }

    /// Session token from the inbound `Cookie` headers
    ///
    /// The first `parsonySession` pair wins. Quoted and percent-encoded values
    /// are unwrapped the way browsers and cookie parsers treat them.
    pub fn extract_token(headers: &HeaderMap) -> SessionToken {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.split_once('='))
            .find(|(name, _)| name.trim() == SESSION_COOKIE_NAME)
            .map(|(_, value)| SessionToken::from_raw(decode_cookie_value(value)))
            .unwrap_or_default()
    }

    /// Decide the cookie mutation for a parsed backend response
    pub fn classify(body: &Value) -> CookieDirective {
        let Some(envelope) = ResponseEnvelope::from_value(body) else {
            return CookieDirective::NoOp;
        };

        match (envelope.requested_method(), envelope.success) {
            (Some(RequestedMethod::UserLogin), true) => login_directive(&envelope),
            (Some(RequestedMethod::UserLogin), false) => CookieDirective::Clear,
            (Some(RequestedMethod::UserLogout), true) => CookieDirective::Clear,
            (Some(RequestedMethod::UserLogout), false)
            | (Some(RequestedMethod::Other(_)), _)
            | (None, _) => CookieDirective::NoOp,
        }
    }

    /// Apply a directive to the outbound response headers
    pub fn apply_cookie(&self, headers: &mut HeaderMap, directive: &CookieDirective) {
        let cookie = match directive {
            CookieDirective::SetToken(token) => self.session_cookie(token),
            CookieDirective::Clear => self.clear_cookie(),
            CookieDirective::NoOp => return,
        };

        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                headers.append(SET_COOKIE, value);
            }
            Err(_) => warn!("Session cookie is not a valid header value; leaving cookie untouched"),
        }
    }

    /// Remove `data.sessionToken` from a body bound for the browser
    pub fn sanitize(body: &mut Value) {
        if let Some(data) = body.get_mut(fields::DATA).and_then(Value::as_object_mut) {
            data.shift_remove(fields::SESSION_TOKEN);
        }
    }

    /// `Cookie` header value re-attached to proxied requests
    pub fn outbound_cookie(token: &SessionToken) -> String {
        format!("{SESSION_COOKIE_NAME}={}", token.as_wire_str())
    }

    /// `parsonySession=<token>; HttpOnly[; Domain=<root>]`
    pub fn session_cookie(&self, token: &str) -> String {
        let cookie = format!("{SESSION_COOKIE_NAME}={token}; HttpOnly");
        self.with_domain(cookie)
    }

    pub fn clear_cookie(&self) -> String {
        let cookie = format!("{SESSION_COOKIE_NAME}=; {EXPIRED_COOKIE_ATTRIBUTES}");
        self.with_domain(cookie)
    }

    fn with_domain(&self, cookie: String) -> String {
        match &self.root_domain {
            Some(domain) => format!("{cookie}; Domain={domain}"),
            None => cookie,
        }
    }
}

fn login_directive(envelope: &ResponseEnvelope) -> CookieDirective {
    match envelope.session_token().map(SessionToken::from_raw) {
        Some(SessionToken::Active(token)) if is_cookie_safe(&token) => {
            CookieDirective::SetToken(token)
        }
        Some(_) => {
            warn!("Login succeeded with an unusable session token; cookie left untouched");
            CookieDirective::NoOp
        }
        None => CookieDirective::NoOp,
    }
}

/// RFC 6265 cookie-octet: visible ASCII minus quote, comma, semicolon, backslash
fn is_cookie_safe(token: &str) -> bool {
    token
        .bytes()
        .all(|b| b.is_ascii_graphic() && !matches!(b, b'"' | b',' | b';' | b'\\'))
}

fn decode_cookie_value(raw: &str) -> String {
    let trimmed = raw.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(trimmed);

    if unquoted.contains('%') {
        urlencoding::decode(unquoted)
            .map(|decoded| decoded.into_owned())
            .unwrap_or_else(|_| unquoted.to_string())
    } else {
        unquoted.to_string()
    }
}
