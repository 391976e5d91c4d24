//! Validated newtypes for the values the gateway trusts
//!
//! Credentials and cookie attributes are validated once at startup so the
//! request path never deals with raw configuration strings.

use nutype::nutype;
use serde::Deserialize;
use std::fmt;

/// Value carried in the `token` field when the browser holds no session
pub const NO_SESSION: &str = "none";

/// API key attached to every backend envelope as `key`
#[nutype(
    sanitize(trim),
    validate(not_empty),
    derive(Debug, Clone, PartialEq, Eq, Deserialize, AsRef, Display)
)]
pub struct ApiKey(String);

/// Domain attribute for the session cookie
///
/// Must be a bare host name: separators or whitespace would let the value
/// inject extra cookie attributes.
#[nutype(
    sanitize(trim),
    validate(
        not_empty,
        len_char_max = 253,
        predicate = |s| !s.contains(|c: char| c == ';' || c == ',' || c == '=' || c.is_whitespace())
    ),
    derive(Debug, Clone, PartialEq, Eq, Deserialize, AsRef, Display)
)]
pub struct CookieDomain(String);

/// Shared secret used to sign backend envelopes
///
/// Only the signer reads the raw bytes. `Debug` is redacted so the secret
/// cannot reach a log line through a derived `Debug` on a containing struct.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct SharedSecret(String);

impl SharedSecret {
    pub fn try_new(secret: impl Into<String>) -> Result<Self, SharedSecretError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(SharedSecretError::Empty);
        }
        Ok(Self(secret))
    }

    pub(crate) fn expose(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl TryFrom<String> for SharedSecret {
    type Error = SharedSecretError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_new(value)
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret(<redacted>)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SharedSecretError {
    #[error("shared secret must not be empty")]
    Empty,
}

/// Session token as seen by the gateway
///
/// The backend expects the literal `"none"` when no session exists, but a
/// missing session is modelled as its own variant so it can never be mistaken
/// for a real token. `Active` never holds an empty string or the sentinel.
#[derive(Clone, PartialEq, Eq, Default)]
pub enum SessionToken {
    #[default]
    Absent,
    Active(String),
}

impl SessionToken {
    /// Build from a raw cookie or backend value, mapping empty values and the
    /// sentinel itself to `Absent`
    pub fn from_raw(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        if raw.is_empty() || raw == NO_SESSION {
            Self::Absent
        } else {
            Self::Active(raw)
        }
    }

    /// Value sent to the backend in the `token` field and the proxy cookie
    pub fn as_wire_str(&self) -> &str {
        match self {
            Self::Absent => NO_SESSION,
            Self::Active(token) => token,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active(_))
    }
}

// Tokens are credentials; keep them out of logs.
impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => f.write_str("SessionToken::Absent"),
            Self::Active(_) => f.write_str("SessionToken::Active(<redacted>)"),
        }
    }
}
