//! Domain types for the gateway
//!
//! Credentials, session tokens and the envelopes exchanged with the backend.

pub mod canonical;
pub mod envelope;
pub mod types;

pub use canonical::{to_canonical_vec, JsNumberFormatter};
pub use envelope::{
    EnvelopeError, RequestEnvelope, RequestedMethod, ResponseEnvelope, SignedPayload,
    SmsWebhookForm,
};
pub use types::{ApiKey, CookieDomain, SessionToken, SharedSecret, NO_SESSION};
