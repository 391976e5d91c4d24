//! Envelopes exchanged with the backend
//!
//! Outbound envelopes are JSON objects whose field order is construction
//! order; the signature is computed over that exact serialization, so every
//! mutation here goes through order-preserving map operations.

use crate::domain::canonical::to_canonical_vec;
use crate::domain::types::{ApiKey, SessionToken};
use derive_more::{Display, From};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Field names used on the wire
pub mod fields {
    pub const METHOD: &str = "method";
    pub const ARGS: &str = "args";
    pub const KEY: &str = "key";
    pub const TOKEN: &str = "token";
    pub const SIGNED: &str = "signed";
    pub const DATA: &str = "data";
    pub const SESSION_TOKEN: &str = "sessionToken";
    pub const TWIML: &str = "twiml";

    /// SMS argument names
    pub mod sms {
        pub const CONTENT: &str = "content";
        pub const FROM: &str = "from";
        pub const TO: &str = "to";
    }
}

/// Backend method invoked by the SMS webhook
pub const SMS_WEBHOOK_METHOD: &str = "sms.webhook";

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("request body is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("request body must be a JSON object")]
    NotAnObject,

    #[error("form body is not valid urlencoded data: {0}")]
    InvalidForm(#[from] serde_urlencoded::de::Error),
}

/// Ordered mapping that is signed before transmission
#[derive(Debug, Clone, PartialEq, Default, From, Serialize)]
#[serde(transparent)]
pub struct RequestEnvelope(Map<String, Value>);

impl RequestEnvelope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a client-supplied JSON body verbatim as the base envelope
    ///
    /// A blank body is an empty envelope.
    pub fn from_client_body(body: &[u8]) -> Result<Self, EnvelopeError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::new());
        }

        match serde_json::from_slice(body)? {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(EnvelopeError::NotAnObject),
        }
    }

    /// Envelope for an inbound SMS provider webhook
    ///
    /// Form fields the provider did not send are left out of `args`.
    pub fn sms_webhook(form: &SmsWebhookForm) -> Self {
        let mut args = Map::new();
        let provided = [
            (fields::sms::CONTENT, &form.body),
            (fields::sms::FROM, &form.from),
            (fields::sms::TO, &form.to),
        ];
        for (name, value) in provided {
            if let Some(value) = value {
                args.insert(name.to_string(), Value::String(value.clone()));
            }
        }

        let mut envelope = Self::new();
        envelope.set(fields::METHOD, Value::String(SMS_WEBHOOK_METHOD.to_string()));
        envelope.set(fields::ARGS, Value::Object(args));
        envelope
    }

    /// Attach the gateway credentials as `key` and `token`
    pub fn with_credentials(mut self, api_key: &ApiKey, token: &SessionToken) -> Self {
        self.set(fields::KEY, Value::String(api_key.as_ref().to_string()));
        self.set(fields::TOKEN, Value::String(token.as_wire_str().to_string()));
        self
    }

    /// Set a field; an existing field keeps its position
    pub fn set(&mut self, name: &str, value: Value) {
        self.0.insert(name.to_string(), value);
    }

    /// Remove a field without disturbing the order of the rest
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.shift_remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }
}

/// Canonical JSON, the exact bytes covered by the signature
impl fmt::Display for RequestEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = to_canonical_vec(&self.0).map_err(|_| fmt::Error)?;
        f.write_str(std::str::from_utf8(&bytes).map_err(|_| fmt::Error)?)
    }
}

/// Envelope plus its `signed` digest
///
/// Serializes as the envelope's fields in order followed by `signed`, so the
/// digest is always the last field on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedPayload {
    envelope: RequestEnvelope,
    signature: String,
}

impl SignedPayload {
    pub(crate) fn new(envelope: RequestEnvelope, signature: String) -> Self {
        Self {
            envelope,
            signature,
        }
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn envelope(&self) -> &RequestEnvelope {
        &self.envelope
    }

    /// Wire bytes, rendered with the same number formatting as the digest
    pub fn to_json_bytes(&self) -> serde_json::Result<Vec<u8>> {
        to_canonical_vec(self)
    }
}

impl Serialize for SignedPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let entries = self.envelope.fields();
        let mut map = serializer.serialize_map(Some(entries.len() + 1))?;
        for (name, value) in entries {
            map.serialize_entry(name, value)?;
        }
        map.serialize_entry(fields::SIGNED, &self.signature)?;
        map.end()
    }
}

/// Backend method named in a response's `requested` field
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum RequestedMethod {
    #[display("user.login")]
    UserLogin,
    #[display("user.logout")]
    UserLogout,
    #[display("{_0}")]
    Other(String),
}

impl From<&str> for RequestedMethod {
    fn from(method: &str) -> Self {
        match method {
            "user.login" => Self::UserLogin,
            "user.logout" => Self::UserLogout,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Backend response contract: `{requested, success, data?, error?}`
///
/// Every field is optional on the way in; an absent `success` reads as false.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ResponseEnvelope {
    pub requested: Option<String>,
    pub success: bool,
    pub data: Option<Value>,
    pub error: Option<Value>,
}

impl ResponseEnvelope {
    /// Interpret a parsed backend body; `None` when the shape does not match
    pub fn from_value(body: &Value) -> Option<Self> {
        Self::deserialize(body).ok()
    }

    pub fn requested_method(&self) -> Option<RequestedMethod> {
        self.requested.as_deref().map(RequestedMethod::from)
    }

    /// `data.sessionToken`, when it is a string
    pub fn session_token(&self) -> Option<&str> {
        self.data_field(fields::SESSION_TOKEN)
    }

    /// `data.twiml`, when it is a string
    pub fn twiml(&self) -> Option<&str> {
        self.data_field(fields::TWIML)
    }

    fn data_field(&self, name: &str) -> Option<&str> {
        self.data.as_ref()?.get(name)?.as_str()
    }
}

/// Form fields posted by the SMS provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SmsWebhookForm {
    #[serde(rename = "Body")]
    pub body: Option<String>,
    #[serde(rename = "From")]
    pub from: Option<String>,
    #[serde(rename = "To")]
    pub to: Option<String>,
}

impl SmsWebhookForm {
    /// Read the webhook fields from a urlencoded or JSON body
    ///
    /// JSON is used when the content type says so, urlencoded otherwise. A
    /// repeated field keeps its first value; non-string JSON values are
    /// ignored.
    pub fn from_body(content_type: Option<&str>, body: &[u8]) -> Result<Self, EnvelopeError> {
        let is_json = content_type.is_some_and(|ct| ct.contains("json"));
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }

        let pairs: Vec<(String, String)> = if is_json {
            match serde_json::from_slice(body)? {
                Value::Object(map) => map
                    .into_iter()
                    .filter_map(|(name, value)| match value {
                        Value::String(value) => Some((name, value)),
                        _ => None,
                    })
                    .collect(),
                _ => return Err(EnvelopeError::NotAnObject),
            }
        } else {
            serde_urlencoded::from_bytes(body)?
        };

        let mut form = Self::default();
        for (name, value) in pairs {
            let slot = match name.as_str() {
                "Body" => &mut form.body,
                "From" => &mut form.from,
                "To" => &mut form.to,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        Ok(form)
    }
}
