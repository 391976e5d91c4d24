//! Request signing
//!
//! Every envelope leaves the gateway with a `signed` field holding
//! `hex(sha256(canonical_json(envelope) || secret))`. The backend holds the
//! same secret and recomputes the digest over the received object minus its
//! `signed` field.

use crate::domain::envelope::fields;
use crate::domain::{RequestEnvelope, SharedSecret, SignedPayload};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Length of a rendered signature in hex characters
pub const SIGNATURE_HEX_LEN: usize = 64;

/// Signs envelopes with the shared secret
#[derive(Debug, Clone)]
pub struct RequestSigner {
    secret: SharedSecret,
}

impl RequestSigner {
    pub fn new(secret: SharedSecret) -> Self {
        Self { secret }
    }

    /// Return the envelope plus its `signed` digest
    ///
    /// The input is not modified. A `signed` field already present in the
    /// envelope is dropped before hashing and replaced by the fresh digest.
    pub fn sign(&self, envelope: &RequestEnvelope) -> SignedPayload {
        let mut unsigned = envelope.clone();
        unsigned.remove(fields::SIGNED);
        let signature = self.digest(unsigned.to_string().as_bytes());
        SignedPayload::new(unsigned, signature)
    }

    /// Check a received object against its `signed` field
    pub fn verify(&self, payload: &Map<String, Value>) -> bool {
        let Some(claimed) = payload.get(fields::SIGNED).and_then(Value::as_str) else {
            return false;
        };

        let mut unsigned = RequestEnvelope::from(payload.clone());
        unsigned.remove(fields::SIGNED);
        self.digest(unsigned.to_string().as_bytes()) == claimed
    }

    fn digest(&self, canonical: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(canonical);
        hasher.update(self.secret.expose());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SECRET: &str = "asaadfkeh28faf=";

    fn signer(secret: &str) -> RequestSigner {
        RequestSigner::new(SharedSecret::try_new(secret).unwrap())
    }

    fn envelope(value: Value) -> RequestEnvelope {
        match value {
            Value::Object(map) => RequestEnvelope::from(map),
            _ => panic!("test envelope must be an object"),
        }
    }

    fn sample() -> RequestEnvelope {
        envelope(json!({
            "method": "method.test",
            "args": {"arg1": "firstArg", "arg2": "secondArg"}
        }))
    }

    #[test]
    fn test_signature_is_64_lowercase_hex() {
        let signed = signer(SECRET).sign(&sample());
        assert_eq!(signed.signature().len(), SIGNATURE_HEX_LEN);
        assert!(signed
            .signature()
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_signature_matches_manual_digest() {
        let canonical = r#"{"method":"method.test","args":{"arg1":"firstArg","arg2":"secondArg"}}"#;
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        hasher.update(SECRET.as_bytes());
        let expected = hex::encode(hasher.finalize());

        assert_eq!(signer(SECRET).sign(&sample()).signature(), expected);
    }

    #[test]
    fn test_sign_is_deterministic_and_secret_sensitive() {
        let first = signer(SECRET).sign(&sample());
        let second = signer(SECRET).sign(&sample());
        let other = signer("another-secret").sign(&sample());

        assert_eq!(first.signature(), second.signature());
        assert_ne!(first.signature(), other.signature());
    }

    #[test]
    fn test_sign_does_not_mutate_input() {
        let original = sample();
        let before = original.clone();
        let _ = signer(SECRET).sign(&original);
        assert_eq!(original, before);
        assert!(original.get(fields::SIGNED).is_none());
    }

    #[test]
    fn test_existing_signed_field_is_excluded_from_digest() {
        let mut tampered = sample();
        tampered.set(fields::SIGNED, json!("stale"));

        let clean = signer(SECRET).sign(&sample());
        let resigned = signer(SECRET).sign(&tampered);
        assert_eq!(clean.signature(), resigned.signature());
    }

    #[test]
    fn test_unrelated_field_changes_digest() {
        let mut extended = sample();
        extended.set("extra", json!(1));

        let clean = signer(SECRET).sign(&sample());
        let changed = signer(SECRET).sign(&extended);
        assert_ne!(clean.signature(), changed.signature());
    }

    #[test]
    fn test_verify_accepts_transmitted_payload() {
        let signer = signer(SECRET);
        let signed = signer.sign(&sample());
        let wire: Value = serde_json::from_slice(&signed.to_json_bytes().unwrap()).unwrap();
        let wire = wire.as_object().unwrap();

        assert!(signer.verify(wire));
        assert_eq!(wire.keys().last().map(String::as_str), Some(fields::SIGNED));
    }

    #[test]
    fn test_verify_rejects_tampering_and_wrong_secret() {
        let signed = signer(SECRET).sign(&sample());
        let wire: Value = serde_json::from_slice(&signed.to_json_bytes().unwrap()).unwrap();
        let mut tampered = wire.as_object().unwrap().clone();
        tampered.insert("method".to_string(), json!("admin.drop"));

        assert!(!signer(SECRET).verify(&tampered));
        assert!(!signer("wrong").verify(wire.as_object().unwrap()));
        assert!(!signer(SECRET).verify(&Map::new()));
    }

    #[test]
    fn test_secret_never_appears_in_output() {
        let signed = signer(SECRET).sign(&sample());
        let json = String::from_utf8(signed.to_json_bytes().unwrap()).unwrap();
        assert!(!json.contains(SECRET));
        assert!(!format!("{:?}", signer(SECRET)).contains(SECRET));
    }
}
