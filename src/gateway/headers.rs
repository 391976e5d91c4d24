//! HTTP header constants and utilities for the gateway
//!
//! Centralizes the header names, content types and well-known paths used by
//! the endpoints so the wire contract lives in one place.

/// Header name for request ID used for tracing and correlation
pub const X_REQUEST_ID: &str = "x-request-id";

/// Standard header re-exports for convenience
pub use ::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};

/// Well-known paths
pub mod paths {
    /// Health check endpoint path
    pub const HEALTH: &str = "/health";

    /// File served for unmatched paths when static files are enabled
    pub const SPA_INDEX: &str = "index.html";
}

/// Content types produced or forwarded by the gateway
pub mod content_types {
    pub const APPLICATION_JSON: &str = "application/json";
    /// Sent to the backend with every signed envelope
    pub const APPLICATION_JSON_UTF8: &str = "application/json;charset=utf-8";
    pub const TEXT_XML: &str = "text/xml";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_constants() {
        assert!(X_REQUEST_ID.starts_with("x-"));
        assert!(paths::HEALTH.starts_with('/'));
        assert!(content_types::APPLICATION_JSON_UTF8.starts_with(content_types::APPLICATION_JSON));
    }
}
