//! Error shaping for the gateway endpoints
//!
//! Browser callers always parse a `{success, error}` envelope, so JSON
//! failures keep that shape. The SMS and proxy endpoints answer in XML and
//! signal failure through the status code alone.

use crate::gateway::headers::content_types;
use crate::gateway::types::GatewayError;
use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Error type reported for backend failures
pub const API_SERVER_ERROR_TYPE: &str = "api_server";

/// Error type reported for failures the gateway detects itself
pub const GATEWAY_ERROR_TYPE: &str = "gateway";

/// `{success:false, error:{code, type, message, detail}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: u16,
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub detail: String,
}

impl ErrorEnvelope {
    pub fn new(
        code: u16,
        kind: impl Into<String>,
        message: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            error: ErrorDetail {
                code,
                kind: kind.into(),
                message: message.into(),
                detail: detail.into(),
            },
        }
    }

    /// Fixed body returned when the backend cannot be reached
    pub fn api_server_unavailable() -> Self {
        Self::new(
            500,
            API_SERVER_ERROR_TYPE,
            "API server not responding.",
            "[CRITICAL] The API server is not responding.",
        )
    }

    /// Body returned when the backend answers with something other than JSON
    pub fn api_server_malformed() -> Self {
        Self::new(
            502,
            API_SERVER_ERROR_TYPE,
            "API server returned an invalid response.",
            "[CRITICAL] The API server response could not be parsed.",
        )
    }

    pub fn invalid_request(detail: impl Into<String>) -> Self {
        Self::new(400, GATEWAY_ERROR_TYPE, "Invalid request body.", detail)
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(500, GATEWAY_ERROR_TYPE, "Gateway error.", detail)
    }

    pub fn into_response_with_status(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

/// Extension trait for consistent error formatting on the JSON endpoint
pub trait ErrorResponseExt {
    /// Convert to the error envelope sent to the browser
    fn to_error_envelope(&self) -> ErrorEnvelope;

    /// Get the appropriate HTTP status code
    fn status_code(&self) -> StatusCode;
}

impl ErrorResponseExt for GatewayError {
    fn to_error_envelope(&self) -> ErrorEnvelope {
        use GatewayError::*;

        match self {
            Transport(_) | Timeout(_) | ResponseTooLarge { .. } | UpstreamStatus { .. } => {
                ErrorEnvelope::api_server_unavailable()
            }
            MalformedBackendResponse(_) => ErrorEnvelope::api_server_malformed(),
            InvalidRequestBody(msg) => ErrorEnvelope::invalid_request(msg.clone()),
            InvalidDestination(_) | Http(_) | Serialization(_) => {
                ErrorEnvelope::internal(self.to_string())
            }
        }
    }

    fn status_code(&self) -> StatusCode {
        use GatewayError::*;

        match self {
            // Callers expect a success-shaped HTTP exchange with `success:false`
            Transport(_) | Timeout(_) | ResponseTooLarge { .. } | UpstreamStatus { .. } => {
                StatusCode::OK
            }
            MalformedBackendResponse(_) => StatusCode::BAD_GATEWAY,
            InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            InvalidDestination(_) | Http(_) | Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        self.to_error_envelope().into_response_with_status(status)
    }
}

/// Response with a `text/xml` content type
pub fn xml_response(status: StatusCode, body: impl Into<Body>) -> Response {
    let mut response = (status, body.into()).into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content_types::TEXT_XML),
    );
    response
}

/// SMS endpoint failure: empty XML body, status only
pub fn sms_failure_response(error: &GatewayError) -> Response {
    let status = match error {
        GatewayError::MalformedBackendResponse(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    xml_response(status, Body::empty())
}

/// Proxy endpoint failure: 500 with whatever body the backend sent, if any
pub fn proxy_failure_response(error: &GatewayError) -> Response {
    let body = error
        .upstream_body()
        .map(|body| Body::from(body.clone()))
        .unwrap_or_else(Body::empty);
    xml_response(StatusCode::INTERNAL_SERVER_ERROR, body)
}
