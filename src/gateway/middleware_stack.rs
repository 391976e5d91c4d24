//! Middleware stack builder for clean composition
//!
//! Keeps the order of the gateway's layers in one place so the service and
//! its tests assemble the same pipeline.

use crate::gateway::middleware::*;
use crate::gateway::types::RequestSizeLimit;
use axum::{extract::DefaultBodyLimit, middleware::from_fn, Router};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer};

/// Builder for composing the gateway middleware stack
#[derive(Clone, Debug)]
pub struct GatewayMiddlewareStack {
    max_request_size: RequestSizeLimit,
    cors: bool,
}

impl GatewayMiddlewareStack {
    pub fn new(max_request_size: RequestSizeLimit) -> Self {
        Self {
            max_request_size,
            cors: true,
        }
    }

    /// Enable or disable the permissive CORS layer
    pub fn with_cors(mut self, enabled: bool) -> Self {
        self.cors = enabled;
        self
    }

    /// Apply the complete middleware stack to a router
    ///
    /// Outer to inner:
    /// 1. Request ID generation/propagation
    /// 2. Logging (with request ID)
    /// 3. CORS, when enabled
    /// 4. Request body limit
    pub fn apply_to_router<S>(self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let router = router
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(*self.max_request_size.as_ref()));

        let router = if self.cors {
            router.layer(CorsLayer::permissive())
        } else {
            router
        };

        router
            .layer(from_fn(logging_middleware))
            .layer(from_fn(request_id_middleware))
    }
}
