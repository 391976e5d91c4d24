//! HTTP surface of the gateway
//!
//! `GatewayService` mounts the endpoint behaviors of [`GatewayRouter`] on an
//! axum router and wraps them in the middleware stack.
//!
//! ```rust,ignore
//! use parsony_gateway::gateway::{GatewayConfig, GatewayService};
//!
//! let service = GatewayService::from_config(config);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, service.into_router()).await?;
//! ```

use crate::domain::SmsWebhookForm;
use crate::gateway::backend::{BackendTransport, HyperBackend};
use crate::gateway::headers::{paths, CONTENT_TYPE};
use crate::gateway::middleware_stack::GatewayMiddlewareStack;
use crate::gateway::router::GatewayRouter;
use crate::gateway::types::GatewayConfig;
use crate::session::SessionTranslator;
use axum::{
    extract::{OriginalUri, State},
    http::HeaderMap,
    response::Response,
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::{ServeDir, ServeFile};
use tracing::{info, warn};

/// Gateway endpoints plus the hosting concerns around them
pub struct GatewayService {
    router: GatewayRouter,
    static_files: Option<PathBuf>,
    cors: bool,
}

impl GatewayService {
    pub fn new(router: GatewayRouter) -> Self {
        Self {
            router,
            static_files: None,
            cors: true,
        }
    }

    /// Service backed by the hyper transport
    pub fn from_config(config: GatewayConfig) -> Self {
        let backend: Arc<dyn BackendTransport> = Arc::new(HyperBackend::from_config(&config));
        Self::new(GatewayRouter::new(config, backend))
    }

    /// Serve a directory for unmatched requests, falling back to its
    /// `index.html` so client-side routes resolve
    pub fn with_static_files(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_files = Some(dir.into());
        self
    }

    pub fn with_cors(mut self, enabled: bool) -> Self {
        self.cors = enabled;
        self
    }

    /// Create the axum router with every endpoint and the middleware stack
    pub fn into_router(self) -> Router {
        let config = self.router.config();
        let endpoints = config.endpoints.clone();
        let proxy_enabled = config.proxy_backend_url.is_some();
        let stack = GatewayMiddlewareStack::new(config.max_request_size).with_cors(self.cors);

        let mut router = Router::new()
            .route(paths::HEALTH, get(health_handler))
            .route(endpoints.api.as_ref(), post(api_handler))
            .route(endpoints.sms.as_ref(), post(sms_handler));

        if proxy_enabled {
            let prefix = endpoints.proxy.as_ref();
            router = router
                .route(prefix, post(proxy_handler))
                .route(&format!("{prefix}/"), post(proxy_handler))
                .route(&format!("{prefix}/{{*rest}}"), post(proxy_handler));
        }

        info!(
            api = %endpoints.api,
            sms = %endpoints.sms,
            proxy = ?proxy_enabled.then(|| endpoints.proxy.to_string()),
            "Gateway endpoints mounted"
        );

        let mut router = router.with_state(Arc::new(self.router));

        if let Some(dir) = self.static_files {
            let index = dir.join(paths::SPA_INDEX);
            router = router.fallback_service(ServeDir::new(dir).fallback(ServeFile::new(index)));
        }

        stack.apply_to_router(router)
    }
}

async fn api_handler(
    State(gateway): State<Arc<GatewayRouter>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let session = SessionTranslator::extract_token(&headers);
    gateway.relay_api(&session, &body).await
}

/// Accepts urlencoded or JSON webhooks; an unreadable body relays an empty form
async fn sms_handler(
    State(gateway): State<Arc<GatewayRouter>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let session = SessionTranslator::extract_token(&headers);
    let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
    let form = SmsWebhookForm::from_body(content_type, &body).unwrap_or_else(|error| {
        warn!(endpoint = "sms", error = %error, "Unreadable SMS webhook body");
        SmsWebhookForm::default()
    });

    gateway.relay_sms(&session, &form).await
}

async fn proxy_handler(
    State(gateway): State<Arc<GatewayRouter>>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let session = SessionTranslator::extract_token(&headers);
    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    let content_type = headers.get(CONTENT_TYPE).cloned();

    gateway
        .relay_proxy(&session, path_and_query, content_type, body)
        .await
}

/// Health check handler
async fn health_handler() -> &'static str {
    "OK"
}
