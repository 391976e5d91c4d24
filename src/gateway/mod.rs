//! Gateway module for the browser-facing endpoints
//!
//! - API passthrough: signs client envelopes and translates the session
//!   cookie to and from the backend token
//! - SMS webhook: wraps provider form posts in a signed envelope and answers
//!   with the backend's TwiML
//! - Generic proxy: forwards raw bodies to the proxy backend with only the
//!   session cookie attached

pub mod backend;
pub mod error_response;
pub mod headers;
pub mod middleware;
pub mod middleware_stack;
pub mod router;
pub mod service;
pub mod types;
pub mod url_resolver;


#[cfg(test)]
mod integration_tests;

pub use backend::{BackendReply, BackendRequest, BackendTransport, HyperBackend};
pub use router::GatewayRouter;
pub use service::GatewayService;
pub use types::{EndpointPaths, GatewayConfig, GatewayError, GatewayResult};
