//! Destination resolution for the generic proxy endpoint

use crate::gateway::types::*;
use http::Uri;

/// Maps inbound proxy paths onto the proxy backend
pub struct UrlResolver;

impl UrlResolver {
    /// Part of the inbound path after the proxy prefix and its separator
    ///
    /// `/proxy/orders/42?x=1` with prefix `/proxy` yields `orders/42?x=1`;
    /// the bare prefix yields an empty suffix. Paths outside the prefix are
    /// rejected rather than forwarded.
    pub fn proxy_suffix<'a>(
        prefix: &EndpointPath,
        path_and_query: &'a str,
    ) -> GatewayResult<&'a str> {
        let outside = || {
            GatewayError::InvalidDestination(format!(
                "path '{path_and_query}' is outside proxy prefix '{prefix}'"
            ))
        };

        let rest = path_and_query
            .strip_prefix(prefix.as_ref())
            .ok_or_else(outside)?;

        if rest.is_empty() || rest.starts_with('?') {
            Ok(rest)
        } else {
            rest.strip_prefix('/').ok_or_else(outside)
        }
    }

    /// Proxy backend base URL joined with the suffix by exactly one `/`
    pub fn resolve_proxy_destination(
        proxy_backend: &BackendUrl,
        prefix: &EndpointPath,
        path_and_query: &str,
    ) -> GatewayResult<Uri> {
        let suffix = Self::proxy_suffix(prefix, path_and_query)?;
        let base = proxy_backend.as_ref().trim_end_matches('/');
        let destination = if suffix.starts_with('?') {
            format!("{base}/{suffix}")
        } else {
            format!("{base}/{}", suffix.trim_start_matches('/'))
        };

        destination
            .parse()
            .map_err(|_| GatewayError::InvalidDestination(destination))
    }

    /// Backend URL as a request URI
    pub fn backend_uri(backend: &BackendUrl) -> GatewayResult<Uri> {
        backend
            .as_ref()
            .parse()
            .map_err(|_| GatewayError::InvalidDestination(backend.to_string()))
    }
}
