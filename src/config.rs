use crate::domain::{ApiKey, CookieDomain, SharedSecret};
use crate::error::{Error, Result};
use crate::gateway::types::*;
use config::builder::{ConfigBuilder, DefaultState};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prefix for environment overrides, e.g. `PARSONY_GATEWAY__CREDENTIALS__SECRET`
pub const ENV_PREFIX: &str = "PARSONY_GATEWAY";

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub backend: BackendSettings,
    pub credentials: CredentialSettings,
    pub endpoints: EndpointSettings,
    #[serde(default)]
    pub session: SessionSettings,
    pub server: ServerSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    pub environment: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendSettings {
    pub url: String,
    pub proxy_url: Option<String>,
    pub request_timeout_ms: u64,
    pub max_response_bytes: usize,
}

/// Validated on load; the secret's `Debug` output is redacted
#[derive(Debug, Deserialize, Clone)]
pub struct CredentialSettings {
    pub api_key: ApiKey,
    pub secret: SharedSecret,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EndpointSettings {
    pub api: String,
    pub sms: String,
    pub proxy: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SessionSettings {
    pub cookie_root_domain: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub static_files: Option<PathBuf>,
    pub cors: bool,
    pub max_request_bytes: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: String,
    pub format: String,
}

impl LoggingSettings {
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

impl Settings {
    /// Load defaults, the `config/` files and environment overrides
    pub fn new() -> std::result::Result<Self, ConfigError> {
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let config = with_defaults(Config::builder(), &environment)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{environment}")).required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        config.try_deserialize()
    }

    /// Load a single explicit file over the defaults
    pub fn from_file(path: impl AsRef<Path>) -> std::result::Result<Self, ConfigError> {
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        with_defaults(Config::builder(), &environment)?
            .add_source(File::from(path.as_ref()).required(true))
            .build()?
            .try_deserialize()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.application.host, self.application.port)
    }
}

fn with_defaults(
    builder: ConfigBuilder<DefaultState>,
    environment: &str,
) -> std::result::Result<ConfigBuilder<DefaultState>, ConfigError> {
    builder
        .set_default("application.host", "0.0.0.0")?
        .set_default("application.port", 8080)?
        .set_default("application.environment", environment)?
        .set_default("backend.request_timeout_ms", 30_000)?
        .set_default("backend.max_response_bytes", DEFAULT_MAX_RESPONSE_BYTES as u64)?
        .set_default("endpoints.api", DEFAULT_API_PATH)?
        .set_default("endpoints.sms", DEFAULT_SMS_PATH)?
        .set_default("endpoints.proxy", DEFAULT_PROXY_PATH)?
        .set_default("server.cors", true)?
        .set_default("server.max_request_bytes", DEFAULT_MAX_REQUEST_BYTES as u64)?
        .set_default("logging.level", "info")?
        .set_default("logging.format", "json")
}

impl GatewayConfig {
    /// Validate loaded settings into the gateway's typed configuration
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let backend_url = BackendUrl::try_new(settings.backend.url.clone())
            .map_err(|e| Error::invalid_setting("backend.url", e))?;

        let proxy_backend_url = settings
            .backend
            .proxy_url
            .as_ref()
            .filter(|url| !url.trim().is_empty())
            .map(|url| {
                BackendUrl::try_new(url.clone())
                    .map_err(|e| Error::invalid_setting("backend.proxy_url", e))
            })
            .transpose()?;

        let endpoints = EndpointPaths {
            api: endpoint_path("endpoints.api", &settings.endpoints.api)?,
            sms: endpoint_path("endpoints.sms", &settings.endpoints.sms)?,
            proxy: endpoint_path("endpoints.proxy", &settings.endpoints.proxy)?,
        };
        if endpoints.api == endpoints.sms
            || endpoints.api == endpoints.proxy
            || endpoints.sms == endpoints.proxy
        {
            return Err(Error::invalid_setting(
                "endpoints",
                "api, sms and proxy paths must differ",
            ));
        }

        let cookie_root_domain = settings
            .session
            .cookie_root_domain
            .as_ref()
            .filter(|domain| !domain.trim().is_empty())
            .map(|domain| {
                CookieDomain::try_new(domain.clone())
                    .map_err(|e| Error::invalid_setting("session.cookie_root_domain", e))
            })
            .transpose()?;

        if settings.backend.request_timeout_ms == 0 {
            return Err(Error::invalid_setting(
                "backend.request_timeout_ms",
                "must be greater than zero",
            ));
        }

        let max_request_size = RequestSizeLimit::try_new(settings.server.max_request_bytes)
            .map_err(|e| Error::invalid_setting("server.max_request_bytes", e))?;
        let max_response_size = ResponseSizeLimit::try_new(settings.backend.max_response_bytes)
            .map_err(|e| Error::invalid_setting("backend.max_response_bytes", e))?;

        Ok(Self {
            api_key: settings.credentials.api_key.clone(),
            secret: settings.credentials.secret.clone(),
            backend_url,
            proxy_backend_url,
            endpoints,
            cookie_root_domain,
            request_timeout: Duration::from_millis(settings.backend.request_timeout_ms),
            max_request_size,
            max_response_size,
        })
    }
}

fn endpoint_path(key: &str, value: &str) -> Result<EndpointPath> {
    EndpointPath::try_new(value).map_err(|e| Error::invalid_setting(key, e))
}
