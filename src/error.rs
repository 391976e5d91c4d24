use thiserror::Error;

/// Parsony gateway startup and hosting errors
///
/// Request-scoped failures are [`crate::gateway::GatewayError`] and never
/// reach this type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid setting {key}: {reason}")]
    InvalidSetting { key: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn invalid_setting(key: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidSetting {
            key: key.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
