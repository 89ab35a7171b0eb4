use std::sync::Arc;

use ortho_config::OrthoError;
use thiserror::Error;

/// Errors raised while resolving auditor configuration.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Layered loading failed: an unreadable file, malformed TOML or an
    /// unparsable flag or environment value.
    #[error("failed to load configuration: {0}")]
    Load(#[source] Arc<OrthoError>),

    /// A setting is out of range.
    #[error("invalid configuration: {field} {message}")]
    Invalid {
        /// Offending setting.
        field: &'static str,
        /// Reason the setting was rejected.
        message: String,
    },
}
