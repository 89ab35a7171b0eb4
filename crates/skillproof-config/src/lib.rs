//! Configuration for the skill auditor.
//!
//! Settings resolve through `ortho_config` layering: built-in defaults, a TOML
//! file named by `--config-path` or `SKILLPROOF_CONFIG_PATH`, `SKILLPROOF_*`
//! environment variables, then command-line flags. Later layers win.
//! [`Config::resolve`] validates the merged result, so callers never observe
//! an out-of-range deadline or timer cap.
//!
//! ```toml
//! log_filter = "skillproof_auditor=debug,info"
//! log_format = "compact"
//! default_timeout_ms = 2000
//! timer_cap_ms = 1000
//! allow_execution = false
//! ```

mod defaults;
mod error;
mod logging;

use std::ffi::OsString;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    CONFIG_PATH_ENV, DEFAULT_LOG_FILTER, DEFAULT_TIMEOUT_MS, DEFAULT_TIMER_CAP_MS, ENV_PREFIX,
    MAX_TIMEOUT_MS, MIN_TIMEOUT_MS, default_log_filter, default_log_filter_string,
    default_log_format,
};
pub use error::ConfigError;
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved auditor configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, OrthoConfig)]
#[serde(default)]
#[ortho_config(prefix = "SKILLPROOF")]
pub struct Config {
    /// Tracing filter expression.
    #[ortho_config(default = default_log_filter_string())]
    log_filter: String,
    /// Log output format.
    #[ortho_config(default = default_log_format())]
    log_format: LogFormat,
    /// Run deadline used when a manifest declares none.
    #[ortho_config(default = DEFAULT_TIMEOUT_MS)]
    default_timeout_ms: u64,
    /// Upper bound on skill timer delays.
    #[ortho_config(default = DEFAULT_TIMER_CAP_MS)]
    timer_cap_ms: u64,
    /// Forward intercepted calls to real implementations.
    #[ortho_config(default = false)]
    allow_execution: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            timer_cap_ms: DEFAULT_TIMER_CAP_MS,
            allow_execution: false,
        }
    }
}

impl Config {
    /// Resolves configuration from the process arguments, environment and
    /// configuration file, then validates it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] when a layer cannot be read or parsed and
    /// [`ConfigError::Invalid`] when the merged settings are out of range.
    pub fn resolve() -> Result<Self, ConfigError> {
        Self::load().map_err(ConfigError::Load)?.validated()
    }

    /// Resolves configuration from explicit arguments, the first being the
    /// program name, then validates it.
    ///
    /// # Errors
    ///
    /// See [`Config::resolve`].
    pub fn resolve_from_iter<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Self::load_from_iter(args)
            .map_err(ConfigError::Load)?
            .validated()
    }

    fn validated(self) -> Result<Self, ConfigError> {
        self.validate()?;
        Ok(self)
    }

    /// Checks every setting is in range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_filter.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "log_filter",
                message: String::from("must not be empty"),
            });
        }
        if !(MIN_TIMEOUT_MS..=MAX_TIMEOUT_MS).contains(&self.default_timeout_ms) {
            return Err(ConfigError::Invalid {
                field: "default_timeout_ms",
                message: format!("must be between {MIN_TIMEOUT_MS} and {MAX_TIMEOUT_MS}"),
            });
        }
        if self.timer_cap_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "timer_cap_ms",
                message: String::from("must be greater than zero"),
            });
        }
        Ok(())
    }

    /// Sets the tracing filter expression.
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// Sets the log output format.
    #[must_use]
    pub const fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    /// Sets whether intercepted calls forward to real implementations.
    #[must_use]
    pub const fn with_allow_execution(mut self, allow: bool) -> Self {
        self.allow_execution = allow;
        self
    }

    /// Sets the default run deadline.
    #[must_use]
    pub const fn with_default_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.default_timeout_ms = timeout_ms;
        self
    }

    /// Sets the timer cap.
    #[must_use]
    pub const fn with_timer_cap_ms(mut self, cap_ms: u64) -> Self {
        self.timer_cap_ms = cap_ms;
        self
    }

    /// Returns the tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Returns the log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Returns the default run deadline in milliseconds.
    #[must_use]
    pub const fn default_timeout_ms(&self) -> u64 {
        self.default_timeout_ms
    }

    /// Returns the default run deadline.
    #[must_use]
    pub const fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    /// Returns the timer cap.
    #[must_use]
    pub const fn timer_cap(&self) -> Duration {
        Duration::from_millis(self.timer_cap_ms)
    }

    /// Returns whether intercepted calls forward to real implementations.
    #[must_use]
    pub const fn allow_execution(&self) -> bool {
        self.allow_execution
    }
}
