use crate::logging::LogFormat;

/// Default log filter expression.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default skill run deadline in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Default upper bound on timer delays in milliseconds.
pub const DEFAULT_TIMER_CAP_MS: u64 = 5_000;

/// Smallest accepted run deadline in milliseconds.
pub const MIN_TIMEOUT_MS: u64 = 100;

/// Largest accepted run deadline in milliseconds.
pub const MAX_TIMEOUT_MS: u64 = 60_000;

/// Prefix shared by every environment override.
pub const ENV_PREFIX: &str = "SKILLPROOF_";

/// Environment variable naming a configuration file.
pub const CONFIG_PATH_ENV: &str = "SKILLPROOF_CONFIG_PATH";

/// Default log filter expression.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}
