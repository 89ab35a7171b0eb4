//! Audit telemetry: the global subscriber and the per-skill audit span.
//!
//! Every event emitted while a skill is audited, including the sandbox's
//! per-call decisions, is recorded under a `skill_audit` span carrying the
//! skill's identity and declared mask. The span's `observed` and `compliant`
//! fields are filled in once the run finishes, so a JSON log line for any
//! audit event can be attributed to its skill without correlation.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::{Span, Subscriber, field, info_span, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use skillproof_config::{Config, LogFormat};

use crate::manifest::SkillManifest;
use crate::result::AuditResult;

/// Target of the per-skill audit span.
pub const AUDIT_SPAN_TARGET: &str = "skillproof_auditor::audit";

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Handle returned when telemetry has been initialised.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The configured log filter expression did not parse.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Another subscriber is already installed.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Installs the global audit log subscriber on first use.
///
/// JSON output flattens each event and attaches the enclosing
/// `skill_audit` span, so every line names the skill it belongs to. The
/// filter is checked on every call; later calls return a fresh
/// [`TelemetryHandle`] without touching the global subscriber.
///
/// # Examples
///
/// ```rust
/// use skillproof_auditor::telemetry;
/// use skillproof_config::Config;
///
/// # fn main() -> Result<(), skillproof_auditor::telemetry::TelemetryError> {
/// let config = Config::default();
/// let _handle = telemetry::initialise(&config)?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] for an unparseable filter and
/// [`TelemetryError::Subscriber`] when another subscriber is already global.
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    let filter = build_filter(config)?;
    TELEMETRY_GUARD
        .get_or_try_init(|| install_subscriber(config.log_format(), filter))
        .map(|()| TelemetryHandle)
}

/// Parses the configured filter expression.
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] when the expression is malformed.
pub fn build_filter(config: &Config) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(config.log_filter())
        .map_err(|error| TelemetryError::Filter(error.to_string()))
}

/// Opens the span an audit of `manifest`'s skill runs under.
#[must_use]
pub fn audit_span(manifest: &SkillManifest) -> Span {
    info_span!(
        target: AUDIT_SPAN_TARGET,
        "skill_audit",
        skill = manifest.name(),
        version = manifest.version(),
        agent = manifest.agent_id(),
        declared = manifest.declared_mask().bits(),
        observed = field::Empty,
        compliant = field::Empty,
    )
}

/// Records the run's observed mask and verdict on its audit span.
pub fn record_verdict(span: &Span, result: &AuditResult) {
    span.record("observed", result.observed_mask().bits());
    span.record("compliant", result.is_compliant());
}

fn install_subscriber(format: LogFormat, filter: EnvFilter) -> Result<(), TelemetryError> {
    let ansi = !format.is_machine_readable() && io::stderr().is_terminal();

    let subscriber: Box<dyn Subscriber + Send + Sync> = match format {
        LogFormat::Json => Box::new(
            fmt::Subscriber::builder()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .with_ansi(ansi)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_span_list(false)
                .finish(),
        ),
        LogFormat::Compact => Box::new(
            fmt::Subscriber::builder()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .with_ansi(ansi)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .compact()
                .finish(),
        ),
        LogFormat::Pretty => Box::new(
            fmt::Subscriber::builder()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .with_ansi(ansi)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .pretty()
                .finish(),
        ),
    };

    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    use rstest::rstest;
    use skillproof_permissions::{Capability, PermissionMask};
    use skillproof_sandbox::ExecutionOutcome;

    use super::*;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn text(&self) -> String {
            let bytes = self.0.lock().expect("capture lock").clone();
            String::from_utf8(bytes).expect("utf-8 log output")
        }
    }

    impl Write for Captured {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            self.0.lock().expect("capture lock").extend_from_slice(data);
            Ok(data.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn json_subscriber(captured: &Captured) -> impl Subscriber + Send + Sync {
        let writer = captured.clone();
        fmt::Subscriber::builder()
            .with_env_filter(EnvFilter::new("trace"))
            .with_writer(move || writer.clone())
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(false)
            .finish()
    }

    fn weather_manifest() -> SkillManifest {
        SkillManifest::new("weather", "1.2.0", "agent-7", "index.lua")
            .with_permission(Capability::NetworkRead, true)
    }

    #[rstest]
    #[case("info")]
    #[case("skillproof_sandbox=trace,warn")]
    fn accepts_valid_filters(#[case] filter: &str) {
        let config = Config::default().with_log_filter(filter);
        assert!(build_filter(&config).is_ok());
    }

    #[test]
    fn rejects_malformed_filter() {
        let config = Config::default().with_log_filter("skillproof_auditor=verbose");
        assert!(matches!(build_filter(&config), Err(TelemetryError::Filter(_))));
    }

    #[test]
    fn initialise_is_idempotent() {
        let config = Config::default();
        assert!(initialise(&config).is_ok());
        assert!(initialise(&config).is_ok());
    }

    #[test]
    fn initialise_checks_the_filter_on_every_call() {
        let config = Config::default();
        assert!(initialise(&config).is_ok());
        let malformed = config.with_log_filter("skillproof_auditor=verbose");
        assert!(matches!(initialise(&malformed), Err(TelemetryError::Filter(_))));
    }

    #[test]
    fn events_inside_the_audit_span_name_the_skill() {
        let captured = Captured::default();
        tracing::subscriber::with_default(json_subscriber(&captured), || {
            let span = audit_span(&weather_manifest());
            let _entered = span.enter();
            tracing::info!(capability = "NETWORK_READ", "capability used");
        });

        let line = captured.text();
        let event: serde_json::Value =
            serde_json::from_str(line.trim()).expect("one JSON log line");
        assert_eq!(event["span"]["name"], "skill_audit");
        assert_eq!(event["span"]["skill"], "weather");
        assert_eq!(event["span"]["agent"], "agent-7");
        assert_eq!(event["span"]["declared"], 4);
        assert_eq!(event["capability"], "NETWORK_READ");
    }

    #[test]
    fn verdict_is_recorded_on_the_span() {
        let captured = Captured::default();
        tracing::subscriber::with_default(json_subscriber(&captured), || {
            let span = audit_span(&weather_manifest());
            let result = AuditResult::new(
                PermissionMask::from_capabilities([Capability::NetworkRead]),
                skillproof_permissions::Ledger::new().snapshot(),
                ExecutionOutcome::Completed,
            );
            record_verdict(&span, &result);
            let _entered = span.enter();
            tracing::info!("skill audited");
        });

        let event: serde_json::Value =
            serde_json::from_str(captured.text().trim()).expect("one JSON log line");
        assert_eq!(event["span"]["observed"], 0);
        assert_eq!(event["span"]["compliant"], true);
    }
}
