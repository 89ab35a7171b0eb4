//! Sandbox runner: loads, compiles and executes one skill per call.
//!
//! Every call to [`SandboxRunner::run_audit`] builds its own ledger and
//! execution context, so a runner may be shared between threads and used for
//! concurrent audits without the runs observing each other.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use skillproof_config::Config;
use skillproof_permissions::{Ledger, PermissionMask};
use skillproof_sandbox::{
    DEFAULT_TIMER_CAP, ExecutionContext, LedgerHandle, SandboxError, SandboxProfile,
};
use tracing::{debug, warn};

use crate::error::AuditError;
use crate::manifest::SkillManifest;
use crate::result::AuditResult;

const RUNNER_TARGET: &str = "skillproof_auditor::runner";

/// Default wall-clock bound for a run without a manifest override.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(skillproof_config::DEFAULT_TIMEOUT_MS);

/// Lifecycle of a single audit run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Nothing has happened yet.
    Idle,
    /// Resolving and reading the entrypoint.
    Loading,
    /// Skill code is running.
    Executing,
    /// The run produced a result.
    Completed,
    /// The run aborted before skill code ran.
    Failed,
}

impl RunState {
    /// Returns the lowercase state name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Executing => "executing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings shared by every run a runner performs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerOptions {
    default_timeout: Duration,
    timer_cap: Duration,
    allow_execution: bool,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            default_timeout: DEFAULT_TIMEOUT,
            timer_cap: DEFAULT_TIMER_CAP,
            allow_execution: false,
        }
    }
}

impl RunnerOptions {
    /// Derives runner options from resolved configuration.
    #[must_use]
    pub const fn from_config(config: &Config) -> Self {
        Self {
            default_timeout: config.default_timeout(),
            timer_cap: config.timer_cap(),
            allow_execution: config.allow_execution(),
        }
    }

    /// Sets the bound used when a request carries no override.
    #[must_use]
    pub const fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Sets the timer cap.
    #[must_use]
    pub const fn with_timer_cap(mut self, cap: Duration) -> Self {
        self.timer_cap = cap;
        self
    }

    /// Enables forwarding of intercepted calls.
    #[must_use]
    pub const fn with_allow_execution(mut self, allow: bool) -> Self {
        self.allow_execution = allow;
        self
    }

    /// Returns the default run bound.
    #[must_use]
    pub const fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Returns the timer cap.
    #[must_use]
    pub const fn timer_cap(&self) -> Duration {
        self.timer_cap
    }

    /// Returns whether intercepted calls forward.
    #[must_use]
    pub const fn allow_execution(&self) -> bool {
        self.allow_execution
    }
}

/// What the runner needs from a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRequest {
    entrypoint: PathBuf,
    declared: PermissionMask,
    timeout: Option<Duration>,
}

impl AuditRequest {
    /// Creates a request for `entrypoint`, relative to the skill directory.
    #[must_use]
    pub fn new(entrypoint: impl Into<PathBuf>, declared: PermissionMask) -> Self {
        Self {
            entrypoint: entrypoint.into(),
            declared,
            timeout: None,
        }
    }

    /// Builds a request from a validated manifest.
    #[must_use]
    pub fn from_manifest(manifest: &SkillManifest) -> Self {
        Self {
            entrypoint: manifest.entrypoint().to_path_buf(),
            declared: manifest.declared_mask(),
            timeout: manifest.timeout(),
        }
    }

    /// Overrides the run bound.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the entrypoint path.
    #[must_use]
    pub fn entrypoint(&self) -> &Path {
        &self.entrypoint
    }

    /// Returns the declared mask.
    #[must_use]
    pub const fn declared(&self) -> PermissionMask {
        self.declared
    }

    /// Returns the run bound override.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

/// Runs skills inside fresh sandboxes and reports what they did.
#[derive(Debug, Clone, Default)]
pub struct SandboxRunner {
    options: RunnerOptions,
}

impl SandboxRunner {
    /// Creates a runner with the given options.
    #[must_use]
    pub const fn new(options: RunnerOptions) -> Self {
        Self { options }
    }

    /// Returns the runner's options.
    #[must_use]
    pub const fn options(&self) -> &RunnerOptions {
        &self.options
    }

    /// Audits the skill described by `request`, resolving its entrypoint
    /// against `skill_dir`.
    ///
    /// Errors raised by skill code, timeouts and denied requests do not fail
    /// the audit; they are reported through the result's outcome.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::EntrypointNotFound`] when the entrypoint is not a
    /// file, [`AuditError::ReadEntrypoint`] when it cannot be read,
    /// [`AuditError::Compile`] when it does not parse and
    /// [`AuditError::Sandbox`] when the sandbox cannot be prepared.
    pub fn run_audit(
        &self,
        request: &AuditRequest,
        skill_dir: &Path,
    ) -> Result<AuditResult, AuditError> {
        let mut run = RunTracker::new(request.entrypoint());
        let result = self.run_tracked(&mut run, request, skill_dir);
        match &result {
            Ok(_) => run.advance(RunState::Completed),
            Err(error) => {
                warn!(target: RUNNER_TARGET, entrypoint = %run.entrypoint, %error, "audit aborted");
                run.advance(RunState::Failed);
            }
        }
        result
    }

    fn run_tracked(
        &self,
        run: &mut RunTracker,
        request: &AuditRequest,
        skill_dir: &Path,
    ) -> Result<AuditResult, AuditError> {
        run.advance(RunState::Loading);
        let entrypoint = skill_dir.join(request.entrypoint());
        if !entrypoint.is_file() {
            return Err(AuditError::EntrypointNotFound { path: entrypoint });
        }
        let source = fs::read_to_string(&entrypoint).map_err(|source| AuditError::ReadEntrypoint {
            path: entrypoint.clone(),
            source: Arc::new(source),
        })?;

        let ledger = LedgerHandle::new(Ledger::new());
        let context = ExecutionContext::new(self.profile(skill_dir), ledger).map_err(sandbox_error)?;
        let skill = context
            .compile(&chunk_name(&entrypoint), &source)
            .map_err(sandbox_error)?;

        run.advance(RunState::Executing);
        let timeout = request.timeout().unwrap_or(self.options.default_timeout);
        let outcome = context.execute(&skill, timeout);
        Ok(AuditResult::new(request.declared(), context.snapshot(), outcome))
    }

    fn profile(&self, skill_dir: &Path) -> SandboxProfile {
        let profile = SandboxProfile::new()
            .with_timer_cap(self.options.timer_cap)
            .with_working_dir(skill_dir);
        if self.options.allow_execution {
            profile.allow_execution()
        } else {
            profile
        }
    }
}

/// Tracks and logs state transitions for one run.
struct RunTracker {
    entrypoint: String,
    state: RunState,
}

impl RunTracker {
    fn new(entrypoint: &Path) -> Self {
        Self {
            entrypoint: entrypoint.display().to_string(),
            state: RunState::Idle,
        }
    }

    fn advance(&mut self, next: RunState) {
        debug!(
            target: RUNNER_TARGET,
            entrypoint = %self.entrypoint,
            from = %self.state,
            to = %next,
            "run state changed"
        );
        self.state = next;
    }
}

fn chunk_name(entrypoint: &Path) -> String {
    entrypoint
        .file_name()
        .map_or_else(|| entrypoint.display().to_string(), |name| name.to_string_lossy().into_owned())
}

fn sandbox_error(error: SandboxError) -> AuditError {
    match error {
        SandboxError::Compile { name, message } => AuditError::Compile { name, message },
        SandboxError::Setup { message } => AuditError::Sandbox { message },
    }
}
