//! Sandbox policy definition and builder helpers.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Upper bound applied to every timer delay a skill requests.
pub const DEFAULT_TIMER_CAP: Duration = Duration::from_secs(5);

/// Whether intercepted calls may reach a real implementation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ExecutionPolicy {
    /// Record the call and return a stub value.
    #[default]
    StubOnly,
    /// Record the call, then forward it when a real implementation exists.
    Forward,
}

impl ExecutionPolicy {
    /// Returns true when intercepted calls forward to real implementations.
    #[must_use]
    pub const fn is_forwarding(self) -> bool {
        matches!(self, Self::Forward)
    }
}

/// Fabricated host identity shown to skill code through `process`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxIdentity {
    /// Reported platform name.
    pub platform: String,
    /// Reported CPU architecture.
    pub arch: String,
    /// Reported process id.
    pub pid: u32,
    /// Reported working directory.
    pub cwd: String,
    /// Reported runtime version.
    pub version: String,
}

impl Default for SandboxIdentity {
    fn default() -> Self {
        Self {
            platform: String::from("sandbox"),
            arch: String::from("sandbox"),
            pid: 0,
            cwd: String::from("/sandbox"),
            version: String::from("sandbox"),
        }
    }
}

/// Declarative description of how a skill run is sandboxed.
///
/// The profile defaults to stub-only interception, a five second timer cap,
/// the current directory as the skill directory, and a fabricated identity.
///
/// ```
/// use std::time::Duration;
///
/// use skillproof_sandbox::SandboxProfile;
///
/// let profile = SandboxProfile::new()
///     .with_timer_cap(Duration::from_millis(250))
///     .with_working_dir("/srv/skills/weather");
/// assert!(!profile.execution_policy().is_forwarding());
/// assert_eq!(profile.timer_cap(), Duration::from_millis(250));
/// ```
#[derive(Debug, Clone)]
pub struct SandboxProfile {
    execution: ExecutionPolicy,
    timer_cap: Duration,
    working_dir: PathBuf,
    identity: SandboxIdentity,
}

impl SandboxProfile {
    /// Creates the default, stub-only profile.
    #[must_use]
    pub fn new() -> Self {
        Self {
            execution: ExecutionPolicy::default(),
            timer_cap: DEFAULT_TIMER_CAP,
            working_dir: PathBuf::from("."),
            identity: SandboxIdentity::default(),
        }
    }

    /// Forwards intercepted calls to real implementations where available.
    #[must_use]
    pub fn allow_execution(mut self) -> Self {
        self.execution = ExecutionPolicy::Forward;
        self
    }

    /// Caps the delay of every timer the skill schedules.
    #[must_use]
    pub fn with_timer_cap(mut self, cap: Duration) -> Self {
        self.timer_cap = cap;
        self
    }

    /// Sets the directory relative file paths resolve against when
    /// forwarding.
    #[must_use]
    pub fn with_working_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_dir = path.into();
        self
    }

    /// Replaces the fabricated identity.
    #[must_use]
    pub fn with_identity(mut self, identity: SandboxIdentity) -> Self {
        self.identity = identity;
        self
    }

    /// Returns the execution policy.
    #[must_use]
    pub const fn execution_policy(&self) -> ExecutionPolicy {
        self.execution
    }

    /// Returns the timer cap.
    #[must_use]
    pub const fn timer_cap(&self) -> Duration {
        self.timer_cap
    }

    /// Returns the skill directory.
    #[must_use]
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Returns the fabricated identity.
    #[must_use]
    pub const fn identity(&self) -> &SandboxIdentity {
        &self.identity
    }
}

impl Default for SandboxProfile {
    fn default() -> Self {
        Self::new()
    }
}
