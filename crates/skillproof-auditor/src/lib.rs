//! Skill auditing: run a skill in the sandbox and compare what it did with
//! what its manifest declared.
//!
//! [`SandboxRunner::run_audit`] is the core operation. It resolves the
//! skill's entrypoint, compiles it, runs it in a fresh
//! [`skillproof_sandbox::ExecutionContext`] and returns an [`AuditResult`]
//! holding the declared mask, observed mask, compliance verdict, ordered
//! audit log and execution outcome. Only a missing entrypoint, an unreadable
//! or malformed source, or a sandbox setup failure is an error; anything the
//! skill does once it runs is reported in the result.
//!
//! [`SkillAuditor`] wraps the runner with manifest loading and an optional
//! [`AttestationGenerator`] for compliant runs.
//!
//! ```no_run
//! use std::path::Path;
//!
//! use skillproof_auditor::{RunnerOptions, SandboxRunner, SkillManifest, AuditRequest};
//!
//! # fn main() -> Result<(), skillproof_auditor::AuditError> {
//! let manifest = SkillManifest::load(Path::new("skills/weather/skill.json"))?;
//! let runner = SandboxRunner::new(RunnerOptions::default());
//! let result = runner.run_audit(
//!     &AuditRequest::from_manifest(&manifest),
//!     Path::new("skills/weather"),
//! )?;
//! println!("compliant: {}", result.is_compliant());
//! # Ok(()) }
//! ```

mod attestation;
mod auditor;
mod error;
mod manifest;
mod result;
mod runner;
pub mod telemetry;

pub use attestation::{
    Attestation, AttestationError, AttestationGenerator, AttestationOutcome, AttestationRequest,
    AuditorSecret,
};
pub use auditor::{AttestedAudit, SkillAuditor};
pub use error::AuditError;
pub use manifest::SkillManifest;
pub use result::AuditResult;
pub use runner::{AuditRequest, DEFAULT_TIMEOUT, RunState, RunnerOptions, SandboxRunner};

#[cfg(test)]
mod tests;
