//! Skill auditor facade.

use std::fs;
use std::path::Path;

use serde::Serialize;
use skillproof_config::Config;
use tracing::{info, warn};

use crate::attestation::{
    AttestationGenerator, AttestationOutcome, AttestationRequest, AuditorSecret,
};
use crate::error::AuditError;
use crate::manifest::SkillManifest;
use crate::result::AuditResult;
use crate::runner::{AuditRequest, RunnerOptions, SandboxRunner};
use crate::telemetry::{self, TelemetryError};

const AUDITOR_TARGET: &str = "skillproof_auditor::auditor";

/// An audit result together with its attestation outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestedAudit {
    /// What the skill was observed doing.
    pub result: AuditResult,
    /// Whether the run was attested.
    pub attestation: AttestationOutcome,
}

/// Audits skills described by manifest files and optionally attests
/// compliant runs.
#[derive(Debug, Clone)]
pub struct SkillAuditor<G> {
    runner: SandboxRunner,
    generator: G,
}

impl<G: AttestationGenerator> SkillAuditor<G> {
    /// Creates an auditor over `runner` that attests with `generator`.
    #[must_use]
    pub const fn new(runner: SandboxRunner, generator: G) -> Self {
        Self { runner, generator }
    }

    /// Builds an auditor from resolved configuration, installing the audit
    /// log subscriber first.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError`] when the configured log filter is malformed
    /// or another global subscriber is already installed.
    pub fn from_config(config: &Config, generator: G) -> Result<Self, TelemetryError> {
        telemetry::initialise(config)?;
        Ok(Self::new(
            SandboxRunner::new(RunnerOptions::from_config(config)),
            generator,
        ))
    }

    /// Returns the runner.
    #[must_use]
    pub const fn runner(&self) -> &SandboxRunner {
        &self.runner
    }

    /// Loads the manifest at `manifest_path` and audits its skill. The
    /// manifest's directory is the skill directory.
    ///
    /// # Errors
    ///
    /// Returns any manifest error, or a runner error raised before the skill
    /// executes.
    pub fn audit(&self, manifest_path: &Path) -> Result<AuditResult, AuditError> {
        let manifest = SkillManifest::load(manifest_path)?;
        self.audit_manifest(&manifest, skill_dir(manifest_path))
    }

    /// Audits an already loaded manifest against `skill_dir`.
    ///
    /// # Errors
    ///
    /// Returns a runner error raised before the skill executes.
    pub fn audit_manifest(
        &self,
        manifest: &SkillManifest,
        skill_dir: &Path,
    ) -> Result<AuditResult, AuditError> {
        let span = telemetry::audit_span(manifest);
        let _entered = span.enter();
        let result = self
            .runner
            .run_audit(&AuditRequest::from_manifest(manifest), skill_dir)?;
        telemetry::record_verdict(&span, &result);
        info!(
            target: AUDITOR_TARGET,
            entries = result.log().len(),
            "skill audited"
        );
        Ok(result)
    }

    /// Audits the skill and, when it is compliant, asks the generator for
    /// an attestation.
    ///
    /// Non-compliance and generator failures are reported through
    /// [`AttestationOutcome::Refused`], not as errors.
    ///
    /// # Errors
    ///
    /// See [`SkillAuditor::audit`].
    pub fn audit_and_attest(
        &self,
        manifest_path: &Path,
        secret: &AuditorSecret,
    ) -> Result<AttestedAudit, AuditError> {
        let manifest = SkillManifest::load(manifest_path)?;
        let skill_dir = skill_dir(manifest_path);
        let result = self.audit_manifest(&manifest, skill_dir)?;

        if !result.is_compliant() {
            let reason = format!(
                "skill is non-compliant: observed permissions ({}) exceed declared permissions ({})",
                result.observed_mask().bits(),
                result.declared_mask().bits()
            );
            warn!(target: AUDITOR_TARGET, skill = manifest.name(), %reason, "attestation refused");
            return Ok(AttestedAudit {
                result,
                attestation: AttestationOutcome::Refused { reason },
            });
        }

        let attestation = match self.attest(&manifest, skill_dir, &result, secret) {
            Ok(outcome) => outcome,
            Err(reason) => {
                warn!(target: AUDITOR_TARGET, skill = manifest.name(), %reason, "attestation failed");
                AttestationOutcome::Refused {
                    reason: format!("failed to generate attestation: {reason}"),
                }
            }
        };
        Ok(AttestedAudit {
            result,
            attestation,
        })
    }

    fn attest(
        &self,
        manifest: &SkillManifest,
        skill_dir: &Path,
        result: &AuditResult,
        secret: &AuditorSecret,
    ) -> Result<AttestationOutcome, String> {
        let entrypoint = skill_dir.join(manifest.entrypoint());
        let source = fs::read_to_string(&entrypoint).map_err(|error| error.to_string())?;
        let request = AttestationRequest::for_source(
            &source,
            result.declared_mask(),
            result.observed_mask(),
            manifest.agent_id(),
        );
        let attestation = self
            .generator
            .generate(&request, secret)
            .map_err(|error| error.to_string())?;
        info!(target: AUDITOR_TARGET, skill = manifest.name(), "skill attested");
        Ok(AttestationOutcome::Attested(attestation))
    }
}

/// Returns the directory holding `manifest_path`.
fn skill_dir(manifest_path: &Path) -> &Path {
    manifest_path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}
