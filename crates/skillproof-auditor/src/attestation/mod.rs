//! Attestation seam between audit results and proof generators.
//!
//! The auditor never produces proofs itself. It assembles an
//! [`AttestationRequest`] for a compliant run and hands it, together with the
//! caller's [`AuditorSecret`], to an [`AttestationGenerator`].

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use skillproof_permissions::PermissionMask;
use thiserror::Error;

/// Number of leading digest hex digits folded into the field element.
const FIELD_HEX_DIGITS: usize = 16;

/// Secret material supplied by the auditor operator.
///
/// The value never appears in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq)]
pub struct AuditorSecret(String);

impl AuditorSecret {
    /// Wraps secret material.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Returns the secret for use by a generator.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuditorSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuditorSecret(<redacted>)")
    }
}

/// Public inputs for one attestation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationRequest {
    skill_digest: String,
    skill_field: u64,
    nonce: u64,
    timestamp: u64,
    declared_mask: PermissionMask,
    observed_mask: PermissionMask,
    agent_id: String,
}

impl AttestationRequest {
    /// Builds a request for `source` with a fresh nonce and the current
    /// time.
    #[must_use]
    pub fn for_source(
        source: &str,
        declared_mask: PermissionMask,
        observed_mask: PermissionMask,
        agent_id: impl Into<String>,
    ) -> Self {
        let skill_digest = hex::encode(Sha256::digest(source.as_bytes()));
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_secs());
        Self {
            skill_field: field_element(&skill_digest),
            skill_digest,
            nonce: rand::random(),
            timestamp,
            declared_mask,
            observed_mask,
            agent_id: agent_id.into(),
        }
    }

    /// Returns the SHA-256 digest of the skill source as lowercase hex.
    #[must_use]
    pub fn skill_digest(&self) -> &str {
        &self.skill_digest
    }

    /// Returns the digest truncated to 64 bits.
    #[must_use]
    pub const fn skill_field(&self) -> u64 {
        self.skill_field
    }

    /// Returns the audit nonce.
    #[must_use]
    pub const fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Returns the audit time in unix seconds.
    #[must_use]
    pub const fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Returns the declared mask.
    #[must_use]
    pub const fn declared_mask(&self) -> PermissionMask {
        self.declared_mask
    }

    /// Returns the observed mask.
    #[must_use]
    pub const fn observed_mask(&self) -> PermissionMask {
        self.observed_mask
    }

    /// Returns the agent the skill belongs to.
    #[must_use]
    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }
}

/// Reads the leading hex digits of a digest as an integer.
fn field_element(digest: &str) -> u64 {
    digest
        .get(..FIELD_HEX_DIGITS)
        .and_then(|prefix| u64::from_str_radix(prefix, 16).ok())
        .unwrap_or_default()
}

/// A generated proof and its public signals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attestation {
    /// Generator-specific proof object.
    pub proof: serde_json::Value,
    /// Public signals, in the generator's order.
    pub public_signals: Vec<String>,
}

/// Failure reported by an attestation generator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct AttestationError {
    reason: String,
}

impl AttestationError {
    /// Creates an error with a human-readable reason.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Returns the reason.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Produces attestations for compliant audits.
pub trait AttestationGenerator {
    /// Generates an attestation for `request`.
    ///
    /// # Errors
    ///
    /// Returns [`AttestationError`] when no proof can be produced.
    fn generate(
        &self,
        request: &AttestationRequest,
        secret: &AuditorSecret,
    ) -> Result<Attestation, AttestationError>;
}

/// Whether an audit was attested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttestationOutcome {
    /// The generator produced an attestation.
    Attested(Attestation),
    /// No attestation was produced.
    Refused {
        /// Why the attestation was refused.
        reason: String,
    },
}

impl AttestationOutcome {
    /// Returns the attestation, if one was produced.
    #[must_use]
    pub const fn attestation(&self) -> Option<&Attestation> {
        match self {
            Self::Attested(attestation) => Some(attestation),
            Self::Refused { .. } => None,
        }
    }

    /// Returns the refusal reason, if any.
    #[must_use]
    pub fn refusal(&self) -> Option<&str> {
        match self {
            Self::Attested(_) => None,
            Self::Refused { reason } => Some(reason),
        }
    }
}

#[cfg(test)]
mod tests;
