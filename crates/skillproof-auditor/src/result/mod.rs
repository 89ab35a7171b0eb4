//! Audit result record.

use serde::Serialize;
use skillproof_permissions::{AuditLogEntry, LedgerSnapshot, PermissionMask};
use skillproof_sandbox::ExecutionOutcome;

/// Evidence produced by one audit run.
///
/// Constructed once per run and immutable afterwards. `compliant` holds
/// exactly when every observed capability was declared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditResult {
    declared_mask: PermissionMask,
    observed_mask: PermissionMask,
    compliant: bool,
    log: Vec<AuditLogEntry>,
    outcome: ExecutionOutcome,
}

impl AuditResult {
    /// Builds a result from the declared mask and the run's final ledger
    /// state.
    #[must_use]
    pub fn new(declared: PermissionMask, snapshot: LedgerSnapshot, outcome: ExecutionOutcome) -> Self {
        Self {
            declared_mask: declared,
            observed_mask: snapshot.mask,
            compliant: snapshot.mask.is_subset_of(declared),
            log: snapshot.entries,
            outcome,
        }
    }

    /// Returns the capabilities the manifest declared.
    #[must_use]
    pub const fn declared_mask(&self) -> PermissionMask {
        self.declared_mask
    }

    /// Returns the capabilities the skill exercised.
    #[must_use]
    pub const fn observed_mask(&self) -> PermissionMask {
        self.observed_mask
    }

    /// Returns `true` when observed capabilities stay within the declared
    /// set.
    #[must_use]
    pub const fn is_compliant(&self) -> bool {
        self.compliant
    }

    /// Returns the capabilities exercised without being declared.
    #[must_use]
    pub const fn undeclared(&self) -> PermissionMask {
        self.observed_mask.excess_over(self.declared_mask)
    }

    /// Returns the ordered audit log.
    #[must_use]
    pub fn log(&self) -> &[AuditLogEntry] {
        &self.log
    }

    /// Returns how the skill's execution ended.
    #[must_use]
    pub const fn outcome(&self) -> &ExecutionOutcome {
        &self.outcome
    }
}

#[cfg(test)]
mod tests;
