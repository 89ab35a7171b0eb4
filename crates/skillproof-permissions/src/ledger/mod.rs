//! Append-only record of capability use during one sandboxed run.
//!
//! A [`Ledger`] belongs to exactly one run. Every intercepted call appends an
//! [`AuditLogEntry`] and ORs its capability into the running mask; entries
//! are never mutated, merged or deduplicated.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::capability::Capability;
use crate::mask::PermissionMask;

/// One intercepted capability attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    timestamp_ms: u64,
    capability: Capability,
    facility: String,
    operation: String,
    args: Vec<String>,
}

impl AuditLogEntry {
    /// Milliseconds since the Unix epoch when the attempt was recorded.
    #[must_use]
    pub const fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }

    /// Capability the attempt exercised.
    #[must_use]
    pub const fn capability(&self) -> Capability {
        self.capability
    }

    /// Intercepted facility, e.g. `fs` or `child_process`.
    #[must_use]
    pub const fn facility(&self) -> &str {
        self.facility.as_str()
    }

    /// Operation invoked on the facility.
    #[must_use]
    pub const fn operation(&self) -> &str {
        self.operation.as_str()
    }

    /// Best-effort string rendering of the call arguments.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

/// Point-in-time copy of a ledger's mask and entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Observed mask at snapshot time.
    pub mask: PermissionMask,
    /// Entries in the order they were recorded.
    pub entries: Vec<AuditLogEntry>,
}

/// Observation log plus running capability mask for a single run.
///
/// # Example
///
/// ```
/// use skillproof_permissions::{Capability, Ledger};
///
/// let mut ledger = Ledger::new();
/// ledger.record(Capability::EnvAccess, "process", "env.HOME", vec![]);
/// ledger.record(Capability::EnvAccess, "process", "env.HOME", vec![]);
///
/// assert_eq!(ledger.log().len(), 2);
/// assert_eq!(ledger.mask().bits(), 1 << 5);
/// ```
#[derive(Debug, Default)]
pub struct Ledger {
    mask: PermissionMask,
    entries: Vec<AuditLogEntry>,
}

impl Ledger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a capability attempt stamped with the current wall-clock time.
    pub fn record(
        &mut self,
        capability: Capability,
        facility: impl Into<String>,
        operation: impl Into<String>,
        args: Vec<String>,
    ) {
        self.mask.insert(capability);
        self.entries.push(AuditLogEntry {
            timestamp_ms: now_ms(),
            capability,
            facility: facility.into(),
            operation: operation.into(),
            args,
        });
    }

    /// Returns the observed mask so far.
    #[must_use]
    pub const fn mask(&self) -> PermissionMask {
        self.mask
    }

    /// Returns a copy of the recorded entries in occurrence order.
    #[must_use]
    pub fn log(&self) -> Vec<AuditLogEntry> {
        self.entries.clone()
    }

    /// Returns the number of recorded entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copies the mask and entries.
    #[must_use]
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            mask: self.mask,
            entries: self.log(),
        }
    }

    /// Clears the mask and the log.
    ///
    /// Only needed when a ledger is reused across runs; the reset must happen
    /// before the next run records anything.
    pub fn reset(&mut self) {
        self.mask = PermissionMask::EMPTY;
        self.entries.clear();
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests;
