//! Shared handle onto the run's ledger.

use std::cell::RefCell;
use std::rc::Rc;

use skillproof_permissions::{Capability, Ledger, LedgerSnapshot, PermissionMask};
use tracing::trace;

const RECORDER_TARGET: &str = "skillproof_sandbox::recorder";

/// Single-threaded handle through which facades write to the run's
/// [`Ledger`].
///
/// The handle is cloned into every facade of one execution context. It is
/// deliberately `!Send`: a ledger belongs to exactly one run on one thread.
#[derive(Debug, Clone, Default)]
pub struct LedgerHandle {
    inner: Rc<RefCell<Ledger>>,
}

impl LedgerHandle {
    /// Wraps a ledger for use by an execution context.
    #[must_use]
    pub fn new(ledger: Ledger) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ledger)),
        }
    }

    /// Records a capability attempt.
    pub fn record(&self, capability: Capability, facility: &str, operation: &str, args: Vec<String>) {
        trace!(
            target: RECORDER_TARGET,
            capability = capability.as_str(),
            facility,
            operation,
            "capability attempt recorded"
        );
        self.inner
            .borrow_mut()
            .record(capability, facility, operation, args);
    }

    /// Returns the observed mask so far.
    #[must_use]
    pub fn mask(&self) -> PermissionMask {
        self.inner.borrow().mask()
    }

    /// Returns the number of recorded entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    /// Returns `true` when nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }

    /// Copies the mask and log.
    #[must_use]
    pub fn snapshot(&self) -> LedgerSnapshot {
        self.inner.borrow().snapshot()
    }
}
