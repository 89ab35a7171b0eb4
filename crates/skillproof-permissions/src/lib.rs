//! Capability taxonomy and observation ledger for skill audits.
//!
//! The `skillproof-permissions` crate defines the closed catalogue of eight
//! sensitive [`Capability`] values, the [`PermissionMask`] bitmask used on the
//! wire between the manifest validator, the auditor and the attestation
//! generator, and the append-only [`Ledger`] that records every intercepted
//! capability attempt during one sandboxed run.
//!
//! Bit positions are part of the wire contract:
//!
//! | Bit | Capability |
//! |---|---|
//! | 0 | `FILE_READ` |
//! | 1 | `FILE_WRITE` |
//! | 2 | `NETWORK_READ` |
//! | 3 | `NETWORK_WRITE` |
//! | 4 | `SHELL_EXEC` |
//! | 5 | `ENV_ACCESS` |
//! | 6 | `CRYPTO_OPS` |
//! | 7 | `SYSTEM_INFO` |
//!
//! ```
//! use skillproof_permissions::{Capability, Ledger, PermissionMask};
//!
//! let declared = PermissionMask::from_capabilities([Capability::FileRead]);
//!
//! let mut ledger = Ledger::new();
//! ledger.record(Capability::FileRead, "fs", "read_file", vec!["data.txt".into()]);
//! assert!(ledger.mask().is_subset_of(declared));
//!
//! ledger.record(Capability::ShellExec, "child_process", "exec", vec![]);
//! assert!(!ledger.mask().is_subset_of(declared));
//! assert_eq!(ledger.mask().bits(), 0b1_0001);
//! ```

pub mod capability;
pub mod ledger;
pub mod mask;

pub use self::capability::{Capability, UnknownCapability};
pub use self::ledger::{AuditLogEntry, Ledger, LedgerSnapshot};
pub use self::mask::PermissionMask;
