//! Domain errors raised by audit runs.
//!
//! Only failures that prevent a skill from running surface here. Anything
//! that happens once skill code executes is folded into the audit result's
//! outcome instead. I/O errors are wrapped in `Arc` to satisfy the
//! `result_large_err` Clippy lint.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Errors arising before a skill executes.
#[derive(Debug, Clone, Error)]
pub enum AuditError {
    /// The manifest file does not exist.
    #[error("manifest not found: {}", path.display())]
    ManifestNotFound {
        /// Path that was checked.
        path: PathBuf,
    },

    /// The manifest file exists but could not be read.
    #[error("failed to read manifest {}: {source}", path.display())]
    ManifestRead {
        /// Manifest path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The manifest is not well-formed JSON for the manifest schema.
    #[error("failed to parse manifest {}: {message}", path.display())]
    ManifestParse {
        /// Manifest path.
        path: PathBuf,
        /// Parser diagnostic.
        message: String,
    },

    /// The manifest parsed but violates one or more schema rules.
    #[error("invalid manifest: {}", errors.join("; "))]
    ManifestInvalid {
        /// Every rule violation found.
        errors: Vec<String>,
    },

    /// The resolved entrypoint file does not exist.
    #[error("entrypoint not found: {}", path.display())]
    EntrypointNotFound {
        /// Resolved entrypoint path.
        path: PathBuf,
    },

    /// The entrypoint exists but could not be read.
    #[error("failed to read entrypoint {}: {source}", path.display())]
    ReadEntrypoint {
        /// Resolved entrypoint path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The skill source failed to compile.
    #[error("skill '{name}' failed to compile: {message}")]
    Compile {
        /// Entrypoint file name.
        name: String,
        /// Parser diagnostic.
        message: String,
    },

    /// The sandbox could not be prepared.
    #[error("sandbox setup failed: {message}")]
    Sandbox {
        /// Description of the failure.
        message: String,
    },
}

impl AuditError {
    /// Returns `true` for failures caused by the skill source rather than the
    /// manifest or host.
    #[must_use]
    pub const fn is_skill_fault(&self) -> bool {
        matches!(self, Self::EntrypointNotFound { .. } | Self::Compile { .. })
    }
}
