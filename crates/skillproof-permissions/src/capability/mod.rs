//! The closed catalogue of sensitive capabilities.
//!
//! Exactly eight capabilities exist and each owns a fixed bit position. The
//! set is not extensible at runtime; adding a capability is a taxonomy
//! version change.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A sensitive host capability that a skill may be permitted to use.
///
/// # Example
///
/// ```
/// use skillproof_permissions::Capability;
///
/// let capability: Capability = "SHELL_EXEC".parse().unwrap();
/// assert_eq!(capability, Capability::ShellExec);
/// assert_eq!(capability.bit(), 4);
/// assert_eq!(capability.as_str(), "SHELL_EXEC");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Capability {
    /// Reading, listing or inspecting files.
    #[serde(rename = "FILE_READ")]
    FileRead,
    /// Creating, modifying, moving or deleting files.
    #[serde(rename = "FILE_WRITE")]
    FileWrite,
    /// Fetching data over the network and name resolution.
    #[serde(rename = "NETWORK_READ")]
    NetworkRead,
    /// Sending requests, opening connections or listening sockets.
    #[serde(rename = "NETWORK_WRITE")]
    NetworkWrite,
    /// Spawning or executing processes.
    #[serde(rename = "SHELL_EXEC")]
    ShellExec,
    /// Reading environment variables.
    #[serde(rename = "ENV_ACCESS")]
    EnvAccess,
    /// Using cryptographic primitives.
    #[serde(rename = "CRYPTO_OPS")]
    CryptoOps,
    /// Introspecting the host system.
    #[serde(rename = "SYSTEM_INFO")]
    SystemInfo,
}

impl Capability {
    /// Every capability, ordered by bit position.
    pub const ALL: [Self; 8] = [
        Self::FileRead,
        Self::FileWrite,
        Self::NetworkRead,
        Self::NetworkWrite,
        Self::ShellExec,
        Self::EnvAccess,
        Self::CryptoOps,
        Self::SystemInfo,
    ];

    /// Returns the stable bit position of this capability.
    #[must_use]
    pub const fn bit(self) -> u8 {
        match self {
            Self::FileRead => 0,
            Self::FileWrite => 1,
            Self::NetworkRead => 2,
            Self::NetworkWrite => 3,
            Self::ShellExec => 4,
            Self::EnvAccess => 5,
            Self::CryptoOps => 6,
            Self::SystemInfo => 7,
        }
    }

    /// Returns the single-bit mask value for this capability.
    #[must_use]
    pub const fn mask_bit(self) -> u8 {
        1 << self.bit()
    }

    /// Returns the canonical wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FileRead => "FILE_READ",
            Self::FileWrite => "FILE_WRITE",
            Self::NetworkRead => "NETWORK_READ",
            Self::NetworkWrite => "NETWORK_WRITE",
            Self::ShellExec => "SHELL_EXEC",
            Self::EnvAccess => "ENV_ACCESS",
            Self::CryptoOps => "CRYPTO_OPS",
            Self::SystemInfo => "SYSTEM_INFO",
        }
    }

    /// Returns the capability occupying `bit`, if any.
    #[must_use]
    pub fn from_bit(bit: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|capability| capability.bit() == bit)
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a capability name is not part of the catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown capability '{name}'")]
pub struct UnknownCapability {
    /// Name that failed to resolve.
    pub name: String,
}

impl FromStr for Capability {
    type Err = UnknownCapability;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|capability| capability.as_str() == value)
            .ok_or_else(|| UnknownCapability {
                name: value.to_owned(),
            })
    }
}
