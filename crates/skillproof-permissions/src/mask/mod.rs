//! Bitmask representation of a capability set.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::capability::Capability;

/// A set of capabilities encoded as an unsigned byte.
///
/// Bit *i* set means the capability at position *i* is present. Declared masks
/// come from the manifest; observed masks are accumulated by the ledger.
///
/// # Example
///
/// ```
/// use skillproof_permissions::{Capability, PermissionMask};
///
/// let mask = PermissionMask::from_capabilities([Capability::FileRead, Capability::ShellExec]);
/// assert_eq!(mask.bits(), 17);
/// assert_eq!(mask.capabilities(), vec![Capability::FileRead, Capability::ShellExec]);
/// assert!(PermissionMask::EMPTY.is_subset_of(mask));
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PermissionMask(u8);

impl PermissionMask {
    /// The mask with no capabilities.
    pub const EMPTY: Self = Self(0);

    /// Wraps raw mask bits.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Returns the raw mask bits.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Builds a mask from an iterator of enabled capabilities.
    #[must_use]
    pub fn from_capabilities(capabilities: impl IntoIterator<Item = Capability>) -> Self {
        capabilities
            .into_iter()
            .fold(Self::EMPTY, |mask, capability| mask.with(capability))
    }

    /// Builds a mask from a name-to-flag mapping, keeping only enabled entries.
    #[must_use]
    pub fn from_flags(flags: &BTreeMap<Capability, bool>) -> Self {
        Self::from_capabilities(
            flags
                .iter()
                .filter(|(_, enabled)| **enabled)
                .map(|(capability, _)| *capability),
        )
    }

    /// Expands the mask into a flag for every capability in the catalogue.
    #[must_use]
    pub fn to_flags(self) -> BTreeMap<Capability, bool> {
        Capability::ALL
            .into_iter()
            .map(|capability| (capability, self.contains(capability)))
            .collect()
    }

    /// Returns the enabled capabilities in bit order.
    #[must_use]
    pub fn capabilities(self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|capability| self.contains(*capability))
            .collect()
    }

    /// Returns `true` when `capability` is present.
    #[must_use]
    pub const fn contains(self, capability: Capability) -> bool {
        self.0 & capability.mask_bit() != 0
    }

    /// Returns a copy of the mask with `capability` added.
    #[must_use]
    pub const fn with(self, capability: Capability) -> Self {
        Self(self.0 | capability.mask_bit())
    }

    /// Adds `capability` in place. Bits are never cleared.
    pub const fn insert(&mut self, capability: Capability) {
        self.0 |= capability.mask_bit();
    }

    /// Returns `true` when every bit of `self` is also set in `declared`.
    #[must_use]
    pub const fn is_subset_of(self, declared: Self) -> bool {
        self.0 & !declared.0 == 0
    }

    /// Returns the bits of `self` that `declared` does not cover.
    #[must_use]
    pub const fn excess_over(self, declared: Self) -> Self {
        Self(self.0 & !declared.0)
    }

    /// Returns `true` when no capability is present.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl From<u8> for PermissionMask {
    fn from(bits: u8) -> Self {
        Self(bits)
    }
}

impl From<PermissionMask> for u8 {
    fn from(mask: PermissionMask) -> Self {
        mask.0
    }
}

impl std::fmt::Display for PermissionMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
