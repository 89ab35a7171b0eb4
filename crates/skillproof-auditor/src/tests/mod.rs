//! Crate-level tests for the auditor.

pub(crate) mod support;
