//! Unit tests for audit result construction.

use rstest::rstest;
use skillproof_permissions::{Capability, Ledger};

use super::*;

fn snapshot_with(capabilities: &[Capability]) -> LedgerSnapshot {
    let mut ledger = Ledger::new();
    for capability in capabilities {
        ledger.record(*capability, "facility", "operation", Vec::new());
    }
    ledger.snapshot()
}

#[rstest]
#[case(&[], &[], true)]
#[case(&[Capability::FileRead], &[Capability::FileRead], true)]
#[case(&[Capability::FileRead, Capability::NetworkRead], &[Capability::NetworkRead], true)]
#[case(&[Capability::FileRead], &[Capability::FileRead, Capability::FileWrite], false)]
#[case(&[], &[Capability::EnvAccess], false)]
fn compliance_follows_subset_rule(
    #[case] declared: &[Capability],
    #[case] observed: &[Capability],
    #[case] compliant: bool,
) {
    let declared_mask = PermissionMask::from_capabilities(declared.iter().copied());
    let result = AuditResult::new(
        declared_mask,
        snapshot_with(observed),
        ExecutionOutcome::Completed,
    );
    assert_eq!(result.is_compliant(), compliant);
    assert_eq!(result.undeclared().is_empty(), compliant);
    assert_eq!(result.log().len(), observed.len());
}

#[test]
fn undeclared_lists_excess_bits() {
    let result = AuditResult::new(
        PermissionMask::from_capabilities([Capability::FileRead]),
        snapshot_with(&[Capability::FileRead, Capability::FileWrite, Capability::ShellExec]),
        ExecutionOutcome::Completed,
    );
    assert_eq!(
        result.undeclared().capabilities(),
        [Capability::FileWrite, Capability::ShellExec]
    );
}

#[test]
fn serialises_with_camel_case_keys() {
    let result = AuditResult::new(
        PermissionMask::EMPTY,
        snapshot_with(&[]),
        ExecutionOutcome::TimedOut { timeout_ms: 100 },
    );
    let json = serde_json::to_value(&result).expect("serialise");
    assert_eq!(json["declaredMask"], 0);
    assert_eq!(json["observedMask"], 0);
    assert_eq!(json["compliant"], true);
    assert_eq!(json["outcome"]["status"], "timed_out");
    assert_eq!(json["outcome"]["timeout_ms"], 100);
}
