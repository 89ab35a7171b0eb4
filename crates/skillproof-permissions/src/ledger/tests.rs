//! Unit tests for the observation ledger.

use rstest::{fixture, rstest};

use super::*;

#[fixture]
fn ledger() -> Ledger {
    Ledger::new()
}

#[rstest]
fn new_ledger_is_empty(ledger: Ledger) {
    assert!(ledger.is_empty());
    assert_eq!(ledger.mask(), PermissionMask::EMPTY);
    assert!(ledger.log().is_empty());
}

#[rstest]
fn record_sets_bit_and_appends_entry(mut ledger: Ledger) {
    ledger.record(
        Capability::FileRead,
        "fs",
        "read_file",
        vec!["config.json".into()],
    );

    assert_eq!(ledger.mask().bits(), 1);
    let log = ledger.log();
    assert_eq!(log.len(), 1);
    let entry = log.first().expect("one entry");
    assert_eq!(entry.capability(), Capability::FileRead);
    assert_eq!(entry.facility(), "fs");
    assert_eq!(entry.operation(), "read_file");
    assert_eq!(entry.args(), &["config.json"]);
    assert!(entry.timestamp_ms() > 0);
}

#[rstest]
fn repeated_calls_are_not_deduplicated(mut ledger: Ledger) {
    for _ in 0..3 {
        ledger.record(Capability::CryptoOps, "crypto", "create_hash", vec![]);
    }
    assert_eq!(ledger.len(), 3);
    assert_eq!(ledger.mask().bits(), 1 << 6);
}

#[rstest]
fn mask_is_monotonic_across_entries(mut ledger: Ledger) {
    let sequence = [
        Capability::SystemInfo,
        Capability::FileRead,
        Capability::SystemInfo,
        Capability::NetworkWrite,
        Capability::FileRead,
    ];
    let mut previous = PermissionMask::EMPTY;
    for capability in sequence {
        ledger.record(capability, "facility", "op", vec![]);
        let current = ledger.mask();
        assert!(previous.is_subset_of(current), "mask lost bits");
        assert!(current.contains(capability));
        previous = current;
    }
    let order: Vec<Capability> = ledger.log().iter().map(AuditLogEntry::capability).collect();
    assert_eq!(order, sequence);
}

#[rstest]
fn log_is_a_defensive_copy(mut ledger: Ledger) {
    ledger.record(Capability::FileWrite, "fs", "write_file", vec![]);
    let mut copy = ledger.log();
    copy.clear();
    assert_eq!(ledger.len(), 1);
}

#[rstest]
fn reset_clears_everything(mut ledger: Ledger) {
    ledger.record(Capability::ShellExec, "child_process", "exec", vec!["ls".into()]);
    ledger.reset();
    assert!(ledger.is_empty());
    assert_eq!(ledger.mask(), PermissionMask::EMPTY);

    ledger.record(Capability::FileRead, "fs", "stat", vec![]);
    assert_eq!(ledger.mask().bits(), 1);
}

#[rstest]
fn snapshot_matches_ledger(mut ledger: Ledger) {
    ledger.record(Capability::EnvAccess, "process", "env.PATH", vec![]);
    let snapshot = ledger.snapshot();
    assert_eq!(snapshot.mask, ledger.mask());
    assert_eq!(snapshot.entries, ledger.log());
}

#[rstest]
fn entries_serialise_with_camel_case_keys(mut ledger: Ledger) {
    ledger.record(Capability::FileRead, "fs", "read_file", vec!["a".into()]);
    let json = serde_json::to_value(ledger.log()).expect("serialise");
    let entry = json.get(0).expect("entry");
    assert_eq!(entry.get("capability").and_then(|v| v.as_str()), Some("FILE_READ"));
    assert_eq!(entry.get("facility").and_then(|v| v.as_str()), Some("fs"));
    assert!(entry.get("timestampMs").is_some());
}
