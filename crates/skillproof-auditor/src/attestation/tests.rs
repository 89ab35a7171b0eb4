//! Unit tests for attestation inputs.

use rstest::rstest;
use skillproof_permissions::Capability;

use super::*;

// SHA-256 of the empty string.
const EMPTY_DIGEST: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

#[test]
fn digest_and_field_element_follow_source() {
    let request = AttestationRequest::for_source(
        "",
        PermissionMask::EMPTY,
        PermissionMask::EMPTY,
        "agent",
    );
    assert_eq!(request.skill_digest(), EMPTY_DIGEST);
    assert_eq!(request.skill_field(), 0xe3b0_c442_98fc_1c14);
}

#[rstest]
#[case("ffffffffffffffff00", u64::MAX)]
#[case("0000000000000001", 1)]
#[case("abc", 0)]
#[case("zzzzzzzzzzzzzzzz", 0)]
fn field_element_reads_leading_hex(#[case] digest: &str, #[case] expected: u64) {
    assert_eq!(field_element(digest), expected);
}

#[test]
fn request_carries_masks_agent_and_time() {
    let declared = PermissionMask::from_capabilities([Capability::FileRead]);
    let request = AttestationRequest::for_source("print(1)", declared, PermissionMask::EMPTY, "agent-9");

    assert_eq!(request.declared_mask(), declared);
    assert_eq!(request.observed_mask(), PermissionMask::EMPTY);
    assert_eq!(request.agent_id(), "agent-9");
    assert!(request.timestamp() > 1_600_000_000);
}

#[test]
fn nonces_differ_between_requests() {
    let first = AttestationRequest::for_source("x", PermissionMask::EMPTY, PermissionMask::EMPTY, "a");
    let second = AttestationRequest::for_source("x", PermissionMask::EMPTY, PermissionMask::EMPTY, "a");
    assert_eq!(first.skill_digest(), second.skill_digest());
    assert_ne!(first.nonce(), second.nonce());
}

#[test]
fn secret_debug_is_redacted() {
    let secret = AuditorSecret::new("hunter2");
    assert_eq!(format!("{secret:?}"), "AuditorSecret(<redacted>)");
    assert_eq!(secret.expose(), "hunter2");
}

#[test]
fn outcome_accessors_match_variant() {
    let attested = AttestationOutcome::Attested(Attestation {
        proof: serde_json::json!({ "pi_a": [] }),
        public_signals: vec![String::from("1")],
    });
    assert!(attested.attestation().is_some());
    assert_eq!(attested.refusal(), None);

    let refused = AttestationOutcome::Refused {
        reason: String::from("no"),
    };
    assert!(refused.attestation().is_none());
    assert_eq!(refused.refusal(), Some("no"));
}

#[test]
fn refused_outcome_serialises_with_status_tag() {
    let refused = AttestationOutcome::Refused {
        reason: String::from("no"),
    };
    let json = serde_json::to_value(&refused).expect("serialise");
    assert_eq!(json, serde_json::json!({ "status": "refused", "reason": "no" }));
}
