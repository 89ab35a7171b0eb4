//! Unit tests for manifest parsing and validation.

use std::fs;

use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::*;

#[fixture]
fn valid_json() -> String {
    String::from(
        r#"{
            "name": "weather",
            "version": "1.2.0",
            "agentId": "agent-7",
            "entrypoint": "index.lua",
            "permissions": { "NETWORK_READ": true, "FILE_READ": false },
            "timeout": 2000
        }"#,
    )
}

#[rstest]
fn parses_camel_case_manifest(valid_json: String) {
    let manifest = SkillManifest::from_json(&valid_json).expect("valid manifest");
    assert_eq!(manifest.name(), "weather");
    assert_eq!(manifest.agent_id(), "agent-7");
    assert_eq!(manifest.entrypoint(), Path::new("index.lua"));
    assert_eq!(manifest.declared_mask(), PermissionMask::from_capabilities([Capability::NetworkRead]));
    assert_eq!(manifest.timeout(), Some(Duration::from_millis(2000)));
}

fn violations_of(text: &str) -> Vec<String> {
    match SkillManifest::from_json(text) {
        Err(AuditError::ManifestInvalid { errors }) => errors,
        other => panic!("expected schema violations, got {other:?}"),
    }
}

#[test]
fn timeout_is_optional() {
    let manifest = SkillManifest::from_json(
        r#"{"name":"noop","version":"0.1.0","agentId":"a","entrypoint":"main.lua","permissions":{}}"#,
    )
    .expect("valid manifest");
    assert!(manifest.declared_mask().is_empty());
    assert_eq!(manifest.timeout(), None);
}

#[test]
fn missing_permissions_is_a_violation() {
    let errors = violations_of(
        r#"{"name":"noop","version":"0.1.0","agentId":"a","entrypoint":"main.lua"}"#,
    );
    assert_eq!(errors, vec![String::from("missing required field 'permissions'")]);
}

#[test]
fn unknown_keys_are_violations() {
    let errors = violations_of(
        r#"{"name":"x","version":"1.0.0","agentId":"a","entrypoint":"m.lua","permissions":{},"author":"eve"}"#,
    );
    assert_eq!(errors, vec![String::from("unknown field 'author'")]);
}

#[test]
fn type_and_content_violations_are_reported_together() {
    let errors = violations_of(
        r#"{"name":"","version":"x","agentId":"a","entrypoint":"m.lua","permissions":{"FILE_READ":"yes"}}"#,
    );
    assert_eq!(errors.len(), 3, "unexpected violations: {errors:?}");
    assert!(errors.iter().any(|e| e == "name must not be empty"));
    assert!(errors.iter().any(|e| e.starts_with("version 'x'")));
    assert!(errors.iter().any(|e| e == "permission 'FILE_READ' must be a boolean"));
}

#[rstest]
#[case(r#""name":1,"version":"1.0.0","agentId":"a","entrypoint":"m.lua","permissions":{}"#, "name must be a string")]
#[case(r#""version":"1.0.0","agentId":"a","entrypoint":"m.lua","permissions":{}"#, "missing required field 'name'")]
#[case(r#""name":"n","version":"1.0.0","agentId":"a","entrypoint":"m.lua","permissions":[]"#, "permissions must be an object")]
#[case(r#""name":"n","version":"1.0.0","agentId":"a","entrypoint":"m.lua","permissions":{},"timeout":"1s""#, "timeout must be a number")]
#[case(r#""name":"n","version":"1.0.0","agentId":"a","entrypoint":"m.lua","permissions":{},"timeout":150.5"#, "timeout 150.5 must be a whole number of milliseconds")]
#[case(r#""name":"n","version":"1.0.0","agentId":"a","entrypoint":"m.lua","permissions":{},"timeout":-200"#, "timeout -200 must be a whole number of milliseconds")]
fn field_types_are_checked(#[case] body: &str, #[case] expected: &str) {
    let errors = violations_of(&format!("{{{body}}}"));
    assert_eq!(errors, vec![String::from(expected)]);
}

#[rstest]
#[case("[]")]
#[case("\"skill\"")]
#[case("null")]
fn non_object_documents_are_violations(#[case] text: &str) {
    assert_eq!(
        violations_of(text),
        vec![String::from("manifest must be a JSON object")]
    );
}

#[test]
fn invalid_json_is_a_parse_error() {
    assert!(matches!(
        SkillManifest::from_json("{\"name\": "),
        Err(AuditError::ManifestParse { .. })
    ));
}

#[test]
fn every_violation_is_reported() {
    let error = SkillManifest::from_json(
        r#"{
            "name": "",
            "version": "one",
            "agentId": " ",
            "entrypoint": "",
            "permissions": { "TELEPORT": true },
            "timeout": 5
        }"#,
    )
    .expect_err("invalid manifest");
    match error {
        AuditError::ManifestInvalid { errors } => {
            assert_eq!(errors.len(), 6, "unexpected violations: {errors:?}");
            assert!(errors.iter().any(|e| e.contains("TELEPORT")));
            assert!(errors.iter().any(|e| e.contains("timeout 5")));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[rstest]
#[case("1.0.0", true)]
#[case("10.20.30-beta.1", true)]
#[case("1.0.0+build", true)]
#[case("1.0", false)]
#[case("v1.0.0", false)]
#[case("1..0", false)]
#[case("", false)]
fn version_prefix_is_checked(#[case] version: &str, #[case] expected: bool) {
    assert_eq!(has_semver_prefix(version), expected);
}

#[rstest]
#[case(99, false)]
#[case(100, true)]
#[case(60_000, true)]
#[case(60_001, false)]
fn timeout_bounds_are_inclusive(#[case] timeout_ms: u64, #[case] valid: bool) {
    let manifest = SkillManifest::new("s", "1.0.0", "a", "m.lua").with_timeout_ms(timeout_ms);
    assert_eq!(manifest.validate().is_ok(), valid);
}

#[test]
fn load_distinguishes_missing_and_malformed_files() {
    let dir = TempDir::new().expect("temp dir");
    let missing = dir.path().join("absent.json");
    assert!(matches!(
        SkillManifest::load(&missing),
        Err(AuditError::ManifestNotFound { .. })
    ));

    let malformed = dir.path().join("skill.json");
    fs::write(&malformed, "{ not json").expect("write manifest");
    match SkillManifest::load(&malformed) {
        Err(AuditError::ManifestParse { path, .. }) => assert_eq!(path, malformed),
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[rstest]
fn load_reads_valid_file(valid_json: String) {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("skill.json");
    fs::write(&path, valid_json).expect("write manifest");
    let manifest = SkillManifest::load(&path).expect("manifest loads");
    assert_eq!(manifest.version(), "1.2.0");
}

#[test]
fn serialises_with_wire_names() {
    let manifest = SkillManifest::new("s", "1.0.0", "agent", "m.lua")
        .with_permission(Capability::ShellExec, true);
    let json = serde_json::to_value(&manifest).expect("serialise");
    assert_eq!(json["agentId"], "agent");
    assert_eq!(json["permissions"]["SHELL_EXEC"], true);
    assert!(json.get("timeout").is_none());
}
