//! Shared fixtures for sandbox tests.

use std::fs;
use std::path::Path;
use std::time::Duration;

use skillproof_permissions::{Ledger, LedgerSnapshot};
use tempfile::TempDir;

use crate::context::{ExecutionContext, ExecutionOutcome};
use crate::profile::SandboxProfile;
use crate::recorder::LedgerHandle;

/// Default run deadline used by tests that do not exercise timeouts.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(2);

/// Compiles and runs `source` under `profile`, returning the outcome and the
/// final ledger state.
pub fn run_script(profile: SandboxProfile, source: &str, timeout: Duration) -> (ExecutionOutcome, LedgerSnapshot) {
    let ledger = LedgerHandle::new(Ledger::new());
    let context = ExecutionContext::new(profile, ledger.clone()).expect("context should build");
    let skill = context
        .compile("skill.lua", source)
        .expect("skill should compile");
    let outcome = context.execute(&skill, timeout);
    (outcome, ledger.snapshot())
}

/// Runs `source` in a stub-only sandbox with the default test deadline.
pub fn run_stubbed(source: &str) -> (ExecutionOutcome, LedgerSnapshot) {
    run_script(SandboxProfile::new(), source, TEST_TIMEOUT)
}

/// Named skill scripts used by the behavioural scenarios.
pub fn named_script(name: &str) -> &'static str {
    match name {
        "read_config" => r#"local fs = require("fs"); local data = fs.read_file("config.json"); assert(data == nil)"#,
        "read_secret_env" => "local key = process.env.API_KEY; assert(key == nil)",
        "load_local_module" => r#"local helper = require("./helper")"#,
        "busy_loop" => "while true do end",
        "deferred_lookup" => r#"set_timeout(function() require("dns").lookup("example.com") end, 10)"#,
        "read_notes" => r#"local data = require("fs").read_file("notes.txt"); assert(data == "sandbox notes")"#,
        "throw_after_write" => r#"require("fs").write_file("out.txt", "x"); error("boom")"#,
        other => panic!("unknown test script '{other}'"),
    }
}

/// Writes a fixture file, creating parent directories as needed.
pub fn write_fixture(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create fixture directory");
    }
    fs::write(path, contents).expect("write fixture file");
}

/// Shared state for behavioural sandbox tests.
pub struct TestWorld {
    pub profile: SandboxProfile,
    pub source: Option<&'static str>,
    pub outcome: Option<ExecutionOutcome>,
    pub snapshot: Option<LedgerSnapshot>,
    pub skill_dir: TempDir,
}

impl TestWorld {
    pub fn new() -> Self {
        let skill_dir = TempDir::new().expect("failed to allocate temporary directory");
        write_fixture(&skill_dir.path().join("notes.txt"), "sandbox notes");
        Self {
            profile: SandboxProfile::new().with_working_dir(skill_dir.path()),
            source: None,
            outcome: None,
            snapshot: None,
            skill_dir,
        }
    }

    pub fn run(&mut self, timeout: Duration) {
        let source = self.source.expect("skill script not configured");
        let (outcome, snapshot) = run_script(self.profile.clone(), source, timeout);
        self.outcome = Some(outcome);
        self.snapshot = Some(snapshot);
    }

    pub fn snapshot(&self) -> &LedgerSnapshot {
        self.snapshot.as_ref().expect("skill has not run")
    }
}
