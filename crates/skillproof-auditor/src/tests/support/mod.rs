//! Shared fixtures for auditor tests.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use skillproof_permissions::Capability;
use tempfile::TempDir;

/// Agent id written into fixture manifests.
pub const TEST_AGENT: &str = "agent-7";

/// Skill sources used across runner, auditor and behaviour tests.
pub fn named_skill(name: &str) -> &'static str {
    match name {
        "reads_file" => r#"local fs = require("fs"); fs.read_file("config.json")"#,
        "writes_and_spawns" => concat!(
            "local fs = require(\"fs\")\n",
            "fs.read_file(\"input.txt\")\n",
            "fs.write_file(\"output.txt\", \"data\")\n",
            "require(\"child_process\").exec(\"ls -la\")\n",
        ),
        "does_nothing" => "local total = 1 + 1",
        "reads_env" => "local home = process.env.HOME; local key = process.env.API_KEY",
        "throws_after_read" => r#"require("fs").read_file("a.txt"); error("skill exploded")"#,
        "spins_forever" => r#"require("os").hostname(); while true do end"#,
        "escapes_with_require" => r#"require("fs").read_file("a.txt"); require("./escape")"#,
        "syntax_error" => "local = = nope",
        "deferred_fetch" => r#"set_timeout(function() require("https").get("https://example.com") end, 60000)"#,
        other => panic!("unknown skill fixture '{other}'"),
    }
}

/// A temporary skill directory holding a manifest and an entrypoint.
pub struct SkillDir {
    dir: TempDir,
}

impl SkillDir {
    /// Creates an empty skill directory.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to allocate temporary directory"),
        }
    }

    /// Creates a directory whose `index.lua` holds `source` and whose
    /// manifest declares `declared`.
    pub fn with_skill(source: &str, declared: &[Capability]) -> Self {
        let skill = Self::new();
        skill.write("index.lua", source);
        skill.write_manifest("index.lua", declared, None);
        skill
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.path().join("skill.json")
    }

    pub fn write(&self, relative: &str, contents: &str) {
        fs::write(self.dir.path().join(relative), contents).expect("write fixture file");
    }

    pub fn write_manifest(&self, entrypoint: &str, declared: &[Capability], timeout: Option<u64>) {
        let permissions: serde_json::Map<String, serde_json::Value> = declared
            .iter()
            .map(|capability| (capability.as_str().to_owned(), json!(true)))
            .collect();
        let mut manifest = json!({
            "name": "fixture-skill",
            "version": "1.0.0",
            "agentId": TEST_AGENT,
            "entrypoint": entrypoint,
            "permissions": permissions,
        });
        if let Some(timeout_ms) = timeout {
            manifest["timeout"] = json!(timeout_ms);
        }
        fs::write(
            self.manifest_path(),
            serde_json::to_string_pretty(&manifest).expect("serialise manifest"),
        )
        .expect("write manifest");
    }
}
