#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

/// Throwaway data directory for one test
pub struct TestData {
    dir: TempDir,
}

impl TestData {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("failed to create tempdir"),
        }
    }

    /// Data directory configured for fast, inspectable credentials
    pub fn plaintext() -> Self {
        let data = Self::new();
        data.write_config("[credentials]\nscheme = \"plaintext\"\n")
            .expect("write config");
        data
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write_config(&self, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.dir.path().join("tasknest.toml");
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// Parsed document stored under `key`, if any
    pub fn read_key(&self, key: &str) -> Option<Value> {
        let path = self.dir.path().join(format!("{key}.json"));
        let contents = fs::read_to_string(path).ok()?;
        Some(serde_json::from_str(&contents).expect("stored value is JSON"))
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = tasknest_cmd();
        cmd.arg("--data-dir").arg(self.path());
        cmd
    }

    /// Run with `--json` and return the parsed envelope
    pub fn json(&self, args: &[&str]) -> Value {
        let output = self
            .cmd()
            .arg("--json")
            .args(args)
            .output()
            .expect("run tasknest");
        serde_json::from_slice(&output.stdout).expect("json envelope")
    }
}

pub fn tasknest_cmd() -> Command {
    let mut cmd = Command::cargo_bin("tasknest").expect("binary");
    cmd.env_remove("TASKNEST_DIR");
    cmd.env_remove("RUST_LOG");
    cmd
}
