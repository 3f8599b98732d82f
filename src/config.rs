//! Configuration loading and management
//!
//! Handles parsing of `tasknest.toml` in the data directory.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::task::{SortKey, SortOrder, SortSpec};

/// Name of the configuration file inside the data directory
pub const CONFIG_FILE: &str = "tasknest.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Task store configuration
    #[serde(default)]
    pub tasks: TasksConfig,

    /// Credential hashing configuration
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

/// Task store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksConfig {
    /// Sort key applied by `filter_and_sort` until `sort` is called.
    /// Empty disables sorting.
    #[serde(default = "default_sort_key")]
    pub default_sort_key: String,

    /// `asc` or `desc`
    #[serde(default = "default_sort_order")]
    pub default_sort_order: String,

    /// Seed an empty store with the sample tasks
    #[serde(default)]
    pub seed_samples: bool,
}

fn default_sort_key() -> String {
    "dueDate".to_string()
}

fn default_sort_order() -> String {
    "asc".to_string()
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            default_sort_key: default_sort_key(),
            default_sort_order: default_sort_order(),
            seed_samples: false,
        }
    }
}

impl TasksConfig {
    /// Initial sort spec for a new task store
    pub fn sort_spec(&self) -> Result<SortSpec> {
        let key = match self.default_sort_key.trim() {
            "" => None,
            raw => Some(raw.parse::<SortKey>().map_err(|_| {
                Error::InvalidConfig(format!("tasks.default_sort_key: unknown key '{raw}'"))
            })?),
        };
        let order = self.default_sort_order.parse::<SortOrder>().map_err(|_| {
            Error::InvalidConfig(format!(
                "tasks.default_sort_order: invalid order '{}' (expected asc|desc)",
                self.default_sort_order
            ))
        })?;
        Ok(SortSpec { key, order })
    }
}

/// Credential scheme names accepted in `credentials.scheme`
pub const CREDENTIAL_SCHEMES: [&str; 2] = ["argon2", "plaintext"];

/// Credential hashing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// `argon2` (default) or `plaintext` (legacy, insecure)
    #[serde(default = "default_scheme")]
    pub scheme: String,

    /// Argon2 memory cost in KiB
    #[serde(default = "default_memory_kib")]
    pub memory_kib: u32,

    /// Argon2 iterations
    #[serde(default = "default_iterations")]
    pub iterations: u32,

    /// Argon2 lanes
    #[serde(default = "default_parallelism")]
    pub parallelism: u32,
}

fn default_scheme() -> String {
    "argon2".to_string()
}

// argon2 crate defaults (OWASP minimum for argon2id)
fn default_memory_kib() -> u32 {
    19 * 1024
}

fn default_iterations() -> u32 {
    2
}

fn default_parallelism() -> u32 {
    1
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            scheme: default_scheme(),
            memory_kib: default_memory_kib(),
            iterations: default_iterations(),
            parallelism: default_parallelism(),
        }
    }
}

impl CredentialsConfig {
    fn validate(&self) -> Result<()> {
        if !CREDENTIAL_SCHEMES.contains(&self.scheme.as_str()) {
            return Err(Error::InvalidConfig(format!(
                "credentials.scheme: invalid scheme '{}' (expected argon2|plaintext)",
                self.scheme
            )));
        }
        if self.parallelism == 0 {
            return Err(Error::InvalidConfig(
                "credentials.parallelism must be > 0".to_string(),
            ));
        }
        if self.iterations == 0 {
            return Err(Error::InvalidConfig(
                "credentials.iterations must be > 0".to_string(),
            ));
        }
        let min_memory = self.parallelism.checked_mul(8).ok_or_else(|| {
            Error::InvalidConfig("credentials.parallelism is too large".to_string())
        })?;
        if self.memory_kib < min_memory {
            return Err(Error::InvalidConfig(
                "credentials.memory_kib must be >= 8 * parallelism".to_string(),
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from a `tasknest.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the data directory, or return defaults
    pub fn load_from_dir(data_dir: &Path) -> Self {
        let config_path = data_dir.join(CONFIG_FILE);
        if !config_path.exists() {
            return Self::default();
        }
        match Self::load(&config_path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %config_path.display(), error = %err, "ignoring invalid config");
                Self::default()
            }
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        self.tasks.sort_spec()?;
        self.credentials.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn defaults_are_expected() {
        let cfg = Config::default();
        assert_eq!(cfg.tasks.default_sort_key, "dueDate");
        assert_eq!(cfg.tasks.default_sort_order, "asc");
        assert!(!cfg.tasks.seed_samples);
        assert_eq!(cfg.credentials.scheme, "argon2");
        assert_eq!(cfg.credentials.memory_kib, 19456);
        assert_eq!(cfg.credentials.iterations, 2);
        assert_eq!(cfg.credentials.parallelism, 1);

        let spec = cfg.tasks.sort_spec().expect("sort spec");
        assert_eq!(spec.key, Some(SortKey::DueDate));
        assert_eq!(spec.order, SortOrder::Ascending);
    }

    #[test]
    fn load_parses_overrides() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        let content = r#"
[tasks]
default_sort_key = "priority"
default_sort_order = "desc"
seed_samples = true

[credentials]
scheme = "plaintext"
memory_kib = 64
iterations = 1
parallelism = 2
"#;
        fs::write(&path, content.trim()).expect("write config");

        let cfg = Config::load(&path).expect("load config");
        assert!(cfg.tasks.seed_samples);
        let spec = cfg.tasks.sort_spec().expect("sort spec");
        assert_eq!(spec.key, Some(SortKey::Priority));
        assert_eq!(spec.order, SortOrder::Descending);
        assert_eq!(cfg.credentials.scheme, "plaintext");
        assert_eq!(cfg.credentials.memory_kib, 64);
        assert_eq!(cfg.credentials.iterations, 1);
        assert_eq!(cfg.credentials.parallelism, 2);
    }

    #[test]
    fn empty_sort_key_disables_sorting() {
        let tasks = TasksConfig {
            default_sort_key: String::new(),
            ..TasksConfig::default()
        };
        assert_eq!(tasks.sort_spec().expect("sort spec").key, None);
    }

    #[test]
    fn invalid_sort_key_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[tasks]\ndefault_sort_key = \"attachments\"").expect("write config");

        let err = Config::load(&path).expect_err("invalid config");
        match err {
            Error::InvalidConfig(_) => {}
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn invalid_scheme_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[credentials]\nscheme = \"md5\"").expect("write config");

        let err = Config::load(&path).expect_err("invalid config");
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn load_from_dir_defaults_when_missing_or_invalid() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(Config::load_from_dir(dir.path()).credentials.scheme, "argon2");

        fs::write(dir.path().join(CONFIG_FILE), "tasks = 12").expect("write config");
        let cfg = Config::load_from_dir(dir.path());
        assert_eq!(cfg.tasks.default_sort_key, "dueDate");
    }

    #[test]
    fn save_writes_toml() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.toml");
        Config::default().save(&path).expect("save config");

        let written = fs::read_to_string(&path).expect("read config");
        assert!(written.contains("default_sort_key = \"dueDate\""));
        assert!(written.contains("scheme = \"argon2\""));
    }
}
