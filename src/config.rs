//! Run configuration
//!
//! All orchestrator settings live in `.swarmgate/config.yaml` inside the
//! target workspace. Every field has a default so an empty file (or no
//! file at all) yields a working configuration.

use crate::retry::RetryPolicy;
use crate::verify::{GateConfig, PatternTable};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DOT_DIR: &str = ".swarmgate";
pub const CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to write config '{path}': {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config '{path}': {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] serde_yaml::Error),

    #[error("Invalid secret pattern table: {0}")]
    Patterns(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorConfig {
    /// Concurrency cap on simultaneously running workers
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,

    /// Reaper poll interval in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Worker command; the task payload is appended as the last argument
    #[serde(default = "default_worker_command")]
    pub worker_command: Vec<String>,

    /// Per-attempt wall-clock deadline in seconds
    #[serde(default = "default_worker_timeout_secs")]
    pub worker_timeout_secs: u64,

    #[serde(default)]
    pub retry: RetryPolicy,

    #[serde(default)]
    pub gate: GateConfig,

    /// Optional external secret pattern table replacing the built-in one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_patterns_path: Option<PathBuf>,
}

fn default_max_parallel() -> usize {
    6
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_worker_command() -> Vec<String> {
    vec!["claude".to_string(), "-p".to_string()]
}

fn default_worker_timeout_secs() -> u64 {
    600
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_parallel: default_max_parallel(),
            poll_interval_ms: default_poll_interval_ms(),
            worker_command: default_worker_command(),
            worker_timeout_secs: default_worker_timeout_secs(),
            retry: RetryPolicy::default(),
            gate: GateConfig::default(),
            secret_patterns_path: None,
        }
    }
}

/// Loads and persists the per-workspace configuration
pub struct ConfigManager {
    workspace_dir: PathBuf,
}

impl ConfigManager {
    pub fn new(workspace_dir: &Path) -> Self {
        Self {
            workspace_dir: workspace_dir.to_path_buf(),
        }
    }

    pub fn dot_dir(&self) -> PathBuf {
        self.workspace_dir.join(DOT_DIR)
    }

    pub fn config_path(&self) -> PathBuf {
        self.dot_dir().join(CONFIG_FILE)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.dot_dir().join("logs")
    }

    pub fn results_dir(&self) -> PathBuf {
        self.dot_dir().join("results")
    }

    pub fn plan_path(&self) -> PathBuf {
        self.dot_dir().join(crate::plan::PLAN_FILE)
    }

    /// Load the config, falling back to defaults when the file is absent
    pub fn load(&self) -> Result<OrchestratorConfig, ConfigError> {
        let path = self.config_path();
        if !path.exists() {
            log::debug!("[Config] No config at {}, using defaults", path.display());
            return Ok(OrchestratorConfig::default());
        }

        let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let mut config: OrchestratorConfig =
            serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;

        // An external pattern table overrides the compiled-in defaults.
        if let Some(patterns_path) = &config.secret_patterns_path {
            let resolved = if patterns_path.is_absolute() {
                patterns_path.clone()
            } else {
                self.workspace_dir.join(patterns_path)
            };
            config.gate.patterns =
                PatternTable::load(&resolved).map_err(ConfigError::Patterns)?;
            log::info!(
                "[Config] Loaded secret patterns from {}",
                resolved.display()
            );
        }

        Ok(config)
    }

    /// Write the config back to disk, creating the dot directory
    pub fn save(&self, config: &OrchestratorConfig) -> Result<(), ConfigError> {
        std::fs::create_dir_all(self.dot_dir()).map_err(|source| ConfigError::Write {
            path: self.dot_dir().display().to_string(),
            source,
        })?;

        let yaml = serde_yaml::to_string(config)?;
        let path = self.config_path();
        std::fs::write(&path, yaml).map_err(|source| ConfigError::Write {
            path: path.display().to_string(),
            source,
        })?;

        log::info!("[Config] Saved config to {}", path.display());
        Ok(())
    }

    /// Create the dot directory and a default config file if none exists
    pub fn initialize(&self) -> Result<OrchestratorConfig, ConfigError> {
        if !self.config_path().exists() {
            self.save(&OrchestratorConfig::default())?;
        }
        self.load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_config_file() {
        let temp = TempDir::new().unwrap();
        let config = ConfigManager::new(temp.path()).load().unwrap();
        assert_eq!(config.max_parallel, 6);
        assert_eq!(config.poll_interval_ms, 1000);
        assert_eq!(config.retry.max_retries, 1);
        assert_eq!(config.gate.score_threshold, 6);
    }

    #[test]
    fn test_initialize_writes_config_file() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::new(temp.path());
        manager.initialize().unwrap();
        assert!(manager.config_path().exists());
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::new(temp.path());
        std::fs::create_dir_all(manager.dot_dir()).unwrap();
        std::fs::write(manager.config_path(), "maxParallel: 2\n").unwrap();

        let config = manager.load().unwrap();
        assert_eq!(config.max_parallel, 2);
        assert_eq!(config.worker_timeout_secs, 600);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::new(temp.path());

        let mut config = OrchestratorConfig::default();
        config.max_parallel = 3;
        config.worker_command = vec!["sh".to_string(), "-c".to_string()];
        manager.save(&config).unwrap();

        let loaded = manager.load().unwrap();
        assert_eq!(loaded.max_parallel, 3);
        assert_eq!(loaded.worker_command, vec!["sh", "-c"]);
    }

    #[test]
    fn test_external_pattern_table_is_loaded() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::new(temp.path());

        let table = r#"
patterns:
  - id: custom-secret
    pattern: "CUSTOM-[0-9]{6}"
allowlist: []
"#;
        std::fs::write(temp.path().join("patterns.yaml"), table).unwrap();
        std::fs::create_dir_all(manager.dot_dir()).unwrap();
        std::fs::write(
            manager.config_path(),
            "secretPatternsPath: patterns.yaml\n",
        )
        .unwrap();

        let config = manager.load().unwrap();
        assert_eq!(config.gate.patterns.patterns.len(), 1);
        assert_eq!(config.gate.patterns.patterns[0].id, "custom-secret");
    }
}
