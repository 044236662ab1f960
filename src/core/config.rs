//! Workspace configuration
//!
//! Read from `.epochal/config.yaml`. Every field has a default so a partial (or
//! empty) file is valid.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::clock::ReferenceZone;
use crate::core::error::{Result, TemporalError};

/// Directory holding the config file and, by default, the database
pub const WORKSPACE_DIR: &str = ".epochal";

/// Config file name within [`WORKSPACE_DIR`]
pub const CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database file, relative to the workspace directory unless absolute
    pub database: PathBuf,

    /// Tenant used by the CLI when none is given
    pub default_tenant: String,

    /// How long a writer waits for another writer's exclusive section
    pub lock_timeout_ms: u64,

    pub timeline: TimelineConfig,

    pub hierarchy: HierarchyConfig,

    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: PathBuf::from("epochal.db"),
            default_tenant: "default".to_string(),
            lock_timeout_ms: 5_000,
            timeline: TimelineConfig::default(),
            hierarchy: HierarchyConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Zone in which "today" is computed when choosing the current version
    pub reference_zone: ReferenceZone,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HierarchyConfig {
    /// Deepest level a node may occupy (root = 1)
    pub max_depth: u32,

    /// Parent references that mean "no parent"
    pub root_sentinels: Vec<String>,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            max_depth: 17,
            root_sentinels: vec!["0".to_string()],
        }
    }
}

impl HierarchyConfig {
    /// Whether `parent` denotes the root (empty, blank or a sentinel)
    pub fn is_root_reference(&self, parent: Option<&str>) -> bool {
        match parent.map(str::trim) {
            None => true,
            Some("") => true,
            Some(p) => self.root_sentinels.iter().any(|s| s.eq_ignore_ascii_case(p)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when neither RUST_LOG nor -v is given
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Compact,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            TemporalError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&contents)
            .map_err(|e| TemporalError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parse configuration from YAML text; an empty document yields defaults
    pub fn from_yaml(contents: &str) -> std::result::Result<Self, String> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yml::from_str(contents).map_err(|e| e.to_string())?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yml::to_string(self).map_err(|e| TemporalError::Config(e.to_string()))
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.hierarchy.max_depth == 0 {
            return Err("hierarchy.max_depth must be at least 1".to_string());
        }
        if self.default_tenant.trim().is_empty() {
            return Err("default_tenant must not be empty".to_string());
        }
        Ok(())
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    /// Database location resolved against the workspace directory
    pub fn database_path(&self, workspace: &Path) -> PathBuf {
        if self.database.is_absolute() {
            self.database.clone()
        } else {
            workspace.join(WORKSPACE_DIR).join(&self.database)
        }
    }
}
