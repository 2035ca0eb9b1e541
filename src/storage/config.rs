//! Configuration handling
//!
//! Configuration is stored in `.sched/config.toml` (project) and
//! `~/.config/sched/config.toml` (global).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::project::SCHED_DIR;
use crate::resolver::{CyclePolicy, ResolveOptions};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Limits and cycle handling for impact resolution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ResolverConfig {
    /// Longest path (in tasks) the enumerator may build
    pub max_path_len: usize,

    /// Maximum number of path records per resolution
    pub max_paths: usize,

    /// What to do when a path would revisit one of its own tasks
    pub on_cycle: CyclePolicy,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_path_len: ResolveOptions::DEFAULT_MAX_PATH_LEN,
            max_paths: ResolveOptions::DEFAULT_MAX_PATHS,
            on_cycle: CyclePolicy::default(),
        }
    }
}

impl ResolverConfig {
    /// Validates the limits and turns them into resolver options
    pub fn to_options(&self) -> Result<ResolveOptions, ConfigError> {
        if self.max_path_len == 0 {
            return Err(ConfigError::Invalid(
                "resolver.max_path_len must be at least 1".to_string(),
            ));
        }
        if self.max_paths == 0 {
            return Err(ConfigError::Invalid(
                "resolver.max_paths must be at least 1".to_string(),
            ));
        }

        Ok(ResolveOptions {
            max_path_len: self.max_path_len,
            max_paths: self.max_paths,
            on_cycle: self.on_cycle,
        })
    }
}

/// Configuration for the SQLite cache
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Resolve through the cache instead of an in-memory snapshot
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Project-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProjectConfig {
    /// Resolver limits
    pub resolver: ResolverConfig,

    /// Cache settings
    pub cache: CacheConfig,
}

/// Global user configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GlobalConfig {
    /// Default output format (text or json)
    pub default_format: OutputFormat,
}

/// Output format for commands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Combined configuration (global + project)
#[derive(Debug, Clone)]
pub struct Config {
    pub project: ProjectConfig,
    pub global: GlobalConfig,
    pub project_root: Option<PathBuf>,
}

impl Config {
    /// Loads configuration for a specific project
    pub fn for_project(project_root: &Path) -> Result<Self> {
        let global = Self::load_global()?;
        let project = Self::load_project_config(project_root)?;

        Ok(Self {
            project,
            global,
            project_root: Some(project_root.to_path_buf()),
        })
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "sched", "sched").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Loads global configuration
    pub fn load_global() -> Result<GlobalConfig> {
        let config_dir = match Self::global_config_dir() {
            Some(dir) => dir,
            None => return Ok(GlobalConfig::default()),
        };

        let config_path = config_dir.join("config.toml");
        if !config_path.exists() {
            return Ok(GlobalConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read global config: {}", config_path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse global config")
    }

    /// Loads project configuration from a specific root
    fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
        let config_path = project_root.join(SCHED_DIR).join("config.toml");

        if !config_path.exists() {
            return Ok(ProjectConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read project config: {}", config_path.display()))?;

        Self::parse_project(&content).context("Failed to parse project config")
    }

    /// Parses and validates project configuration text
    pub fn parse_project(content: &str) -> Result<ProjectConfig, ConfigError> {
        let config: ProjectConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.resolver.to_options()?;
        Ok(config)
    }

    /// Finds the project root by looking for a `.sched/` directory
    pub fn find_project_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        Self::find_project_root_from(&current)
    }

    /// Walks up from `start` looking for a `.sched/` directory
    pub fn find_project_root_from(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();

        loop {
            if current.join(SCHED_DIR).is_dir() {
                return Some(current);
            }

            if !current.pop() {
                return None;
            }
        }
    }
}
