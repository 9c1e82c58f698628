//! rjs-optimize Project Configuration
//!
//! Handles parsing and management of rjs-optimize.toml configuration files.
//!
//! ```toml
//! [optimize]
//! config_file = "src/main/js/app.build.js"
//! filter_config = true
//! runner = "nodejs"
//! optimizer_parameters = ["optimize=uglify2"]
//!
//! [build]
//! directory = "target"
//!
//! [properties]
//! "project.version" = "1.4.2"
//! ```

use crate::engine::EngineKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the project file searched for by [`ProjectConfig::find_and_load`]
pub const CONFIG_FILE_NAME: &str = "rjs-optimize.toml";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file not found: {0}")]
    NotFound(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Root configuration structure matching rjs-optimize.toml.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProjectConfig {
    /// Optimizer step settings
    #[serde(default)]
    pub optimize: OptimizeSettings,

    /// Host build settings
    #[serde(default)]
    pub build: BuildSettings,

    /// Properties available to build profile filtering
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl ProjectConfig {
    /// Load configuration from a file path.
    ///
    /// Relative paths in the file are taken relative to the file's directory.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let mut config: ProjectConfig = toml::from_str(&content)?;
        if let Some(base) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            config.rebase(base);
        }
        Ok(config)
    }

    /// Load configuration from the current directory or parents.
    pub fn load_from_cwd() -> ConfigResult<Self> {
        let cwd = std::env::current_dir().map_err(ConfigError::Io)?;
        Self::find_and_load(&cwd)
    }

    /// Find and load configuration by searching up from the given directory.
    pub fn find_and_load(start_dir: &Path) -> ConfigResult<Self> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Self::load(&config_path);
            }
            if !dir.pop() {
                // Reached root without finding config
                return Ok(Self::default());
            }
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Resolve relative paths against `base`
    fn rebase(&mut self, base: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        if let Some(p) = self.optimize.config_file.as_mut() {
            join(p);
        }
        if let Some(p) = self.optimize.optimizer_file.as_mut() {
            join(p);
        }
        if let Some(p) = self.optimize.node_executable.as_mut() {
            // Bare names are left for PATH lookup by the OS
            if p.components().count() > 1 {
                join(p);
            }
        }
        join(&mut self.build.directory);
    }
}

/// Settings of the optimize step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptimizeSettings {
    /// Build profile handed to the optimizer (required)
    #[serde(default)]
    pub config_file: Option<PathBuf>,

    /// Optimizer script; the engine's default when absent
    #[serde(default)]
    pub optimizer_file: Option<PathBuf>,

    /// Token-filter the build profile before use
    #[serde(default)]
    pub filter_config: bool,

    /// Skip the step entirely
    #[serde(default)]
    pub skip: bool,

    /// Preferred engine: "nodejs" or "rhino"
    #[serde(default)]
    pub runner: EngineKind,

    /// Explicit Node.js executable; discovered when absent
    #[serde(default)]
    pub node_executable: Option<PathBuf>,

    /// Extra parameters appended after the build profile
    #[serde(default)]
    pub optimizer_parameters: Vec<String>,
}

/// Host build settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildSettings {
    /// Build output directory
    #[serde(default = "default_build_dir")]
    pub directory: PathBuf,
}

fn default_build_dir() -> PathBuf {
    PathBuf::from("target")
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            directory: default_build_dir(),
        }
    }
}
