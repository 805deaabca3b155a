//! Project configuration management for `musicwiki.toml`.
//!
//! # Sections
//!
//! | Section     | Purpose                                        |
//! |-------------|------------------------------------------------|
//! | `[data]`    | Where the wiki data files live                 |
//! | `[cache]`   | Computed property invalidation policy          |
//! | `[check]`   | Parallelism and tracing for `musicwiki check`  |
//!
//! # Example
//!
//! ```toml
//! [data]
//! directory = "data"
//!
//! [cache]
//! invalidation = "automatic"
//!
//! [check]
//! parallel = true
//! trace = false
//! ```

mod cache;
mod data;
pub mod defaults;
mod error;
mod handle;

pub use cache::{CacheConfig, CheckConfig};
pub use data::DataConfig;
pub use error::ConfigError;
pub use handle::{cfg, init_config};

use crate::cli::{Cli, Commands};
use anyhow::{Result, bail};
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure representing musicwiki.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct WikiConfig {
    /// Absolute path to the config file (set after loading)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root (set after loading)
    #[serde(skip)]
    #[educe(Default = PathBuf::from("./"))]
    pub root: PathBuf,

    /// Data location
    #[serde(default)]
    pub data: DataConfig,

    /// Cache invalidation
    #[serde(default)]
    pub cache: CacheConfig,

    /// `check` command settings
    #[serde(default)]
    pub check: CheckConfig,
}

impl WikiConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: WikiConfig = toml::from_str(content).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content)
    }

    /// Load the config named by the CLI, falling back to defaults when the
    /// file does not exist, then apply CLI overrides.
    pub fn load(cli: &Cli) -> Result<Self> {
        let root = cli.root.as_deref().unwrap_or(Path::new("./"));
        let config_path = root.join(&cli.config);

        let mut config = if config_path.exists() {
            Self::from_path(&config_path)?
        } else {
            Self::default()
        };
        config.update_with_cli(cli);
        Ok(config)
    }

    /// Update configuration with CLI arguments
    pub fn update_with_cli(&mut self, cli: &Cli) {
        let root = cli.root.clone().unwrap_or_else(|| self.root.clone());
        self.update_path_with_root(cli, &root);

        if let Commands::Check { parallel, trace } = &cli.command {
            Self::update_option(&mut self.check.parallel, parallel.as_ref());
            Self::update_option(&mut self.check.trace, trace.as_ref());
        }
    }

    /// Update config option if CLI value is provided
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Resolve paths against the root and normalize them to absolute paths
    fn update_path_with_root(&mut self, cli: &Cli, root: &Path) {
        Self::update_option(&mut self.data.directory, cli.data.as_ref());

        self.root = Self::normalize_path(root);
        self.config_path = Self::normalize_path(&self.root.join(&cli.config));
        self.data.directory = Self::normalize_path(&self.root.join(&self.data.directory));
    }

    /// Normalize a path to absolute, using canonicalize if the path exists
    fn normalize_path(path: &Path) -> PathBuf {
        path.canonicalize().unwrap_or_else(|_| {
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                std::env::current_dir()
                    .map(|cwd| cwd.join(path))
                    .unwrap_or_else(|_| path.to_path_buf())
            }
        })
    }

    /// Validate configuration before loading data
    pub fn validate(&self) -> Result<()> {
        let directory = &self.data.directory;
        if !directory.exists() {
            bail!(ConfigError::MissingData(directory.clone()));
        }
        if !directory.is_dir() {
            bail!(ConfigError::Validation(format!(
                "[data.directory] `{}` is not a directory",
                directory.display()
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
