//! Configuration file support for quay.
//!
//! quay supports two configuration file locations:
//! - Global: `~/.quay/config.toml` - operator-wide defaults (ssh user, options)
//! - Project: `.quay/config.toml` next to `Quay.toml` - project overrides
//!
//! Project config takes precedence over global config. Deploy targets
//! themselves live in `Quay.toml`, not here.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default public key pushed by `push-key`.
pub const DEFAULT_PUBLIC_KEY: &str = "~/.ssh/id_rsa.pub";

/// quay configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// SSH transport settings
    pub ssh: SshConfig,

    /// Fan-out settings
    pub deploy: DeployConfig,

    /// Key distribution settings
    pub keys: KeysConfig,
}

/// SSH transport settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SshConfig {
    /// ssh client to run (defaults to `ssh` on PATH)
    pub program: Option<String>,

    /// Remote login user, prepended as `user@host` when the host has none
    pub user: Option<String>,

    /// Remote port
    pub port: Option<u16>,

    /// Extra `-o` style options passed verbatim
    pub options: Vec<String>,
}

/// Fan-out settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DeployConfig {
    /// Run non-interactive commands on all hosts of a role at once
    pub parallel: Option<bool>,
}

/// Key distribution settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct KeysConfig {
    /// Public key file used by `push-key` when none is given
    pub public_key: Option<String>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.ssh.program.is_some() {
            self.ssh.program = other.ssh.program;
        }
        if other.ssh.user.is_some() {
            self.ssh.user = other.ssh.user;
        }
        if other.ssh.port.is_some() {
            self.ssh.port = other.ssh.port;
        }
        if !other.ssh.options.is_empty() {
            self.ssh.options = other.ssh.options;
        }

        if other.deploy.parallel.is_some() {
            self.deploy.parallel = other.deploy.parallel;
        }

        if other.keys.public_key.is_some() {
            self.keys.public_key = other.keys.public_key;
        }
    }

    /// Whether fan-out should run hosts in parallel.
    pub fn parallel(&self) -> bool {
        self.deploy.parallel.unwrap_or(false)
    }

    /// Public key file for `push-key`.
    pub fn public_key(&self) -> &str {
        self.keys.public_key.as_deref().unwrap_or(DEFAULT_PUBLIC_KEY)
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.quay/config.toml)
/// 2. Global config (~/.quay/config.toml)
/// 3. Defaults
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let mut config = Config::default();

    if global_path.exists() {
        config.merge(Config::load_or_default(global_path));
    }

    if project_path.exists() {
        config.merge(Config::load_or_default(project_path));
    }

    config
}
