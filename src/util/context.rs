//! Global context for quay operations.
//!
//! Provides centralized access to the working directory, the quay home
//! directory, and the manifest search.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::manifest::{ManifestError, MANIFEST_NAME};

/// Global context containing configuration and paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Home directory for global quay data (~/.quay/)
    home: PathBuf,

    /// Manifest named with `--manifest-path`, resolved against cwd
    manifest_path: Option<PathBuf>,
}

impl GlobalContext {
    /// Create a new GlobalContext rooted at the process working directory.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Ok(Self::with_cwd(cwd))
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Self {
        let home = directories::BaseDirs::new()
            .map(|b| b.home_dir().join(".quay"))
            .unwrap_or_else(|| PathBuf::from(".quay"));

        GlobalContext {
            cwd,
            home,
            manifest_path: None,
        }
    }

    /// Use an explicit manifest instead of searching upward from cwd.
    pub fn with_manifest_path(mut self, path: Option<PathBuf>) -> Self {
        self.manifest_path = path.map(|p| self.cwd.join(p));
        self
    }

    /// Get the current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// The explicit manifest path, if one was given.
    pub fn manifest_path(&self) -> Option<&Path> {
        self.manifest_path.as_deref()
    }

    /// Get the quay home directory (~/.quay/).
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Get the global configuration file path.
    pub fn config_path(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    /// Get the project configuration file path, next to the manifest if there is one.
    pub fn project_config_path(&self) -> PathBuf {
        let root = self
            .find_manifest()
            .ok()
            .and_then(|p| p.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| self.cwd.clone());
        root.join(".quay").join("config.toml")
    }

    /// Find `Quay.toml` starting from cwd and searching upward.
    ///
    /// An explicit manifest path wins without checking that it exists; loading
    /// it reports the error.
    pub fn find_manifest(&self) -> Result<PathBuf, ManifestError> {
        if let Some(ref path) = self.manifest_path {
            return Ok(path.clone());
        }

        let mut current = self.cwd.clone();
        loop {
            let candidate = current.join(MANIFEST_NAME);
            if candidate.is_file() {
                return Ok(candidate);
            }
            if !current.pop() {
                return Err(ManifestError::NotFound {
                    dir: self.cwd.clone(),
                });
            }
        }
    }
}
