//! `Quay.toml` - the project's deploy target definitions.
//!
//! ```toml
//! [defaults]
//! git-repository = "git@github.com:acme/site.git"
//! git-branch = "master"
//!
//! [targets.production]
//! kind = "basic"
//! repository-dir = "/srv/site"
//! app-servers = ["app1", "app2"]
//! db-servers = "db1"
//!
//! [targets.staging]
//! kind = "simple"
//! server = "stage.example.com"
//! git-branch = "release"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::util::diagnostic::{suggestions, Diagnostic};

/// File name searched for when no manifest path is given.
pub const MANIFEST_NAME: &str = "Quay.toml";

/// Name of the table holding settings shared by every target.
pub const DEFAULTS_TABLE: &str = "defaults";

/// Errors locating or reading the manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("could not find `{}` in `{}` or any parent directory", MANIFEST_NAME, .dir.display())]
    NotFound { dir: PathBuf },

    #[error("failed to read `{}`", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },

    #[error("failed to parse `{}`", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        err: toml::de::Error,
    },
}

impl ManifestError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.to_string());
        match self {
            ManifestError::NotFound { .. } => diag.with_suggestion(suggestions::NO_MANIFEST),
            ManifestError::Read { path, err } => {
                diag.with_location(path.clone()).with_context(err.to_string())
            }
            ManifestError::Parse { path, err } => diag
                .with_location(path.clone())
                .with_context(err.message().to_string()),
        }
    }
}

/// Parsed manifest. Target tables are kept raw until registry discovery.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TargetManifest {
    /// Settings merged under every target
    #[serde(default)]
    pub defaults: toml::Table,

    /// One entry per target name
    #[serde(default)]
    pub targets: toml::Table,

    #[serde(skip)]
    path: Option<PathBuf>,
}

impl TargetManifest {
    /// Load and parse a manifest file.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let contents = std::fs::read_to_string(path).map_err(|err| ManifestError::Read {
            path: path.to_path_buf(),
            err,
        })?;

        let mut manifest: TargetManifest =
            toml::from_str(&contents).map_err(|err| ManifestError::Parse {
                path: path.to_path_buf(),
                err,
            })?;
        manifest.path = Some(path.to_path_buf());

        tracing::debug!(
            "Loaded {} with {} target table(s)",
            path.display(),
            manifest.targets.len()
        );
        Ok(manifest)
    }

    /// Parse a manifest held in memory.
    pub fn parse(contents: &str) -> Result<Self, ManifestError> {
        toml::from_str(contents).map_err(|err| ManifestError::Parse {
            path: PathBuf::from(MANIFEST_NAME),
            err,
        })
    }

    /// Path the manifest was loaded from.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_defaults_and_targets() {
        let manifest = TargetManifest::parse(
            r#"
[defaults]
git-repository = "git@example.com:acme/site.git"

[targets.prod]
kind = "basic"

[targets.stage]
kind = "simple"
"#,
        )
        .unwrap();

        assert!(manifest.defaults.contains_key("git-repository"));
        assert_eq!(manifest.targets.len(), 2);
        assert!(manifest.path().is_none());
    }

    #[test]
    fn test_empty_manifest_has_no_targets() {
        let manifest = TargetManifest::parse("").unwrap();
        assert!(manifest.targets.is_empty());
        assert!(manifest.defaults.is_empty());
    }

    #[test]
    fn test_load_records_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(MANIFEST_NAME);
        std::fs::write(&path, "[targets.prod]\nkind = \"simple\"\n").unwrap();

        let manifest = TargetManifest::load(&path).unwrap();
        assert_eq!(manifest.path(), Some(path.as_path()));
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(MANIFEST_NAME);
        std::fs::write(&path, "[targets.prod\n").unwrap();

        assert!(matches!(
            TargetManifest::load(&path),
            Err(ManifestError::Parse { .. })
        ));
    }
}
