//! Inspection of the operator's local working copy.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use git2::{Repository, StatusOptions};

/// Branch name reported when HEAD is detached or unreadable.
pub const NO_BRANCH: &str = "(none)";

/// Read-only view of a local git working copy.
pub trait LocalRepository: Send + Sync {
    /// Checked-out branch name, or `None` when detached or unborn.
    fn current_branch(&self) -> Option<String>;

    /// Whether tracked files have staged or unstaged changes.
    ///
    /// Untracked files and submodules are ignored.
    fn has_uncommitted_changes(&self) -> Result<bool>;

    /// Whether a remote with the given name is configured.
    fn has_remote(&self, name: &str) -> bool;

    /// Directory commands should run in.
    fn workdir(&self) -> &Path;
}

/// A [`LocalRepository`] backed by libgit2.
pub struct GitWorkingCopy {
    // git2::Repository is Send but not Sync.
    repo: Mutex<Repository>,
    workdir: PathBuf,
}

impl GitWorkingCopy {
    /// Open the repository containing `path`.
    pub fn discover(path: &Path) -> Result<Self> {
        let repo = Repository::discover(path)
            .with_context(|| format!("no git repository found at {}", path.display()))?;
        let workdir = repo
            .workdir()
            .map(Path::to_path_buf)
            .with_context(|| format!("repository at {} is bare", path.display()))?;

        Ok(GitWorkingCopy {
            repo: Mutex::new(repo),
            workdir,
        })
    }
}

impl LocalRepository for GitWorkingCopy {
    fn current_branch(&self) -> Option<String> {
        let repo = self.repo.lock().ok()?;
        let head = repo.head().ok()?;
        if !head.is_branch() {
            return None;
        }
        head.shorthand().map(str::to_string)
    }

    fn has_uncommitted_changes(&self) -> Result<bool> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(false)
            .include_ignored(false)
            .exclude_submodules(true);

        let repo = self
            .repo
            .lock()
            .map_err(|_| anyhow!("working copy lock poisoned"))?;
        let statuses = repo
            .statuses(Some(&mut opts))
            .context("failed to read working copy status")?;
        Ok(!statuses.is_empty())
    }

    fn has_remote(&self, name: &str) -> bool {
        self.repo
            .lock()
            .map(|repo| repo.find_remote(name).is_ok())
            .unwrap_or(false)
    }

    fn workdir(&self) -> &Path {
        &self.workdir
    }
}
