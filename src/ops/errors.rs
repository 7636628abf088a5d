//! Deployment procedure errors.

use std::path::PathBuf;

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::core::errors::TargetError;
use crate::util::diagnostic::{suggestions, Diagnostic};

/// A fatal outcome that aborts the invocation.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum DeployError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Target(#[from] TargetError),

    #[error("[{host}] failed to clone `{repository}`")]
    #[diagnostic(code(quay::deploy::clone_failed))]
    CloneFailed {
        host: String,
        repository: String,
        public_key: String,
    },

    #[error("[{host}] repository `{dir}` has uncommitted changes")]
    #[diagnostic(code(quay::deploy::dirty_repository))]
    DirtyRepository { host: String, dir: String },

    #[error("[{host}] fast-forward pull of `{branch}` was rejected")]
    #[diagnostic(code(quay::deploy::pull_rejected))]
    PullRejected {
        host: String,
        branch: String,
        stderr: String,
    },

    #[error("[{host}] `{command}` exited with status {status}")]
    #[diagnostic(code(quay::deploy::command_failed))]
    CommandFailed {
        host: String,
        command: String,
        status: i32,
        stderr: String,
    },

    #[error("`{}` is not a public key file", .path.display())]
    #[diagnostic(code(quay::deploy::invalid_key_file))]
    InvalidKeyFile { path: PathBuf },

    #[error("failed to read key file `{}`", .path.display())]
    #[diagnostic(code(quay::deploy::key_file_unreadable))]
    KeyFileUnreadable {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },

    #[error("[{host}] could not run command: {reason}")]
    #[diagnostic(code(quay::deploy::transport))]
    Transport { host: String, reason: String },

    #[error("operator confirmation failed: {0}")]
    #[diagnostic(code(quay::deploy::prompt))]
    Prompt(String),
}

/// Keep the last few lines of captured stderr for context.
fn stderr_tail(stderr: &str) -> Vec<String> {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(5);
    lines[start..].iter().map(|l| format!("stderr: {}", l)).collect()
}

impl DeployError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        if let DeployError::Target(err) = self {
            return err.to_diagnostic();
        }

        let mut diag = Diagnostic::error(self.to_string());
        if let Some(code) = self.code() {
            diag = diag.with_code(code.to_string());
        }

        match self {
            DeployError::CloneFailed { .. } => diag.with_suggestion(suggestions::CLONE_FAILED),
            DeployError::DirtyRepository { .. } => {
                diag.with_suggestion(suggestions::DIRTY_REPOSITORY)
            }
            DeployError::PullRejected { stderr, .. } => {
                for line in stderr_tail(stderr) {
                    diag = diag.with_context(line);
                }
                diag.with_suggestion(suggestions::PULL_REJECTED)
            }
            DeployError::CommandFailed { stderr, .. } => {
                for line in stderr_tail(stderr) {
                    diag = diag.with_context(line);
                }
                diag
            }
            DeployError::InvalidKeyFile { path } => diag
                .with_location(path.clone())
                .with_suggestion(suggestions::INVALID_KEY_FILE),
            DeployError::KeyFileUnreadable { path, err } => diag
                .with_location(path.clone())
                .with_context(err.to_string()),
            _ => diag,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_errors_keep_their_diagnostic() {
        let err: DeployError = TargetError::NotFound {
            name: "qa".to_string(),
            available: vec!["prod".to_string()],
        }
        .into();

        let output = err.to_diagnostic().format(false);
        assert!(output.starts_with("error[quay::target::not_found]"));
    }

    #[test]
    fn test_pull_rejected_shows_stderr_tail() {
        let err = DeployError::PullRejected {
            host: "app1".to_string(),
            branch: "master".to_string(),
            stderr: "fatal: Not possible to fast-forward, aborting.\n".to_string(),
        };

        let output = err.to_diagnostic().format(false);
        assert!(output.contains("[app1] fast-forward pull of `master` was rejected"));
        assert!(output.contains("stderr: fatal: Not possible to fast-forward"));
        assert!(output.contains("diverged"));
    }

    #[test]
    fn test_invalid_key_file_points_at_path() {
        let err = DeployError::InvalidKeyFile {
            path: PathBuf::from("/home/op/.ssh/id_rsa"),
        };

        let output = err.to_diagnostic().format(false);
        assert!(output.contains("is not a public key file"));
        assert!(output.contains("--> /home/op/.ssh/id_rsa"));
    }
}
