//! Target model error types and diagnostics.

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::util::diagnostic::{suggestions, Diagnostic};

/// Error while selecting or constructing a deploy target.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum TargetError {
    #[error("deploy target `{name}` not found")]
    #[diagnostic(code(quay::target::not_found))]
    NotFound { name: String, available: Vec<String> },

    #[error("deploy target `{target}` has no `{setting}` configured")]
    #[diagnostic(
        code(quay::target::missing_setting),
        help("Set the missing key in the target table or under [defaults] in Quay.toml")
    )]
    MissingSetting {
        target: String,
        setting: &'static str,
    },

    #[error("deploy target `{name}` is already registered")]
    #[diagnostic(code(quay::target::duplicate))]
    Duplicate { name: String },

    #[error("deploy target `{name}` is invalid: {message}")]
    #[diagnostic(code(quay::target::invalid))]
    Invalid { name: String, message: String },

    #[error("no deploy target selected")]
    #[diagnostic(code(quay::target::none_selected))]
    NoneSelected { available: Vec<String> },
}

impl TargetError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut diag = Diagnostic::error(self.to_string());
        if let Some(code) = self.code() {
            diag = diag.with_code(code.to_string());
        }

        match self {
            TargetError::NotFound { available, .. } | TargetError::NoneSelected { available } => {
                if available.is_empty() {
                    diag = diag.with_context("Quay.toml defines no deploy targets");
                } else {
                    diag = diag.with_context(format!("available targets: {}", available.join(", ")));
                }
                let suggestion = if matches!(self, TargetError::NotFound { .. }) {
                    suggestions::TARGET_NOT_FOUND
                } else {
                    suggestions::NO_TARGET
                };
                diag.with_suggestion(suggestion)
            }
            _ => match self.help() {
                Some(help) => diag.with_suggestion(help.to_string()),
                None => diag,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_lists_available_targets() {
        let err = TargetError::NotFound {
            name: "qa".to_string(),
            available: vec!["prod".to_string(), "stage".to_string()],
        };

        let output = err.to_diagnostic().format(false);
        assert!(output.starts_with("error[quay::target::not_found]: deploy target `qa` not found"));
        assert!(output.contains("available targets: prod, stage"));
        assert!(output.contains("quay list-targets"));
    }

    #[test]
    fn test_missing_setting_has_help() {
        let err = TargetError::MissingSetting {
            target: "prod".to_string(),
            setting: "git-branch",
        };

        let output = err.to_diagnostic().format(false);
        assert!(output.contains("has no `git-branch` configured"));
        assert!(output.contains("help: Set the missing key"));
    }
}
