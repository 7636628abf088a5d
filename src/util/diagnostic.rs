//! User-friendly diagnostic messages.
//!
//! Every fatal abort is rendered through [`Diagnostic`]: the root cause, the
//! host or target involved, and what the operator can do next.

use std::fmt;
use std::path::PathBuf;

/// Common suggestion messages for consistent error handling.
pub mod suggestions {
    /// Suggestion when no manifest file is found.
    pub const NO_MANIFEST: &str =
        "Create a Quay.toml with a [targets.<name>] table, or pass --manifest-path";

    /// Suggestion when a target is not found.
    pub const TARGET_NOT_FOUND: &str = "Run `quay list-targets` to see available targets";

    /// Suggestion when no target was selected.
    pub const NO_TARGET: &str = "Select one with `quay --target <name> <command>` or QUAY_TARGET";

    /// Suggestion when a clone fails.
    pub const CLONE_FAILED: &str =
        "Add the public key above to the central repository, wait a few minutes, and retry";

    /// Suggestion when the remote working copy is dirty.
    pub const DIRTY_REPOSITORY: &str =
        "Log into the host and commit, stash or discard the changes before deploying";

    /// Suggestion when a fast-forward pull is rejected.
    pub const PULL_REJECTED: &str =
        "The remote branch history diverged; reconcile it by hand on the host";

    /// Suggestion when the key file is not a public key.
    pub const INVALID_KEY_FILE: &str = "Pass the `.pub` half of the key pair";
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Note,
    Help,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
            Severity::Help => write!(f, "help"),
        }
    }
}

/// A diagnostic message with optional suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Primary message
    pub message: String,
    /// Severity level
    pub severity: Severity,
    /// Stable error code, e.g. `quay::deploy::dirty_repository`
    pub code: Option<String>,
    /// Additional context lines
    pub context: Vec<String>,
    /// Suggested fixes
    pub suggestions: Vec<String>,
    /// Related location (manifest path)
    pub location: Option<PathBuf>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            severity: Severity::Error,
            code: None,
            context: Vec::new(),
            suggestions: Vec::new(),
            location: None,
        }
    }

    /// Create a new warning diagnostic.
    pub fn warning(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            ..Diagnostic::error(message)
        }
    }

    /// Attach a stable error code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Add context to the diagnostic.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Add a suggestion for fixing the issue.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Add a file location.
    pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(path.into());
        self
    }

    /// Format the diagnostic for terminal output.
    pub fn format(&self, color: bool) -> String {
        let mut output = String::new();

        let severity_str = if color {
            match self.severity {
                Severity::Error => "\x1b[1;31merror\x1b[0m",
                Severity::Warning => "\x1b[1;33mwarning\x1b[0m",
                Severity::Note => "\x1b[1;36mnote\x1b[0m",
                Severity::Help => "\x1b[1;32mhelp\x1b[0m",
            }
        } else {
            match self.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
                Severity::Note => "note",
                Severity::Help => "help",
            }
        };

        match self.code {
            Some(ref code) => {
                output.push_str(&format!("{}[{}]: {}\n", severity_str, code, self.message))
            }
            None => output.push_str(&format!("{}: {}\n", severity_str, self.message)),
        }

        if let Some(ref path) = self.location {
            output.push_str(&format!("  --> {}\n", path.display()));
        }

        for ctx in &self.context {
            output.push_str(&format!("  - {}\n", ctx));
        }

        if !self.suggestions.is_empty() {
            output.push('\n');
            let help_prefix = if color {
                "\x1b[1;32mhelp\x1b[0m"
            } else {
                "help"
            };
            if self.suggestions.len() == 1 {
                output.push_str(&format!("{}: {}\n", help_prefix, self.suggestions[0]));
            } else {
                output.push_str(&format!("{}: consider:\n", help_prefix));
                for (i, suggestion) in self.suggestions.iter().enumerate() {
                    output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
                }
            }
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_formatting() {
        let diag = Diagnostic::error("uncommitted changes on `app1`")
            .with_code("quay::deploy::dirty_repository")
            .with_context("repository: ~/project")
            .with_suggestion("Commit the changes")
            .with_suggestion("Stash the changes");

        let output = diag.format(false);
        assert!(output.starts_with("error[quay::deploy::dirty_repository]: uncommitted"));
        assert!(output.contains("  - repository: ~/project"));
        assert!(output.contains("help: consider:"));
        assert!(output.contains("2. Stash the changes"));
    }

    #[test]
    fn test_single_suggestion_is_inline() {
        let output = Diagnostic::warning("deploy target `qa` not found")
            .with_suggestion(suggestions::TARGET_NOT_FOUND)
            .format(false);

        assert!(output.starts_with("warning: deploy target"));
        assert!(output.contains("help: Run `quay list-targets`"));
    }
}
