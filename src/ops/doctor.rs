//! Environment health checks.
//!
//! The `check` command verifies, without touching any host, that a deploy
//! could start from this machine.
//!
//! ## Usage
//!
//! ```bash
//! quay check                # Tools and manifest
//! quay -t production check  # Also validate the target and its git remote
//! ```
//!
//! ## Checks Performed
//!
//! - ssh client availability
//! - Git availability
//! - Quay.toml discovery and parsing
//! - The selected target builds and validates
//! - The local repository knows the target's git remote (optional)

use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::core::manifest::TargetManifest;
use crate::core::registry::TargetRegistry;
use crate::core::target::{DeployTarget, Role, DEFAULT_GIT_REMOTE};
use crate::util::git::{GitWorkingCopy, LocalRepository};
use crate::util::process::{find_executable, find_git, find_ssh, ProcessBuilder};
use crate::util::GlobalContext;

/// Result of a single health check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    /// Name of the check
    pub name: String,

    /// Whether the check passed
    pub passed: bool,

    /// Human-readable status message
    pub message: String,

    /// Path to the tool or file (if applicable)
    pub path: Option<PathBuf>,

    /// Version string (if applicable)
    pub version: Option<String>,

    /// How long the check took
    pub duration: Duration,

    /// Whether this check is required or optional
    pub required: bool,
}

impl CheckResult {
    /// Create a passing check result.
    pub fn pass(name: impl Into<String>, message: impl Into<String>) -> Self {
        CheckResult {
            name: name.into(),
            passed: true,
            message: message.into(),
            path: None,
            version: None,
            duration: Duration::ZERO,
            required: true,
        }
    }

    /// Create a failing check result.
    pub fn fail(name: impl Into<String>, message: impl Into<String>) -> Self {
        CheckResult {
            passed: false,
            ..CheckResult::pass(name, message)
        }
    }

    /// Mark this check as optional.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_path(mut self, path: PathBuf) -> Self {
        self.path = Some(path);
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }
}

/// Summary of all health checks.
#[derive(Debug, Clone, Default)]
pub struct CheckReport {
    /// Individual check results
    pub checks: Vec<CheckResult>,

    /// Total time taken
    pub total_duration: Duration,
}

impl CheckReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, check: CheckResult) {
        self.checks.push(check);
    }

    /// Check if all required checks passed.
    pub fn all_required_passed(&self) -> bool {
        self.checks.iter().filter(|c| c.required).all(|c| c.passed)
    }

    pub fn passed_count(&self) -> usize {
        self.checks.iter().filter(|c| c.passed).count()
    }

    pub fn failed_count(&self) -> usize {
        self.checks.iter().filter(|c| !c.passed).count()
    }

    pub fn required_failed_count(&self) -> usize {
        self.checks
            .iter()
            .filter(|c| c.required && !c.passed)
            .count()
    }

    /// Find a check by name.
    pub fn get(&self, name: &str) -> Option<&CheckResult> {
        self.checks.iter().find(|c| c.name == name)
    }
}

/// Options for the check command.
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// Directory to search for `Quay.toml` and the local repository
    pub cwd: PathBuf,

    /// Explicit manifest path
    pub manifest_path: Option<PathBuf>,

    /// Target to validate
    pub target: Option<String>,

    /// Configured ssh client
    pub ssh_program: Option<String>,
}

/// Run every check.
pub fn check(options: &CheckOptions) -> CheckReport {
    let start = Instant::now();
    let mut report = CheckReport::new();

    report.add(check_ssh(options.ssh_program.as_deref()));
    report.add(check_git());

    let (manifest_check, registry) = check_manifest(options);
    report.add(manifest_check);

    let mut git_remote = DEFAULT_GIT_REMOTE.to_string();
    if let Some(ref name) = options.target {
        let (target_check, remote) = check_target(registry.as_ref(), name);
        report.add(target_check);
        if let Some(remote) = remote {
            git_remote = remote;
        }
    }

    report.add(check_local_remote(options, &git_remote));

    report.total_duration = start.elapsed();
    report
}

fn check_ssh(program: Option<&str>) -> CheckResult {
    let start = Instant::now();

    let found = match program {
        Some(program) => find_executable(program),
        None => find_ssh(),
    };

    match found {
        Some(path) => CheckResult::pass("SSH", "ssh client is available")
            .with_path(path)
            .with_duration(start.elapsed()),
        None => CheckResult::fail("SSH", "ssh client not found (required to reach hosts)")
            .with_duration(start.elapsed()),
    }
}

fn check_git() -> CheckResult {
    check_git_at(find_git())
}

fn check_git_at(git: Option<PathBuf>) -> CheckResult {
    let start = Instant::now();

    let version = git.as_ref().and_then(|path| {
        ProcessBuilder::new(path)
            .arg("--version")
            .exec()
            .ok()
            .filter(|output| output.status.success())
            .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string())
    });

    match (git, version) {
        (Some(path), Some(version)) => CheckResult::pass("Git", "Git is available")
            .with_path(path)
            .with_version(version)
            .with_duration(start.elapsed()),
        _ => CheckResult::fail("Git", "Git not found (required for `deploy`)")
            .with_duration(start.elapsed()),
    }
}

fn check_manifest(options: &CheckOptions) -> (CheckResult, Option<TargetRegistry>) {
    let start = Instant::now();

    let path = match options.manifest_path {
        Some(ref path) => path.clone(),
        None => match GlobalContext::with_cwd(options.cwd.clone()).find_manifest() {
            Ok(path) => path,
            Err(e) => {
                return (
                    CheckResult::fail("Manifest", e.to_string()).with_duration(start.elapsed()),
                    None,
                )
            }
        },
    };

    match TargetManifest::load(&path) {
        Ok(manifest) => {
            let registry = TargetRegistry::discover(&manifest);
            let result = CheckResult::pass(
                "Manifest",
                format!("{} deploy target(s) defined", registry.len()),
            )
            .with_path(path)
            .with_duration(start.elapsed());
            (result, Some(registry))
        }
        Err(e) => (
            CheckResult::fail("Manifest", format!("{:#}", anyhow::Error::from(e)))
                .with_path(path)
                .with_duration(start.elapsed()),
            None,
        ),
    }
}

/// Validate the named target, returning its git remote when it builds.
fn check_target(registry: Option<&TargetRegistry>, name: &str) -> (CheckResult, Option<String>) {
    let start = Instant::now();
    let check_name = format!("Target `{}`", name);

    let Some(registry) = registry else {
        return (
            CheckResult::fail(check_name, "manifest unavailable").with_duration(start.elapsed()),
            None,
        );
    };

    match registry.resolve(name).and_then(|spec| spec.build()) {
        Ok(target) => {
            let hosts = target.hosts_for(&Role::ALL);
            let result = CheckResult::pass(
                check_name,
                format!("{} target with {} host(s)", target.kind(), hosts.len()),
            )
            .with_duration(start.elapsed());
            (result, Some(target.git_remote().to_string()))
        }
        Err(e) => (
            CheckResult::fail(check_name, e.to_string()).with_duration(start.elapsed()),
            None,
        ),
    }
}

fn check_local_remote(options: &CheckOptions, remote: &str) -> CheckResult {
    let start = Instant::now();
    let name = "Local repository";

    let result = match GitWorkingCopy::discover(&options.cwd) {
        Ok(repo) if repo.has_remote(remote) => CheckResult::pass(
            name,
            format!("remote `{}` is configured", remote),
        )
        .with_path(repo.workdir().to_path_buf()),
        Ok(repo) => CheckResult::fail(
            name,
            format!("remote `{}` is not configured (needed by `deploy`)", remote),
        )
        .with_path(repo.workdir().to_path_buf()),
        Err(e) => CheckResult::fail(name, format!("{:#}", e)),
    };
    result.with_duration(start.elapsed()).optional()
}

/// Format the check report for display.
pub fn format_report(report: &CheckReport, verbose: bool) -> String {
    use std::fmt::Write;

    let mut output = String::new();

    let _ = writeln!(output, "Quay Check");
    let _ = writeln!(output, "==========\n");

    let _ = writeln!(output, "Checks:");
    for check in &report.checks {
        let status = if check.passed { "[OK]" } else { "[!!]" };
        let required = if check.required { "" } else { " (optional)" };

        let _ = writeln!(output, "  {} {}{}", status, check.name, required);

        if verbose || !check.passed {
            let _ = writeln!(output, "      {}", check.message);
        }
        if verbose {
            if let Some(path) = &check.path {
                let _ = writeln!(output, "      Path: {}", path.display());
            }
            if let Some(version) = &check.version {
                let _ = writeln!(output, "      Version: {}", version);
            }
        }
    }

    let _ = writeln!(output);

    let passed = report.passed_count();
    let failed = report.failed_count();
    let required_failed = report.required_failed_count();

    let _ = writeln!(output, "Summary: {} passed, {} failed", passed, failed);

    if required_failed > 0 {
        let _ = writeln!(
            output,
            "\nWarning: {} required check(s) failed. Deploys will not work.",
            required_failed
        );
    } else if failed > 0 {
        let _ = writeln!(
            output,
            "\nAll required checks passed. {} optional check(s) failed.",
            failed
        );
    } else {
        let _ = writeln!(output, "\nAll checks passed. Ready to deploy.");
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::manifest::MANIFEST_NAME;
    use crate::test_support::SAMPLE_MANIFEST;
    use tempfile::TempDir;

    fn project() -> TempDir {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(MANIFEST_NAME), SAMPLE_MANIFEST).unwrap();
        tmp
    }

    #[test]
    fn test_check_result_optional() {
        let result = CheckResult::fail("test", "missing").optional();
        assert!(!result.passed);
        assert!(!result.required);
    }

    #[test]
    fn test_git_check_fails_without_a_usable_binary() {
        assert!(!check_git_at(None).passed);

        let tmp = TempDir::new().unwrap();
        let result = check_git_at(Some(tmp.path().join("git")));
        assert!(!result.passed);
        assert!(result.required);
    }

    #[cfg(unix)]
    #[test]
    fn test_git_check_reports_version_of_found_binary() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let git = tmp.path().join("git");
        std::fs::write(&git, "#!/bin/sh\necho 'git version 2.43.0'\n").unwrap();
        std::fs::set_permissions(&git, std::fs::Permissions::from_mode(0o755)).unwrap();

        let result = check_git_at(Some(git.clone()));
        assert!(result.passed);
        assert_eq!(result.path, Some(git));
        assert_eq!(result.version.as_deref(), Some("git version 2.43.0"));
    }

    #[test]
    fn test_report_counts() {
        let mut report = CheckReport::new();
        report.add(CheckResult::pass("required", "ok"));
        report.add(CheckResult::fail("optional", "missing").optional());

        assert!(report.all_required_passed());
        assert_eq!(report.passed_count(), 1);
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.required_failed_count(), 0);

        report.add(CheckResult::fail("git", "missing"));
        assert!(!report.all_required_passed());
    }

    #[test]
    fn test_check_counts_manifest_targets() {
        let tmp = project();
        let report = check(&CheckOptions {
            cwd: tmp.path().to_path_buf(),
            ..CheckOptions::default()
        });

        let manifest = report.get("Manifest").unwrap();
        assert!(manifest.passed);
        assert_eq!(manifest.message, "2 deploy target(s) defined");
        assert!(report.get("Target `production`").is_none());
    }

    #[test]
    fn test_check_validates_selected_target() {
        let tmp = project();
        let report = check(&CheckOptions {
            cwd: tmp.path().to_path_buf(),
            target: Some("staging".to_string()),
            ..CheckOptions::default()
        });
        assert!(report.get("Target `staging`").unwrap().passed);

        let report = check(&CheckOptions {
            cwd: tmp.path().to_path_buf(),
            target: Some("qa".to_string()),
            ..CheckOptions::default()
        });
        assert!(!report.get("Target `qa`").unwrap().passed);
    }

    #[test]
    fn test_missing_manifest_fails() {
        let tmp = TempDir::new().unwrap();
        let report = check(&CheckOptions {
            cwd: tmp.path().to_path_buf(),
            manifest_path: Some(tmp.path().join(MANIFEST_NAME)),
            ..CheckOptions::default()
        });
        assert!(!report.get("Manifest").unwrap().passed);
        assert!(!report.all_required_passed());
    }

    #[test]
    fn test_local_remote_check_is_optional() {
        let tmp = project();
        let report = check(&CheckOptions {
            cwd: tmp.path().to_path_buf(),
            ..CheckOptions::default()
        });

        let local = report.get("Local repository").unwrap();
        assert!(!local.required);
    }

    #[test]
    fn test_format_report_shows_failures() {
        let mut report = CheckReport::new();
        report.add(CheckResult::pass("Git", "Git is available"));
        report.add(CheckResult::fail("SSH", "ssh client not found"));

        let output = format_report(&report, false);
        assert!(output.contains("[OK] Git"));
        assert!(output.contains("[!!] SSH"));
        assert!(output.contains("ssh client not found"));
        assert!(output.contains("1 required check(s) failed"));
    }
}
