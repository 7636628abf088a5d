//! Test utilities and mocks for quay unit tests.
//!
//! This module provides stand-ins for the pieces of a deploy that reach
//! outside the process: the remote transport, the operator's terminal and
//! the local git checkout.
//!
//! # Example
//!
//! ```rust,ignore
//! use quay::test_support::{basic_target, context_with, MockRemote};
//!
//! #[test]
//! fn test_example() {
//!     let remote = MockRemote::permissive();
//!     remote.expect("test -e /srv/site", CommandOutput::failure(1, ""));
//!
//!     let ctx = context_with(basic_target(), remote.clone());
//!     ctx.session("app1").setup_repository(false).unwrap();
//!
//!     assert_eq!(remote.commands()[0], "test -e /srv/site");
//! }
//! ```

pub mod fixtures;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Result};

use crate::remote::{CommandOutput, RemoteCommand, RemoteExecutor};
use crate::util::git::LocalRepository;
use crate::util::prompt::Prompter;

// Re-export fixtures for convenience
pub use fixtures::*;

/// Pattern for matching commands in [`MockRemote`].
#[derive(Debug, Clone)]
pub enum CommandPattern {
    /// Exact match on the bare command.
    Exact(String),
    /// Match if the command starts with prefix.
    StartsWith(String),
    /// Match if the command contains substring.
    Contains(String),
    /// Match using a regex pattern.
    Regex(String),
    /// Match any command.
    Any,
}

impl CommandPattern {
    /// Check if this pattern matches the given command.
    pub fn matches(&self, cmd: &str) -> bool {
        match self {
            CommandPattern::Exact(s) => cmd == s,
            CommandPattern::StartsWith(s) => cmd.starts_with(s),
            CommandPattern::Contains(s) => cmd.contains(s),
            CommandPattern::Regex(pattern) => regex::Regex::new(pattern)
                .map(|re| re.is_match(cmd))
                .unwrap_or(false),
            CommandPattern::Any => true,
        }
    }
}

/// Expectation for a remote command.
#[derive(Debug, Clone)]
pub struct CommandExpectation {
    /// Only match on this host (None = any host).
    pub host: Option<String>,
    /// Pattern to match against the bare command.
    pub pattern: CommandPattern,
    /// Output to return when matched.
    pub output: CommandOutput,
    /// Number of times this expectation can be used (None = unlimited).
    pub times: Option<usize>,
    /// Number of times this expectation has been used.
    pub used: usize,
}

impl CommandExpectation {
    pub fn new(pattern: CommandPattern, output: CommandOutput) -> Self {
        CommandExpectation {
            host: None,
            pattern,
            output,
            times: None,
            used: 0,
        }
    }

    /// Restrict the expectation to one host.
    pub fn on_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the number of times this expectation can be used.
    pub fn times(mut self, n: usize) -> Self {
        self.times = Some(n);
        self
    }

    fn applies(&self, host: &str, cmd: &str) -> bool {
        let available = match self.times {
            Some(n) => self.used < n,
            None => true,
        };
        let host_matches = self.host.as_deref().map_or(true, |h| h == host);
        available && host_matches && self.pattern.matches(cmd)
    }
}

#[derive(Debug, Default)]
struct MockState {
    expectations: Vec<CommandExpectation>,
    calls: Vec<(String, RemoteCommand)>,
    default_output: Option<CommandOutput>,
}

/// Recording [`RemoteExecutor`].
///
/// Commands are matched against expectations in the order they were added;
/// the first available match wins. Without a match the default output is
/// returned, and without a default the call fails like a broken transport.
/// Clones share their state, so a test can keep one handle while the
/// context owns another.
#[derive(Debug, Clone, Default)]
pub struct MockRemote {
    state: Arc<Mutex<MockState>>,
}

impl MockRemote {
    /// A mock that rejects any unexpected command.
    pub fn new() -> Self {
        Self::default()
    }

    /// A mock where unexpected commands succeed with empty output.
    pub fn permissive() -> Self {
        let mock = Self::new();
        mock.set_default(CommandOutput::success(""));
        mock
    }

    fn push(&self, expectation: CommandExpectation) -> &Self {
        self.state.lock().unwrap().expectations.push(expectation);
        self
    }

    /// Add an expectation for an exact command match.
    pub fn expect(&self, cmd: &str, output: CommandOutput) -> &Self {
        self.push(CommandExpectation::new(
            CommandPattern::Exact(cmd.to_string()),
            output,
        ))
    }

    /// Add an exact-match expectation that applies to one host only.
    pub fn expect_on(&self, host: &str, cmd: &str, output: CommandOutput) -> &Self {
        self.push(
            CommandExpectation::new(CommandPattern::Exact(cmd.to_string()), output).on_host(host),
        )
    }

    /// Add an expectation for a command starting with a prefix.
    pub fn expect_prefix(&self, prefix: &str, output: CommandOutput) -> &Self {
        self.push(CommandExpectation::new(
            CommandPattern::StartsWith(prefix.to_string()),
            output,
        ))
    }

    /// Add an expectation for a command containing a substring.
    pub fn expect_contains(&self, substring: &str, output: CommandOutput) -> &Self {
        self.push(CommandExpectation::new(
            CommandPattern::Contains(substring.to_string()),
            output,
        ))
    }

    /// Add an expectation for a command matching a regex.
    pub fn expect_regex(&self, pattern: &str, output: CommandOutput) -> &Self {
        self.push(CommandExpectation::new(
            CommandPattern::Regex(pattern.to_string()),
            output,
        ))
    }

    /// Add a custom expectation.
    pub fn expect_pattern(&self, expectation: CommandExpectation) -> &Self {
        self.push(expectation)
    }

    /// Set the output for commands that match no expectation.
    pub fn set_default(&self, output: CommandOutput) -> &Self {
        self.state.lock().unwrap().default_output = Some(output);
        self
    }

    /// Every `(host, command)` received, in order.
    pub fn calls(&self) -> Vec<(String, RemoteCommand)> {
        self.state.lock().unwrap().calls.clone()
    }

    /// The bare command strings received, in order.
    pub fn commands(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .map(|(_, cmd)| cmd.command().to_string())
            .collect()
    }

    /// Verify that all expectations with a specific count were satisfied.
    pub fn verify(&self) -> Result<()> {
        let state = self.state.lock().unwrap();
        for (i, exp) in state.expectations.iter().enumerate() {
            if let Some(expected) = exp.times {
                if exp.used != expected {
                    bail!(
                        "expectation {} was used {} times, expected {}",
                        i,
                        exp.used,
                        expected
                    );
                }
            }
        }
        Ok(())
    }
}

impl RemoteExecutor for MockRemote {
    fn run(&self, host: &str, command: &RemoteCommand) -> Result<CommandOutput> {
        let mut state = self.state.lock().unwrap();
        state.calls.push((host.to_string(), command.clone()));

        let cmd = command.command();
        if let Some(exp) = state
            .expectations
            .iter_mut()
            .find(|exp| exp.applies(host, cmd))
        {
            exp.used += 1;
            return Ok(exp.output.clone());
        }

        if let Some(ref default) = state.default_output {
            return Ok(default.clone());
        }

        bail!("unexpected command on {}: {}", host, cmd)
    }
}

/// [`Prompter`] that records messages instead of reading the terminal.
#[derive(Debug, Clone, Default)]
pub struct MockPrompter {
    messages: Arc<Mutex<Vec<String>>>,
    interrupted: bool,
}

impl MockPrompter {
    /// A prompter the operator always confirms.
    pub fn new() -> Self {
        Self::default()
    }

    /// A prompter the operator aborts, as with Ctrl-C.
    pub fn interrupted() -> Self {
        MockPrompter {
            interrupted: true,
            ..Self::default()
        }
    }

    /// Messages shown so far.
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl Prompter for MockPrompter {
    fn pause(&self, message: &str) -> Result<()> {
        self.messages.lock().unwrap().push(message.to_string());
        if self.interrupted {
            return Err(anyhow!("read interrupted"));
        }
        Ok(())
    }
}

/// In-memory [`LocalRepository`].
#[derive(Debug, Clone)]
pub struct FakeWorkingCopy {
    branch: Option<String>,
    dirty: bool,
    remotes: Vec<String>,
    workdir: PathBuf,
}

impl FakeWorkingCopy {
    /// A clean checkout of `branch` with an `origin` remote.
    pub fn on_branch(branch: &str) -> Self {
        FakeWorkingCopy {
            branch: Some(branch.to_string()),
            dirty: false,
            remotes: vec!["origin".to_string()],
            workdir: PathBuf::from("/home/op/site"),
        }
    }

    /// A clean checkout with a detached HEAD.
    pub fn detached() -> Self {
        FakeWorkingCopy {
            branch: None,
            ..Self::on_branch("master")
        }
    }

    /// Mark tracked files as modified.
    pub fn dirty(mut self) -> Self {
        self.dirty = true;
        self
    }
}

impl LocalRepository for FakeWorkingCopy {
    fn current_branch(&self) -> Option<String> {
        self.branch.clone()
    }

    fn has_uncommitted_changes(&self) -> Result<bool> {
        Ok(self.dirty)
    }

    fn has_remote(&self, name: &str) -> bool {
        self.remotes.iter().any(|r| r == name)
    }

    fn workdir(&self) -> &Path {
        &self.workdir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_remote_matches_in_order() {
        let remote = MockRemote::new();
        remote
            .expect_prefix("git", CommandOutput::failure(1, "first"))
            .expect("git status", CommandOutput::success("second"));

        let output = remote.run("app1", &RemoteCommand::new("git status")).unwrap();
        assert_eq!(output.stderr, "first");
    }

    #[test]
    fn test_mock_remote_host_filter_and_times() {
        let remote = MockRemote::permissive();
        remote.expect_pattern(
            CommandExpectation::new(CommandPattern::Any, CommandOutput::failure(2, ""))
                .on_host("db1")
                .times(1),
        );

        let cmd = RemoteCommand::new("uptime");
        assert!(remote.run("app1", &cmd).unwrap().succeeded());
        assert_eq!(remote.run("db1", &cmd).unwrap().status, 2);
        assert!(remote.run("db1", &cmd).unwrap().succeeded());
        remote.verify().unwrap();
    }

    #[test]
    fn test_mock_remote_regex() {
        let remote = MockRemote::new();
        remote.expect_regex(r"^git checkout -b \w+", CommandOutput::success(""));

        assert!(remote
            .run("app1", &RemoteCommand::new("git checkout -b release origin/release"))
            .is_ok());
        assert!(remote.run("app1", &RemoteCommand::new("git checkout release")).is_err());
        assert_eq!(remote.calls().len(), 2);
    }

    #[test]
    fn test_fake_working_copy() {
        let wc = FakeWorkingCopy::detached().dirty();
        assert_eq!(wc.current_branch(), None);
        assert!(wc.has_uncommitted_changes().unwrap());
        assert!(wc.has_remote("origin"));
        assert!(!wc.has_remote("upstream"));
    }
}
