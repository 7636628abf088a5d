//! Remote command execution.
//!
//! Procedures describe what to run as a [`RemoteCommand`] and hand it to a
//! [`RemoteExecutor`] together with a host name. The executor owns the
//! transport; procedures only ever see a [`CommandOutput`].

pub mod local;
pub mod ssh;

use std::process::Output;

use anyhow::Result;

pub use local::LocalExecutor;
pub use ssh::SshExecutor;

/// Runs shell commands on named hosts.
///
/// A non-zero exit is reported through [`CommandOutput::failed`]. `Err` is
/// reserved for transport failures, where the command may not have run at all.
/// Implementations must run the commands for one host in the order issued.
pub trait RemoteExecutor: Send + Sync {
    fn run(&self, host: &str, command: &RemoteCommand) -> Result<CommandOutput>;
}

/// A shell command plus the context it runs in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteCommand {
    command: String,
    cwd: Option<String>,
    prefixes: Vec<String>,
    env: Vec<(String, String)>,
    sudo_user: Option<String>,
}

impl RemoteCommand {
    pub fn new(command: impl Into<String>) -> Self {
        RemoteCommand {
            command: command.into(),
            ..RemoteCommand::default()
        }
    }

    /// Run inside `dir`.
    pub fn cwd(mut self, dir: impl Into<String>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Run `prefix &&` before the command, e.g. a virtualenv activation.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefixes.push(prefix.into());
        self
    }

    /// Export a variable into the remote shell before the command.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Run as another user through sudo.
    pub fn sudo_as(mut self, user: impl Into<String>) -> Self {
        self.sudo_user = Some(user.into());
        self
    }

    /// The bare command, without directory, prefixes or exports.
    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn working_dir(&self) -> Option<&str> {
        self.cwd.as_deref()
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    pub fn exports(&self) -> &[(String, String)] {
        &self.env
    }

    pub fn sudo_user(&self) -> Option<&str> {
        self.sudo_user.as_deref()
    }

    /// The full shell script: `cd`, then prefixes, then exports, then the command.
    pub fn render(&self) -> String {
        let mut parts = Vec::new();
        if let Some(ref dir) = self.cwd {
            parts.push(format!("cd {}", shell_path(dir)));
        }
        parts.extend(self.prefixes.iter().cloned());
        for (key, value) in &self.env {
            parts.push(format!("export {}={}", key, shell_quote(value)));
        }
        parts.push(self.command.clone());
        parts.join(" && ")
    }
}

/// Captured result of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit status; -1 when the process was killed by a signal
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// A successful output with the given stdout.
    pub fn success(stdout: impl Into<String>) -> Self {
        CommandOutput {
            status: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A failed output with the given status and stderr.
    pub fn failure(status: i32, stderr: impl Into<String>) -> Self {
        CommandOutput {
            status,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.status == 0
    }

    pub fn failed(&self) -> bool {
        !self.succeeded()
    }

    /// Stdout with surrounding whitespace removed.
    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim()
    }
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        CommandOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

fn is_shell_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || "_-./:@%+=,".contains(c)
}

/// Quote a word for a POSIX shell, leaving plain words untouched.
pub fn shell_quote(word: &str) -> String {
    if !word.is_empty() && word.chars().all(is_shell_safe) {
        return word.to_string();
    }
    format!("'{}'", word.replace('\'', "'\\''"))
}

/// Quote a remote path, keeping a leading `~` expandable by the remote shell.
pub fn shell_path(path: &str) -> String {
    if path == "~" {
        return path.to_string();
    }
    match path.strip_prefix("~/") {
        Some(rest) if !rest.is_empty() => format!("~/{}", shell_quote(rest)),
        Some(_) => "~/".to_string(),
        None => shell_quote(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_quote_plain_words_unchanged() {
        assert_eq!(shell_quote("git@example.com:acme/site.git"), "git@example.com:acme/site.git");
        assert_eq!(shell_quote("/srv/site"), "/srv/site");
    }

    #[test]
    fn test_shell_quote_with_space_and_quote() {
        assert_eq!(shell_quote("my dir"), "'my dir'");
        assert_eq!(shell_quote("it's"), "'it'\\''s'");
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn test_shell_path_keeps_tilde_expandable() {
        assert_eq!(shell_path("~/project"), "~/project");
        assert_eq!(shell_path("~/my project"), "~/'my project'");
        assert_eq!(shell_path("~"), "~");
        assert_eq!(shell_path("/tmp/~odd"), "'/tmp/~odd'");
    }

    #[test]
    fn test_render_orders_cd_prefix_export_command() {
        let cmd = RemoteCommand::new("./manage.py migrate")
            .cwd("~/project")
            .prefix("source ~/venv/bin/activate")
            .env("DJANGO_DEPLOY_ENV", "prod");

        assert_eq!(
            cmd.render(),
            "cd ~/project && source ~/venv/bin/activate && export DJANGO_DEPLOY_ENV=prod && ./manage.py migrate"
        );
        assert_eq!(cmd.command(), "./manage.py migrate");
    }

    #[test]
    fn test_render_quotes_empty_export() {
        let cmd = RemoteCommand::new("true").env("DJANGO_DEPLOY_ENV", "");
        assert_eq!(cmd.render(), "export DJANGO_DEPLOY_ENV='' && true");
    }

    #[test]
    fn test_command_output_status() {
        assert!(CommandOutput::success("ok").succeeded());
        let failed = CommandOutput::failure(128, "fatal: not a git repository");
        assert!(failed.failed());
        assert_eq!(CommandOutput::success(" refs/heads/master\n").stdout_trimmed(), "refs/heads/master");
    }
}
