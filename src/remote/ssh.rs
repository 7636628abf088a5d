//! Executor that reaches hosts through the system ssh client.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use crate::remote::{shell_quote, CommandOutput, RemoteCommand, RemoteExecutor};
use crate::util::config::SshConfig;
use crate::util::process::{find_ssh, find_executable, ProcessBuilder};

/// Exit status ssh reserves for its own connection errors.
const SSH_TRANSPORT_FAILURE: i32 = 255;

/// Runs each command as `ssh [options] [user@]host '/bin/bash -l -c …'`.
#[derive(Debug, Clone)]
pub struct SshExecutor {
    program: PathBuf,
    user: Option<String>,
    port: Option<u16>,
    options: Vec<String>,
}

impl SshExecutor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        SshExecutor {
            program: program.into(),
            user: None,
            port: None,
            options: Vec::new(),
        }
    }

    /// Build an executor from the `[ssh]` config section.
    pub fn from_config(config: &SshConfig) -> Result<Self> {
        let program = match config.program {
            Some(ref program) => find_executable(program)
                .with_context(|| format!("configured ssh client `{}` not found", program))?,
            None => find_ssh().context("ssh client not found in PATH")?,
        };

        Ok(SshExecutor {
            program,
            user: config.user.clone(),
            port: config.port,
            options: config.options.clone(),
        })
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// The ssh destination for `host`. A host already naming a user wins.
    pub fn destination(&self, host: &str) -> String {
        match self.user {
            Some(ref user) if !host.contains('@') => format!("{}@{}", user, host),
            _ => host.to_string(),
        }
    }

    /// The remote script, wrapped in a login shell and optionally sudo.
    pub fn remote_script(command: &RemoteCommand) -> String {
        let shell = format!("/bin/bash -l -c {}", shell_quote(&command.render()));
        match command.sudo_user() {
            Some(user) => format!("sudo -H -u {} {}", shell_quote(user), shell),
            None => shell,
        }
    }

    /// The local process that runs `command` on `host`.
    pub fn process(&self, host: &str, command: &RemoteCommand) -> ProcessBuilder {
        let mut pb = ProcessBuilder::new(&self.program);

        if let Some(port) = self.port {
            pb = pb.arg("-p").arg(port.to_string());
        }
        for option in &self.options {
            pb = pb.arg("-o").arg(option);
        }

        // sudo needs a terminal to ask for the password
        let interactive = command.sudo_user().is_some();
        if interactive {
            pb = pb.arg("-t");
        }

        pb.arg(self.destination(host))
            .arg(Self::remote_script(command))
            .inherit_stdin(interactive)
    }
}

impl RemoteExecutor for SshExecutor {
    fn run(&self, host: &str, command: &RemoteCommand) -> Result<CommandOutput> {
        let pb = self.process(host, command);
        tracing::debug!("Executing: {}", pb.display_command());

        let output: CommandOutput = pb.exec()?.into();
        if output.status == SSH_TRANSPORT_FAILURE {
            bail!(
                "ssh to `{}` failed: {}",
                self.destination(host),
                output.stderr.trim()
            );
        }

        tracing::debug!("[{}] exited with {}", host, output.status);
        Ok(output)
    }
}
