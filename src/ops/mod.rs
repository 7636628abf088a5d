//! Deployment procedures.
//!
//! A [`DeployContext`] binds one validated target to a transport, a shell and
//! a prompter for the length of an invocation. Procedures that touch a single
//! host are methods on [`HostSession`]; the context fans them out over the
//! hosts of the roles a command needs.

pub mod doctor;
pub mod errors;
pub mod manage;
pub mod push;
pub mod repository;
pub mod ssh_key;
pub mod tasks;
pub mod virtualenv;

use std::sync::Arc;

use rayon::prelude::*;

use crate::core::target::{DeployTarget, Role, Target};
use crate::remote::{shell_path, CommandOutput, RemoteCommand, RemoteExecutor};
use crate::util::prompt::Prompter;
use crate::util::shell::{Shell, Status};

pub use doctor::{check, format_report, CheckOptions, CheckReport, CheckResult};
pub use errors::DeployError;
pub use ssh_key::{push_key, read_key_file, PushKeyOptions};
pub use tasks::{deploy, setup, MigrateOptions};

/// Everything a procedure needs, built once per invocation.
pub struct DeployContext {
    target: Target,
    remote: Arc<dyn RemoteExecutor>,
    shell: Arc<Shell>,
    prompter: Arc<dyn Prompter>,
    parallel: bool,
}

impl DeployContext {
    pub fn new(
        target: Target,
        remote: Arc<dyn RemoteExecutor>,
        shell: Arc<Shell>,
        prompter: Arc<dyn Prompter>,
    ) -> Self {
        DeployContext {
            target,
            remote,
            shell,
            prompter,
            parallel: false,
        }
    }

    /// Run non-interactive fan-out on all hosts at once.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn shell(&self) -> &Arc<Shell> {
        &self.shell
    }

    pub fn prompter(&self) -> &dyn Prompter {
        self.prompter.as_ref()
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    /// Scope the context to one host.
    pub fn session<'a>(&'a self, host: &'a str) -> HostSession<'a> {
        HostSession { ctx: self, host }
    }

    /// Run `f` once per host serving any of `roles`.
    ///
    /// Sequential mode stops at the first failing host. Parallel mode runs
    /// every host and reports the first failure in host order.
    pub fn for_roles<F>(&self, roles: &[Role], f: F) -> Result<(), DeployError>
    where
        F: Fn(&HostSession<'_>) -> Result<(), DeployError> + Send + Sync,
    {
        if !self.parallel {
            return self.for_roles_sequential(roles, f);
        }

        let hosts = self.target.hosts_for(roles);
        tracing::debug!("Fanning out over {} host(s) in parallel", hosts.len());

        let results: Vec<Result<(), DeployError>> = hosts
            .par_iter()
            .map(|host| f(&self.session(host)))
            .collect();
        results.into_iter().collect()
    }

    /// Run `f` once per host serving any of `roles`, one host at a time.
    ///
    /// Used directly by commands that may stop for operator input.
    pub fn for_roles_sequential<F>(&self, roles: &[Role], mut f: F) -> Result<(), DeployError>
    where
        F: FnMut(&HostSession<'_>) -> Result<(), DeployError>,
    {
        let hosts = self.target.hosts_for(roles);
        if hosts.is_empty() {
            tracing::debug!(
                "No hosts for role(s) {:?} on target `{}`",
                roles,
                self.target.name()
            );
        }

        for host in &hosts {
            f(&self.session(host))?;
        }
        Ok(())
    }
}

/// A [`DeployContext`] scoped to one host.
pub struct HostSession<'a> {
    ctx: &'a DeployContext,
    host: &'a str,
}

impl<'a> HostSession<'a> {
    pub fn host(&self) -> &str {
        self.host
    }

    pub fn target(&self) -> &Target {
        &self.ctx.target
    }

    pub fn context(&self) -> &'a DeployContext {
        self.ctx
    }

    /// Print a status line tagged with this host.
    pub fn status(&self, status: Status, msg: impl std::fmt::Display) {
        self.ctx.shell.host_status(self.host, status, msg);
    }

    fn execute(&self, command: &RemoteCommand) -> Result<CommandOutput, DeployError> {
        execute_on(self.ctx.remote.as_ref(), &self.ctx.shell, self.host, command)
    }

    /// Run a command; a non-zero exit is fatal.
    pub fn run(&self, command: RemoteCommand) -> Result<CommandOutput, DeployError> {
        let output = self.execute(&command)?;
        ensure_success(self.host, &command, output)
    }

    /// Run a command whose failure the caller inspects.
    pub fn probe(&self, command: RemoteCommand) -> Result<CommandOutput, DeployError> {
        let output = self.execute(&command)?;
        if output.failed() {
            tracing::debug!(
                "[{}] `{}` exited with {} (tolerated)",
                self.host,
                command.command(),
                output.status
            );
        }
        Ok(output)
    }

    /// Whether `path` exists on the host.
    pub fn exists(&self, path: &str) -> Result<bool, DeployError> {
        let output = self.probe(RemoteCommand::new(format!("test -e {}", shell_path(path))))?;
        Ok(output.succeeded())
    }
}

/// Send one command to `host`, mapping transport failures.
pub(crate) fn execute_on(
    remote: &dyn RemoteExecutor,
    shell: &Shell,
    host: &str,
    command: &RemoteCommand,
) -> Result<CommandOutput, DeployError> {
    shell.command(host, command.render());
    remote
        .run(host, command)
        .map_err(|e| DeployError::Transport {
            host: host.to_string(),
            reason: format!("{:#}", e),
        })
}

/// Turn a non-zero exit into [`DeployError::CommandFailed`].
pub(crate) fn ensure_success(
    host: &str,
    command: &RemoteCommand,
    output: CommandOutput,
) -> Result<CommandOutput, DeployError> {
    if output.failed() {
        return Err(DeployError::CommandFailed {
            host: host.to_string(),
            command: command.command().to_string(),
            status: output.status,
            stderr: output.stderr,
        });
    }
    Ok(output)
}
