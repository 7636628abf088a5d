//! Publishing the operator's commits to the central repository.

use crate::core::target::DeployTarget;
use crate::ops::{ensure_success, execute_on, DeployContext, DeployError};
use crate::remote::{shell_quote, RemoteCommand, RemoteExecutor};
use crate::util::git::{LocalRepository, NO_BRANCH};
use crate::util::shell::Status;

/// Host label used for commands run on the operator's machine.
pub const LOCAL_HOST: &str = "local";

impl DeployContext {
    /// Push the configured branch from the local checkout.
    ///
    /// Being on another branch or having uncommitted changes only warns; the
    /// push itself failing is fatal.
    pub fn git_push(
        &self,
        local: &dyn LocalRepository,
        executor: &dyn RemoteExecutor,
    ) -> Result<(), DeployError> {
        let target = self.target();
        let branch = target.git_branch();
        let shell = self.shell();

        let current = local
            .current_branch()
            .unwrap_or_else(|| NO_BRANCH.to_string());
        if current != branch {
            shell.warn(format!(
                "*** WARNING *** Local branch is \"{}\". However, only branch \"{}\" will be pushed.",
                current, branch
            ));
        }

        match local.has_uncommitted_changes() {
            Ok(true) => shell.warn(format!(
                "*** WARNING *** You have uncommitted changes. Unless you commit and merge them to \"{}\", they will not be deployed!",
                branch
            )),
            Ok(false) => {}
            Err(e) => tracing::warn!("Could not read local working copy status: {:#}", e),
        }

        shell.status(
            Status::Pushing,
            format!("{} to {}", branch, target.git_remote()),
        );
        let command = RemoteCommand::new(format!(
            "git push {} {b}:{b}",
            shell_quote(target.git_remote()),
            b = shell_quote(branch)
        ))
        .cwd(local.workdir().to_string_lossy());

        let output = execute_on(executor, shell, LOCAL_HOST, &command)?;
        ensure_success(LOCAL_HOST, &command, output)?;
        Ok(())
    }
}
