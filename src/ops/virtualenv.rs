//! Python virtualenv on each host.

use crate::core::target::{remote_join, DeployTarget};
use crate::ops::{DeployError, HostSession};
use crate::remote::{shell_path, RemoteCommand};
use crate::util::shell::Status;

/// Shell prefix that activates the target's virtualenv.
pub(crate) fn activate_prefix(virtualenv_dir: &str) -> String {
    format!("source {}", shell_path(&remote_join(virtualenv_dir, "bin/activate")))
}

impl HostSession<'_> {
    /// Create the virtualenv. Existing ones are kept unless `force` is set.
    pub fn setup_virtualenv(&self, force: bool) -> Result<(), DeployError> {
        let venv = self.target().virtualenv_dir();

        if self.exists(&venv)? {
            if !force {
                self.status(
                    Status::Refused,
                    "Virtualenv already exists. Refusing to recreate it.",
                );
                return Ok(());
            }
            self.status(
                Status::Forcing,
                "Virtualenv already exists. Forced removing it.",
            );
            self.run(RemoteCommand::new(format!("rm -rf {}", shell_path(&venv))))?;
        }

        self.status(Status::Created, format!("virtualenv {}", venv));
        self.run(RemoteCommand::new(format!(
            "virtualenv --no-site-packages {}",
            shell_path(&venv)
        )))?;
        Ok(())
    }

    /// Install the requirements file into the virtualenv, upgrading with `update`.
    pub fn install_virtualenv(&self, update: bool) -> Result<(), DeployError> {
        let target = self.target();
        let venv = target.virtualenv_dir();
        let requirements = remote_join(&target.repository_dir(), "requirements.txt");

        if !self.exists(&venv)? {
            self.status(
                Status::Refused,
                "Cannot find virtualenv. Run setup-virtualenv first!",
            );
            return Ok(());
        }

        if !self.exists(&requirements)? {
            self.status(Status::Refused, "Cannot find requirements file.");
            return Ok(());
        }

        self.status(
            Status::Running,
            if update { "pip install -U" } else { "pip install" },
        );
        let upgrade = if update { " -U" } else { "" };
        self.run(
            RemoteCommand::new(format!(
                "pip install{} -r {}",
                upgrade,
                shell_path(&requirements)
            ))
            .prefix(activate_prefix(&venv)),
        )?;
        Ok(())
    }
}
