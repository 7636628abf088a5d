//! Django management commands and the application server.

use crate::core::target::{remote_join, DeployTarget};
use crate::ops::virtualenv::activate_prefix;
use crate::ops::{DeployError, HostSession};
use crate::remote::{shell_path, shell_quote, RemoteCommand};
use crate::util::shell::Status;

/// Variable the project's settings read to pick an environment.
pub const DEPLOY_ENV_VAR: &str = "DJANGO_DEPLOY_ENV";

/// Rejoin command-line words into one argument string the remote shell
/// splits back into the same words.
pub fn join_arguments<S: AsRef<str>>(words: &[S]) -> String {
    words
        .iter()
        .map(|word| shell_quote(word.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

impl HostSession<'_> {
    /// Run `./manage.py <arguments>` in the repository, inside the virtualenv.
    ///
    /// `arguments` is passed to the remote shell as written.
    pub fn run_django_manage(&self, arguments: &str) -> Result<(), DeployError> {
        let target = self.target();
        self.status(Status::Running, format!("manage.py {}", arguments));

        self.run(
            RemoteCommand::new(format!("./manage.py {}", arguments))
                .cwd(target.repository_dir())
                .prefix(activate_prefix(&target.virtualenv_dir()))
                .env(DEPLOY_ENV_VAR, target.deploy_env()),
        )?;
        Ok(())
    }

    /// Create and migrate the schema.
    ///
    /// `fake` marks migrations as applied without running them, for databases
    /// created by a full `syncdb`.
    pub fn db_migrate(&self, syncdb: bool, fake: bool) -> Result<(), DeployError> {
        if syncdb {
            self.run_django_manage(if fake { "syncdb --all" } else { "syncdb" })?;
        }
        self.run_django_manage(if fake { "migrate --fake" } else { "migrate" })
    }

    pub fn db_collectstatic(&self) -> Result<(), DeployError> {
        self.run_django_manage("collectstatic --noinput -v 0")
    }

    /// Restart the application server by touching the WSGI entry point.
    pub fn restart_app(&self) -> Result<(), DeployError> {
        let wsgi = remote_join(&self.target().siteconfig_dir(), "wsgi.py");
        self.status(Status::Restarting, "application server");
        self.run(RemoteCommand::new(format!("touch {}", shell_path(&wsgi))))?;
        Ok(())
    }
}
