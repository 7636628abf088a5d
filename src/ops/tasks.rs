//! Commands: procedures fanned out over the roles they apply to.

use crate::core::target::{DeployTarget, Role};
use crate::ops::{DeployContext, DeployError};
use crate::remote::RemoteExecutor;
use crate::util::git::LocalRepository;
use crate::util::shell::Status;

/// Roles that hold a working copy and a virtualenv.
pub const ALL_ROLES: &[Role] = &Role::ALL;

/// Options for `migrate`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MigrateOptions {
    /// Run `syncdb` before migrating
    pub syncdb: bool,
    /// Record migrations as applied without running them
    pub fake: bool,
}

/// Clone the repository on every host. Always sequential: a host may stop
/// for the operator to register its deploy key.
pub fn setup_repository(ctx: &DeployContext, force: bool) -> Result<(), DeployError> {
    ctx.for_roles_sequential(ALL_ROLES, |session| session.setup_repository(force))
}

pub fn setup_virtualenv(ctx: &DeployContext, force: bool) -> Result<(), DeployError> {
    ctx.for_roles(ALL_ROLES, |session| {
        session.setup_virtualenv(force)?;
        session.install_virtualenv(false)
    })
}

pub fn update_virtualenv(ctx: &DeployContext) -> Result<(), DeployError> {
    ctx.for_roles(ALL_ROLES, |session| session.install_virtualenv(true))
}

pub fn git_pull(ctx: &DeployContext) -> Result<(), DeployError> {
    ctx.for_roles(ALL_ROLES, |session| session.git_pull())
}

pub fn restart_app(ctx: &DeployContext) -> Result<(), DeployError> {
    ctx.for_roles(&[Role::App], |session| session.restart_app())
}

pub fn migrate(ctx: &DeployContext, opts: MigrateOptions) -> Result<(), DeployError> {
    ctx.for_roles(&[Role::Db], |session| {
        session.db_migrate(opts.syncdb, opts.fake)
    })
}

pub fn collectstatic(ctx: &DeployContext) -> Result<(), DeployError> {
    ctx.for_roles(&[Role::Static], |session| session.db_collectstatic())
}

/// Run a raw `manage.py` command on the hosts of one role.
pub fn manage(ctx: &DeployContext, role: Role, arguments: &str) -> Result<(), DeployError> {
    ctx.for_roles(&[role], |session| session.run_django_manage(arguments))
}

/// Push local commits, then pull and restart on the hosts.
pub fn deploy(
    ctx: &DeployContext,
    local: &dyn LocalRepository,
    local_executor: &dyn RemoteExecutor,
) -> Result<(), DeployError> {
    let span = ctx.shell().span(
        Status::Running,
        format!("deploy to `{}`", ctx.target().name()),
    );

    ctx.git_push(local, local_executor)?;
    git_pull(ctx)?;
    restart_app(ctx)?;

    span.finish_with_message(format!("deploy to `{}`", ctx.target().name()));
    Ok(())
}

/// First-time setup of every host. Runs one host at a time throughout.
pub fn setup(ctx: &DeployContext) -> Result<(), DeployError> {
    let span = ctx.shell().span(
        Status::Running,
        format!("setup of `{}`", ctx.target().name()),
    );

    setup_repository(ctx, false)?;
    ctx.for_roles_sequential(ALL_ROLES, |session| {
        session.setup_virtualenv(false)?;
        session.install_virtualenv(false)
    })?;
    ctx.for_roles_sequential(&[Role::Db], |session| session.db_migrate(true, true))?;
    ctx.for_roles_sequential(&[Role::Static], |session| session.db_collectstatic())?;
    ctx.for_roles_sequential(&[Role::App], |session| session.restart_app())?;

    span.finish_with_message(format!("setup of `{}`", ctx.target().name()));
    Ok(())
}
