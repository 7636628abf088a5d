//! Commands that fan procedures out over the target's hosts

use anyhow::Result;

use super::Invocation;
use crate::cli::{ManageArgs, MigrateArgs};
use quay::core::target::Role;
use quay::ops::manage::join_arguments;
use quay::ops::tasks::{self, MigrateOptions};
use quay::remote::local::LocalExecutor;
use quay::util::git::{GitWorkingCopy, LocalRepository};

pub fn setup_repository(inv: &Invocation, force: bool) -> Result<()> {
    tasks::setup_repository(&inv.deploy_context()?, force)?;
    Ok(())
}

pub fn setup_virtualenv(inv: &Invocation, force: bool) -> Result<()> {
    tasks::setup_virtualenv(&inv.deploy_context()?, force)?;
    Ok(())
}

pub fn update_virtualenv(inv: &Invocation) -> Result<()> {
    tasks::update_virtualenv(&inv.deploy_context()?)?;
    Ok(())
}

pub fn git_pull(inv: &Invocation) -> Result<()> {
    tasks::git_pull(&inv.deploy_context()?)?;
    Ok(())
}

pub fn restart_app(inv: &Invocation) -> Result<()> {
    tasks::restart_app(&inv.deploy_context()?)?;
    Ok(())
}

pub fn migrate(inv: &Invocation, args: MigrateArgs) -> Result<()> {
    let opts = MigrateOptions {
        syncdb: args.syncdb,
        fake: args.fake,
    };
    tasks::migrate(&inv.deploy_context()?, opts)?;
    Ok(())
}

pub fn collectstatic(inv: &Invocation) -> Result<()> {
    tasks::collectstatic(&inv.deploy_context()?)?;
    Ok(())
}

pub fn setup(inv: &Invocation) -> Result<()> {
    tasks::setup(&inv.deploy_context()?)?;
    Ok(())
}

pub fn manage(inv: &Invocation, role: Role, args: ManageArgs) -> Result<()> {
    tasks::manage(&inv.deploy_context()?, role, &join_arguments(&args.args))?;
    Ok(())
}

/// `git push` runs from the checkout containing the current directory.
pub fn deploy(inv: &Invocation) -> Result<()> {
    let ctx = inv.deploy_context()?;
    let local = GitWorkingCopy::discover(inv.gctx.cwd())?;
    let executor = LocalExecutor::new(local.workdir());

    tasks::deploy(&ctx, &local, &executor)?;
    Ok(())
}
