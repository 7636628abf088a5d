//! Command implementations

pub mod check;
pub mod completions;
pub mod push_key;
pub mod target;
pub mod tasks;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::cli::Cli;
use quay::core::errors::TargetError;
use quay::core::manifest::TargetManifest;
use quay::core::registry::{TargetRegistry, TARGETS};
use quay::core::target::Target;
use quay::ops::DeployContext;
use quay::remote::ssh::SshExecutor;
use quay::util::config::{load_config, Config};
use quay::util::prompt::TerminalPrompter;
use quay::util::shell::Shell;
use quay::GlobalContext;

/// State shared by every command of one invocation.
pub struct Invocation {
    pub gctx: GlobalContext,
    pub config: Config,
    pub shell: Arc<Shell>,
    target: Option<String>,
    parallel: bool,
}

impl Invocation {
    pub fn new(cli: &Cli, shell: Arc<Shell>) -> Result<Self> {
        let gctx = GlobalContext::new()?.with_manifest_path(cli.manifest_path.clone());
        let config = load_config(&gctx.config_path(), &gctx.project_config_path());

        Ok(Invocation {
            gctx,
            config,
            shell,
            target: cli.target.clone(),
            parallel: cli.parallel,
        })
    }

    /// Target name given with `--target` or `QUAY_TARGET`.
    pub fn target_name(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn manifest_path(&self) -> Option<&Path> {
        self.gctx.manifest_path()
    }

    /// Load `Quay.toml` and discover its targets, once per process.
    pub fn registry(&self) -> Result<&'static TargetRegistry> {
        if let Some(registry) = TARGETS.get() {
            return Ok(registry);
        }

        let manifest = TargetManifest::load(&self.gctx.find_manifest()?)?;

        Ok(TARGETS.populate(|| TargetRegistry::discover(&manifest)))
    }

    /// Construct and validate the named target.
    pub fn build_target(&self, name: &str) -> Result<Target> {
        let target = self.registry()?.resolve(name)?.build()?;
        Ok(target)
    }

    /// The target selected on the command line.
    pub fn selected_target(&self) -> Result<Target> {
        match self.target {
            Some(ref name) => self.build_target(name),
            None => {
                let available = self.registry()?.names().map(str::to_string).collect();
                Err(TargetError::NoneSelected { available }.into())
            }
        }
    }

    /// The ssh transport described by the `[ssh]` config section.
    pub fn ssh_executor(&self) -> Result<SshExecutor> {
        SshExecutor::from_config(&self.config.ssh).context("cannot reach remote hosts")
    }

    /// Bind the selected target to the ssh transport and the terminal.
    pub fn deploy_context(&self) -> Result<DeployContext> {
        let target = self.selected_target()?;
        let executor = self.ssh_executor()?;

        Ok(DeployContext::new(
            target,
            Arc::new(executor),
            Arc::clone(&self.shell),
            Arc::new(TerminalPrompter),
        )
        .with_parallel(self.parallel || self.config.parallel()))
    }
}
