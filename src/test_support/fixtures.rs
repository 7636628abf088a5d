//! Test fixtures: sample manifests, targets and wired-up contexts.

use std::sync::Arc;

use crate::core::manifest::TargetManifest;
use crate::core::registry::TargetRegistry;
use crate::core::target::{BasicTarget, GitSettings, SimpleTarget, Target};
use crate::ops::DeployContext;
use crate::test_support::{MockPrompter, MockRemote};
use crate::util::shell::{Shell, ShellMode};

/// A manifest with one target of each kind.
pub const SAMPLE_MANIFEST: &str = r#"
[defaults]
git-repository = "git@example.com:acme/site.git"
git-branch = "master"

[targets.production]
kind = "basic"
repository-dir = "/srv/site"
siteconfig-dir = "/srv/site/siteconfig"
virtualenv-dir = "/srv/venv"
media-dir = "/srv/media"
static-dir = "/srv/static"
app-servers = ["app1", "app2"]
db-servers = "db1"
static-servers = ["static1"]
deploy-env = "production"

[targets.staging]
kind = "simple"
server = "stage.example.com"
git-branch = "release"
deploy-env = "stage"
"#;

/// The `production` target from [`SAMPLE_MANIFEST`].
///
/// Hosts: app `app1, app2`, db `db1`, static `static1`.
pub fn basic_target() -> Target {
    let manifest = TargetManifest::parse(SAMPLE_MANIFEST).unwrap();
    TargetRegistry::discover(&manifest)
        .resolve("production")
        .unwrap()
        .build()
        .unwrap()
}

/// A single-host target on `host1` deploying `branch`.
pub fn simple_target(branch: &str) -> Target {
    let git = GitSettings {
        git_repository: "git@example.com:acme/site.git".to_string(),
        git_branch: branch.to_string(),
        ..GitSettings::default()
    };
    SimpleTarget::new("staging", "host1", git)
        .with_deploy_env("stage")
        .into()
}

/// A basic target with no static servers.
pub fn target_without_static() -> Target {
    let settings: toml::Table = r#"
git-repository = "git@example.com:acme/site.git"
git-branch = "master"
repository-dir = "/srv/site"
siteconfig-dir = "/srv/site/siteconfig"
virtualenv-dir = "/srv/venv"
media-dir = "/srv/media"
static-dir = "/srv/static"
app-servers = "app1"
db-servers = "app1"
"#
    .parse()
    .unwrap();
    BasicTarget::from_settings("compact", settings).unwrap().into()
}

/// A shell that prints only refusals, warnings and errors.
pub fn quiet_shell() -> Shell {
    Shell::quiet()
}

/// A context around `remote` with a quiet shell and a confirming prompter.
pub fn context_with(target: Target, remote: MockRemote) -> DeployContext {
    context_with_prompter(target, remote, MockPrompter::new())
}

pub fn context_with_prompter(
    target: Target,
    remote: MockRemote,
    prompter: MockPrompter,
) -> DeployContext {
    DeployContext::new(
        target,
        Arc::new(remote),
        Arc::new(quiet_shell()),
        Arc::new(prompter),
    )
}

/// A context whose shell records every status line as a JSON event.
pub fn json_context(target: Target, remote: MockRemote) -> (DeployContext, Arc<Shell>) {
    let shell = Arc::new(Shell::new(ShellMode::Json));
    let ctx = DeployContext::new(
        target,
        Arc::new(remote),
        Arc::clone(&shell),
        Arc::new(MockPrompter::new()),
    );
    (ctx, shell)
}
