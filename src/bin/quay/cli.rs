//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell as CompletionShell;

use quay::util::shell::ColorChoice;

/// Quay - remote deployment for Django sites
#[derive(Parser)]
#[command(name = "quay")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Deploy target to operate on
    #[arg(short, long, global = true, env = "QUAY_TARGET", value_name = "NAME")]
    pub target: Option<String>,

    /// Path to Quay.toml
    #[arg(long, global = true, value_name = "PATH")]
    pub manifest_path: Option<PathBuf>,

    /// Run non-interactive commands on all hosts of a role at once
    #[arg(long, global = true)]
    pub parallel: bool,

    /// Enable verbose output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only print refusals, warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Coloring: auto, always, never
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    pub color: ColorChoice,

    /// Output format for status messages
    #[arg(long, global = true, value_enum, default_value_t = MessageFormat::Human)]
    pub message_format: MessageFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MessageFormat {
    Human,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Select a deploy target and show its hosts
    #[command(visible_alias = "t")]
    Target(TargetArgs),

    /// List the deploy targets defined in Quay.toml
    #[command(alias = "list_targets")]
    ListTargets,

    /// Clone the repository on every host
    #[command(alias = "setup_repository")]
    SetupRepository(ForceArgs),

    /// Create the virtualenv on every host and install requirements
    #[command(alias = "setup_virtualenv")]
    SetupVirtualenv(ForceArgs),

    /// Upgrade the requirements in every virtualenv
    #[command(alias = "update_virtualenv")]
    UpdateVirtualenv,

    /// Fast-forward the repository on every host
    #[command(alias = "git_pull")]
    GitPull,

    /// Restart the application servers
    #[command(alias = "restart_app")]
    RestartApp,

    /// Push local commits, pull them on every host and restart
    Deploy,

    /// Run database migrations on the database servers
    Migrate(MigrateArgs),

    /// Collect static files on the static servers
    Collectstatic,

    /// Set up every host from scratch
    Setup,

    /// Run a manage.py command on the application servers
    #[command(alias = "app_manage")]
    AppManage(ManageArgs),

    /// Run a manage.py command on the database servers
    #[command(alias = "db_manage")]
    DbManage(ManageArgs),

    /// Run a manage.py command on the static servers
    #[command(alias = "static_manage")]
    StaticManage(ManageArgs),

    /// Authorize a public key for the login user on the hosts
    #[command(alias = "push_key")]
    PushKey(PushKeyArgs),

    /// Authorize a public key for another account on the hosts
    #[command(alias = "push_key_sudo")]
    PushKeySudo(PushKeySudoArgs),

    /// Check that a deploy can start from this machine
    Check,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct TargetArgs {
    /// Target name as defined in Quay.toml
    pub name: String,
}

#[derive(Args)]
pub struct ForceArgs {
    /// Remove and recreate it if it already exists
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct MigrateArgs {
    /// Run syncdb first
    #[arg(long)]
    pub syncdb: bool,

    /// Mark migrations as applied without running them
    #[arg(long)]
    pub fake: bool,
}

#[derive(Args)]
pub struct ManageArgs {
    /// Arguments passed to manage.py
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

#[derive(Args)]
pub struct PushKeyArgs {
    /// Public key file (defaults to ~/.ssh/id_rsa.pub)
    pub key_file: Option<String>,

    /// Host to push to; repeatable (defaults to every host of the target)
    #[arg(short = 'H', long = "host", value_name = "HOST")]
    pub hosts: Vec<String>,
}

#[derive(Args)]
pub struct PushKeySudoArgs {
    /// Account whose authorized_keys receives the key
    #[arg(value_parser = parse_account)]
    pub user: String,

    #[command(flatten)]
    pub key: PushKeyArgs,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: CompletionShell,
}

/// Account names end up inside `~user` on the remote side.
fn parse_account(s: &str) -> Result<String, String> {
    let valid = !s.is_empty()
        && !s.starts_with('-')
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(s.to_string())
    } else {
        Err(format!("`{}` is not a valid account name", s))
    }
}
