//! Quay CLI - remote deployment for Django sites

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands, MessageFormat};
use commands::Invocation;
use quay::core::errors::TargetError;
use quay::core::manifest::ManifestError;
use quay::ops::DeployError;
use quay::util::diagnostic::{emit, Diagnostic};
use quay::util::shell::Shell;

fn main() {
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("quay=debug")
    } else {
        EnvFilter::new("quay=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let shell = Arc::new(Shell::from_flags(
        cli.quiet,
        cli.verbose,
        cli.color,
        cli.message_format == MessageFormat::Json,
    ));

    if let Err(e) = run(cli, &shell) {
        report(&e, &shell);
        std::process::exit(1);
    }
}

fn run(cli: Cli, shell: &Arc<Shell>) -> Result<()> {
    if let Commands::Completions(args) = cli.command {
        return commands::completions::execute(args);
    }

    let inv = Invocation::new(&cli, Arc::clone(shell))?;

    // Execute command
    match cli.command {
        Commands::Target(args) => commands::target::select(&inv, &args.name),
        Commands::ListTargets => commands::target::list(&inv),
        Commands::SetupRepository(args) => commands::tasks::setup_repository(&inv, args.force),
        Commands::SetupVirtualenv(args) => commands::tasks::setup_virtualenv(&inv, args.force),
        Commands::UpdateVirtualenv => commands::tasks::update_virtualenv(&inv),
        Commands::GitPull => commands::tasks::git_pull(&inv),
        Commands::RestartApp => commands::tasks::restart_app(&inv),
        Commands::Deploy => commands::tasks::deploy(&inv),
        Commands::Migrate(args) => commands::tasks::migrate(&inv, args),
        Commands::Collectstatic => commands::tasks::collectstatic(&inv),
        Commands::Setup => commands::tasks::setup(&inv),
        Commands::AppManage(args) => commands::tasks::manage(&inv, quay::Role::App, args),
        Commands::DbManage(args) => commands::tasks::manage(&inv, quay::Role::Db, args),
        Commands::StaticManage(args) => commands::tasks::manage(&inv, quay::Role::Static, args),
        Commands::PushKey(args) => commands::push_key::execute(&inv, args, None),
        Commands::PushKeySudo(args) => commands::push_key::execute(&inv, args.key, Some(args.user)),
        Commands::Check => commands::check::execute(&inv),
        Commands::Completions(_) => Ok(()),
    }
}

/// Print a fatal error, as a rendered diagnostic when it carries one.
fn report(err: &anyhow::Error, shell: &Shell) {
    if shell.is_json() {
        shell.json_event(&serde_json::json!({
            "reason": "error",
            "message": format!("{:#}", err),
        }));
    }

    let diagnostic: Option<Diagnostic> = if let Some(e) = err.downcast_ref::<DeployError>() {
        Some(e.to_diagnostic())
    } else if let Some(e) = err.downcast_ref::<TargetError>() {
        Some(e.to_diagnostic())
    } else {
        err.downcast_ref::<ManifestError>()
            .map(ManifestError::to_diagnostic)
    };

    match diagnostic {
        Some(diag) => emit(&diag, shell.use_color()),
        None => eprintln!("error: {:#}", err),
    }
}
