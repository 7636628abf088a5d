//! `quay push-key` and `quay push-key-sudo` commands

use anyhow::Result;

use super::Invocation;
use crate::cli::PushKeyArgs;
use quay::core::target::{DeployTarget, Role};
use quay::ops::{push_key, PushKeyOptions};

pub fn execute(inv: &Invocation, args: PushKeyArgs, sudo_user: Option<String>) -> Result<()> {
    let key_file = args
        .key_file
        .unwrap_or_else(|| inv.config.public_key().to_string());

    let hosts = if args.hosts.is_empty() {
        inv.selected_target()?.hosts_for(&Role::ALL)
    } else {
        args.hosts
    };

    let opts = PushKeyOptions {
        key_file,
        hosts,
        sudo_user,
    };

    push_key(&inv.ssh_executor()?, &inv.shell, &opts)?;
    Ok(())
}
