//! `quay check` command

use std::path::Path;

use anyhow::Result;

use super::Invocation;
use quay::ops::{check, format_report, CheckOptions};

pub fn execute(inv: &Invocation) -> Result<()> {
    let options = CheckOptions {
        cwd: inv.gctx.cwd().to_path_buf(),
        manifest_path: inv.manifest_path().map(Path::to_path_buf),
        target: inv.target_name().map(str::to_string),
        ssh_program: inv.config.ssh.program.clone(),
    };

    let report = check(&options);

    // Print the formatted report
    print!("{}", format_report(&report, inv.shell.is_verbose()));

    // Exit with error code if required checks failed
    if !report.all_required_passed() {
        std::process::exit(1);
    }

    Ok(())
}
