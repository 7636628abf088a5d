//! Executor for commands on the operator's machine.
//!
//! `git push` runs through it from the local checkout. The host name is only
//! logged; commands run through `sh -c` from a fixed working directory.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::remote::{CommandOutput, RemoteCommand, RemoteExecutor};
use crate::util::process::ProcessBuilder;

#[derive(Debug, Clone)]
pub struct LocalExecutor {
    workdir: PathBuf,
}

impl LocalExecutor {
    pub fn new(workdir: impl AsRef<Path>) -> Self {
        LocalExecutor {
            workdir: workdir.as_ref().to_path_buf(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }
}

impl RemoteExecutor for LocalExecutor {
    fn run(&self, host: &str, command: &RemoteCommand) -> Result<CommandOutput> {
        let script = command.render();
        tracing::debug!("[{} (local)] {}", host, script);

        let output = ProcessBuilder::new("sh")
            .arg("-c")
            .arg(&script)
            .cwd(&self.workdir)
            .exec()?;
        Ok(output.into())
    }
}
