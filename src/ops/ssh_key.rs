//! SSH key handling: the hosts' deploy keys and the operator's login key.

use std::path::PathBuf;

use crate::ops::{ensure_success, execute_on, DeployError, HostSession};
use crate::remote::{shell_quote, RemoteCommand, RemoteExecutor};
use crate::util::shell::{Shell, Status};

/// Deploy key generated on each host for cloning the central repository.
const HOST_PRIVATE_KEY: &str = "~/.ssh/id_rsa";
const HOST_PUBLIC_KEY: &str = "~/.ssh/id_rsa.pub";

/// Shown while the operator registers a freshly generated deploy key.
pub const ADD_KEY_PROMPT: &str =
    "Please add this SSH key to the repository and press enter to continue...";

impl HostSession<'_> {
    /// Make sure the host has a deploy key, generating one if needed.
    ///
    /// A new key blocks the invocation until the operator confirms it has been
    /// added to the central repository. The generated key is kept even if the
    /// prompt is interrupted.
    pub fn check_ssh_key(&self) -> Result<(), DeployError> {
        if self.exists(HOST_PRIVATE_KEY)? {
            return Ok(());
        }

        self.status(Status::Generating, "Creating SSH private key");
        self.run(RemoteCommand::new(format!(
            "ssh-keygen -q -N '' -f {}",
            HOST_PRIVATE_KEY
        )))?;

        let public_key = self.read_public_key()?;
        self.status(Status::Created, "SSH key pair. The public key is:");
        self.context().shell().print_block(&public_key);

        self.context()
            .prompter()
            .pause(ADD_KEY_PROMPT)
            .map_err(|e| DeployError::Prompt(format!("{:#}", e)))
    }

    /// The host's deploy public key.
    pub fn read_public_key(&self) -> Result<String, DeployError> {
        let output = self.run(RemoteCommand::new(format!("cat {}", HOST_PUBLIC_KEY)))?;
        Ok(output.stdout_trimmed().to_string())
    }
}

/// Expand a leading `~` to the operator's home directory.
fn expand_home(path: &str) -> PathBuf {
    let home = directories::BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf());
    match (path.strip_prefix('~'), home) {
        (Some(""), Some(home)) => home,
        (Some(rest), Some(home)) if rest.starts_with('/') => home.join(&rest[1..]),
        _ => PathBuf::from(path),
    }
}

/// Read the public half of a key pair.
///
/// The file name must end in `pub`; this is checked before the file is opened.
pub fn read_key_file(key_file: &str) -> Result<String, DeployError> {
    let path = expand_home(key_file);
    if !path.to_string_lossy().ends_with("pub") {
        return Err(DeployError::InvalidKeyFile { path });
    }

    let contents = std::fs::read_to_string(&path)
        .map_err(|err| DeployError::KeyFileUnreadable { path: path.clone(), err })?;
    Ok(contents.trim().to_string())
}

/// Options for `push-key` and `push-key-sudo`.
#[derive(Debug, Clone)]
pub struct PushKeyOptions {
    /// Public key file on the operator's machine
    pub key_file: String,

    /// Hosts to authorize the key on
    pub hosts: Vec<String>,

    /// Authorize for this account through sudo instead of the login user
    pub sudo_user: Option<String>,
}

/// Append the operator's public key to `authorized_keys` on every host.
pub fn push_key(
    remote: &dyn RemoteExecutor,
    shell: &Shell,
    opts: &PushKeyOptions,
) -> Result<(), DeployError> {
    let key = read_key_file(&opts.key_file)?;

    let ssh_dir = match opts.sudo_user {
        Some(ref user) => format!("~{}/.ssh", user),
        None => "~/.ssh".to_string(),
    };
    let commands = [
        format!("mkdir -p {dir} && chmod 0700 {dir}", dir = ssh_dir),
        format!("echo {} >> {}/authorized_keys", shell_quote(&key), ssh_dir),
    ];

    for host in &opts.hosts {
        shell.host_status(host, Status::Pushing, format!("public key from {}", opts.key_file));
        for command in &commands {
            let mut command = RemoteCommand::new(command.as_str());
            if let Some(ref user) = opts.sudo_user {
                command = command.sudo_as(user.as_str());
            }
            let output = execute_on(remote, shell, host, &command)?;
            ensure_success(host, &command, output)?;
        }
    }

    Ok(())
}
