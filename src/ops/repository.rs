//! The git working copy on each host.

use crate::core::target::{DeployTarget, DEFAULT_BRANCH};
use crate::ops::{DeployError, HostSession};
use crate::remote::{shell_path, shell_quote, RemoteCommand};
use crate::util::git::NO_BRANCH;
use crate::util::shell::Status;

/// Remote name a fresh clone gives the central repository.
const CLONE_REMOTE: &str = "origin";

impl HostSession<'_> {
    /// Clone the central repository on this host.
    ///
    /// An existing working copy is left untouched unless `force` is set, in
    /// which case it is deleted first.
    pub fn setup_repository(&self, force: bool) -> Result<(), DeployError> {
        let target = self.target();
        let repo = target.repository_dir();

        if self.exists(&repo)? {
            if !force {
                self.status(
                    Status::Refused,
                    "Repository already exists. Refusing to recreate it.",
                );
                return Ok(());
            }
            self.status(
                Status::Forcing,
                "Repository already exists. Forced removing it.",
            );
            self.run(RemoteCommand::new(format!("rm -rf {}", shell_path(&repo))))?;
        }

        self.check_ssh_key()?;

        self.status(
            Status::Cloning,
            format!("{} into {}", target.git_repository(), repo),
        );
        let clone = self.probe(RemoteCommand::new(format!(
            "git clone {} {}",
            shell_quote(target.git_repository()),
            shell_path(&repo)
        )))?;

        if clone.failed() {
            let public_key = self.read_public_key()?;
            self.status(
                Status::Error,
                "Failed to clone repository! The host's SSH public key is:",
            );
            self.context().shell().print_block(&public_key);
            return Err(DeployError::CloneFailed {
                host: self.host().to_string(),
                repository: target.git_repository().to_string(),
                public_key,
            });
        }

        let branch = target.git_branch();
        if branch != DEFAULT_BRANCH {
            self.run(tracking_checkout(branch).cwd(repo))?;
        }

        Ok(())
    }

    /// Fast-forward the working copy to the configured branch.
    ///
    /// Refuses to touch a working copy with staged or unstaged changes, and
    /// moves HEAD to the configured branch first if needed.
    pub fn git_pull(&self) -> Result<(), DeployError> {
        let target = self.target();
        let repo = target.repository_dir();
        let branch = target.git_branch();
        let in_repo = |command: String| RemoteCommand::new(command).cwd(repo.as_str());

        self.probe(in_repo(
            "git update-index -q --ignore-submodules --refresh".to_string(),
        ))?;
        let unstaged = self.probe(in_repo(
            "git diff-files --quiet --ignore-submodules".to_string(),
        ))?;
        let staged = self.probe(in_repo(
            "git diff-index --cached --quiet HEAD --ignore-submodules --".to_string(),
        ))?;
        if unstaged.failed() || staged.failed() {
            self.status(
                Status::Error,
                "There are uncommitted changes in the remote repository. Will not continue.",
            );
            return Err(DeployError::DirtyRepository {
                host: self.host().to_string(),
                dir: repo.clone(),
            });
        }

        let head = self.probe(in_repo("git symbolic-ref HEAD".to_string()))?;
        let current = if head.failed() {
            NO_BRANCH.to_string()
        } else {
            let head = head.stdout_trimmed();
            head.strip_prefix("refs/heads/").unwrap_or(head).to_string()
        };

        if current != branch {
            self.status(
                Status::Correcting,
                format!(
                    "Repository should be on branch {} but is on {}. Correcting.",
                    branch, current
                ),
            );
            let checkout = self.probe(in_repo(format!("git checkout {}", shell_quote(branch))))?;
            if checkout.failed() {
                self.status(
                    Status::Correcting,
                    "Checkout failed. Trying to update branches",
                );
                self.run(in_repo("git remote update".to_string()))?;
                self.run(tracking_checkout(branch).cwd(repo.as_str()))?;
            }
        }

        self.status(Status::Pulling, "Pulling changes");
        let pull = self.probe(in_repo(format!(
            "git pull --ff-only {} {b}:{b}",
            CLONE_REMOTE,
            b = shell_quote(branch)
        )))?;
        if pull.failed() {
            return Err(DeployError::PullRejected {
                host: self.host().to_string(),
                branch: branch.to_string(),
                stderr: pull.stderr,
            });
        }

        Ok(())
    }
}

/// Create `branch` tracking the clone's remote branch of the same name.
fn tracking_checkout(branch: &str) -> RemoteCommand {
    let branch = shell_quote(branch);
    RemoteCommand::new(format!(
        "git checkout -b {b} {}/{b}",
        CLONE_REMOTE,
        b = branch
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::CommandOutput;
    use crate::test_support::{basic_target, context_with, simple_target, MockRemote};

    const UPDATE_INDEX: &str = "git update-index -q --ignore-submodules --refresh";
    const DIFF_FILES: &str = "git diff-files --quiet --ignore-submodules";
    const DIFF_INDEX: &str = "git diff-index --cached --quiet HEAD --ignore-submodules --";
    const SYMBOLIC_REF: &str = "git symbolic-ref HEAD";

    fn status(dirty: bool) -> CommandOutput {
        if dirty {
            CommandOutput::failure(1, "")
        } else {
            CommandOutput::success("")
        }
    }

    #[test]
    fn test_git_pull_never_pulls_a_dirty_repository() {
        for (unstaged, staged) in [(true, false), (false, true), (true, true)] {
            let remote = MockRemote::permissive();
            remote.expect(DIFF_FILES, status(unstaged));
            remote.expect(DIFF_INDEX, status(staged));
            let ctx = context_with(basic_target(), remote.clone());

            let err = ctx.session("app1").git_pull().unwrap_err();
            assert!(matches!(err, DeployError::DirtyRepository { .. }));
            assert!(
                !remote.commands().iter().any(|c| c.starts_with("git pull")),
                "pulled with unstaged={} staged={}",
                unstaged,
                staged
            );
        }
    }

    #[test]
    fn test_git_pull_on_clean_branch_only_pulls() {
        let remote = MockRemote::permissive();
        remote.expect(SYMBOLIC_REF, CommandOutput::success("refs/heads/master\n"));
        let ctx = context_with(basic_target(), remote.clone());

        ctx.session("app1").git_pull().unwrap();

        assert_eq!(
            remote.commands(),
            vec![
                UPDATE_INDEX,
                DIFF_FILES,
                DIFF_INDEX,
                SYMBOLIC_REF,
                "git pull --ff-only origin master:master",
            ]
        );
        assert!(remote
            .calls()
            .iter()
            .all(|(_, cmd)| cmd.working_dir() == Some("/srv/site")));
    }

    #[test]
    fn test_git_pull_corrects_branch_with_plain_checkout() {
        let remote = MockRemote::permissive();
        remote.expect(SYMBOLIC_REF, CommandOutput::success("refs/heads/master\n"));
        let ctx = context_with(simple_target("release"), remote.clone());

        ctx.session("host1").git_pull().unwrap();

        let commands = remote.commands();
        assert_eq!(commands[4], "git checkout release");
        assert_eq!(commands[5], "git pull --ff-only origin release:release");
        assert_eq!(commands.len(), 6);
    }

    #[test]
    fn test_git_pull_falls_back_to_tracking_branch() {
        let remote = MockRemote::permissive();
        remote.expect(SYMBOLIC_REF, CommandOutput::success("refs/heads/master\n"));
        remote.expect(
            "git checkout release",
            CommandOutput::failure(1, "error: pathspec 'release' did not match"),
        );
        let ctx = context_with(simple_target("release"), remote.clone());

        ctx.session("host1").git_pull().unwrap();

        assert_eq!(
            &remote.commands()[4..],
            [
                "git checkout release",
                "git remote update",
                "git checkout -b release origin/release",
                "git pull --ff-only origin release:release",
            ]
        );
    }

    #[test]
    fn test_detached_head_counts_as_off_branch() {
        let remote = MockRemote::permissive();
        remote.expect(SYMBOLIC_REF, CommandOutput::failure(128, "fatal: ref HEAD is not a symbolic ref"));
        let ctx = context_with(basic_target(), remote.clone());

        ctx.session("app1").git_pull().unwrap();
        assert!(remote.commands().contains(&"git checkout master".to_string()));
    }

    #[test]
    fn test_rejected_pull_is_fatal() {
        let remote = MockRemote::permissive();
        remote.expect(SYMBOLIC_REF, CommandOutput::success("refs/heads/master"));
        remote.expect_prefix(
            "git pull",
            CommandOutput::failure(1, "fatal: Not possible to fast-forward, aborting."),
        );
        let ctx = context_with(basic_target(), remote.clone());

        let err = ctx.session("app1").git_pull().unwrap_err();
        assert!(matches!(err, DeployError::PullRejected { ref branch, .. } if branch == "master"));
    }

    #[test]
    fn test_setup_repository_refuses_existing_without_force() {
        let remote = MockRemote::new();
        remote.expect("test -e /srv/site", CommandOutput::success(""));
        let ctx = context_with(basic_target(), remote.clone());

        ctx.session("app1").setup_repository(false).unwrap();
        assert_eq!(remote.commands(), vec!["test -e /srv/site"]);
    }

    #[test]
    fn test_setup_repository_force_deletes_before_clone() {
        let remote = MockRemote::permissive();
        let ctx = context_with(basic_target(), remote.clone());

        ctx.session("app1").setup_repository(true).unwrap();

        let commands = remote.commands();
        let rm = commands.iter().position(|c| c == "rm -rf /srv/site").unwrap();
        let clone = commands
            .iter()
            .position(|c| c.starts_with("git clone"))
            .unwrap();
        assert!(rm < clone);
        assert_eq!(
            commands[clone],
            "git clone git@example.com:acme/site.git /srv/site"
        );
    }

    #[test]
    fn test_setup_repository_checks_out_non_master_branch() {
        let remote = MockRemote::permissive();
        remote.expect("test -e ~/project", CommandOutput::failure(1, ""));
        let ctx = context_with(simple_target("release"), remote.clone());

        ctx.session("host1").setup_repository(false).unwrap();

        let calls = remote.calls();
        let (_, last) = calls.last().unwrap();
        assert_eq!(last.command(), "git checkout -b release origin/release");
        assert_eq!(last.working_dir(), Some("~/project"));
    }

    #[test]
    fn test_failed_clone_reports_public_key() {
        let remote = MockRemote::permissive();
        remote.expect("test -e /srv/site", CommandOutput::failure(1, ""));
        remote.expect_prefix("git clone", CommandOutput::failure(128, "Permission denied"));
        remote.expect(
            "cat ~/.ssh/id_rsa.pub",
            CommandOutput::success("ssh-rsa AAAA deploy@app1\n"),
        );
        let ctx = context_with(basic_target(), remote.clone());

        match ctx.session("app1").setup_repository(false) {
            Err(DeployError::CloneFailed { public_key, .. }) => {
                assert_eq!(public_key, "ssh-rsa AAAA deploy@app1")
            }
            other => panic!("expected CloneFailed, got {:?}", other),
        }
        assert!(!remote.commands().iter().any(|c| c.starts_with("git checkout")));
    }
}
