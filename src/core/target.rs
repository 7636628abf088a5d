//! Deploy target model.
//!
//! A target describes one deployable environment: where the repository,
//! virtualenv and site configuration live on the remote hosts, which git
//! branch is deployed, and which hosts serve each [`Role`].
//!
//! Targets come in a closed set of layouts ([`TargetKind`]). Every layout
//! implements the same [`DeployTarget`] capability set, so procedures never
//! care which one they were handed.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::errors::TargetError;

/// Default name of the git remote pushed to from the operator's machine.
pub const DEFAULT_GIT_REMOTE: &str = "origin";

/// Branch a fresh clone is already on.
pub const DEFAULT_BRANCH: &str = "master";

/// A functional grouping of hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Application servers
    App,
    /// Database servers (migrations run here)
    Db,
    /// Static file servers
    Static,
}

impl Role {
    /// All roles, in fan-out order.
    pub const ALL: [Role; 3] = [Role::App, Role::Db, Role::Static];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::App => "app",
            Role::Db => "db",
            Role::Static => "static",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "app" => Ok(Role::App),
            "db" => Ok(Role::Db),
            "static" => Ok(Role::Static),
            _ => Err(format!(
                "unknown role `{}`; expected `app`, `db` or `static`",
                s
            )),
        }
    }
}

/// A list of hosts that may be written as a single string or an array.
///
/// `"web1"` and `["web1"]` both normalize to one host. An empty string or a
/// missing key is an empty list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "OneOrMany")]
pub struct HostList(Vec<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for HostList {
    fn from(value: OneOrMany) -> Self {
        let hosts = match value {
            OneOrMany::One(host) => vec![host],
            OneOrMany::Many(hosts) => hosts,
        };
        HostList(
            hosts
                .iter()
                .map(|h| h.trim())
                .filter(|h| !h.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }
}

impl HostList {
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        HostList(hosts.into_iter().map(Into::into).collect())
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for HostList {
    fn from(host: &str) -> Self {
        OneOrMany::One(host.to_string()).into()
    }
}

/// Git coordinates shared by every layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct GitSettings {
    /// Address of the central repository, cloned on every host
    pub git_repository: String,
    /// Branch deployed to the hosts
    pub git_branch: String,
    /// Name of the central repository's remote in the operator's checkout
    pub git_remote: String,
}

impl Default for GitSettings {
    fn default() -> Self {
        GitSettings {
            git_repository: String::new(),
            git_branch: String::new(),
            git_remote: DEFAULT_GIT_REMOTE.to_string(),
        }
    }
}

/// The capability set every deploy target layout provides.
pub trait DeployTarget {
    fn name(&self) -> &str;

    fn repository_dir(&self) -> String;
    fn siteconfig_dir(&self) -> String;
    fn virtualenv_dir(&self) -> String;
    fn media_dir(&self) -> String;
    fn static_dir(&self) -> String;

    fn git(&self) -> &GitSettings;

    /// Value exported as `DJANGO_DEPLOY_ENV` before management commands.
    fn deploy_env(&self) -> &str;

    fn app_servers(&self) -> &[String];
    fn db_servers(&self) -> &[String];
    fn static_servers(&self) -> &[String];

    fn git_repository(&self) -> &str {
        &self.git().git_repository
    }

    fn git_branch(&self) -> &str {
        &self.git().git_branch
    }

    fn git_remote(&self) -> &str {
        &self.git().git_remote
    }

    /// Hosts serving `role`.
    fn servers(&self, role: Role) -> &[String] {
        match role {
            Role::App => self.app_servers(),
            Role::Db => self.db_servers(),
            Role::Static => self.static_servers(),
        }
    }

    /// Role map with every role present; unset roles map to an empty list.
    fn get_roles(&self) -> BTreeMap<Role, Vec<String>> {
        Role::ALL
            .iter()
            .map(|&role| (role, self.servers(role).to_vec()))
            .collect()
    }

    /// Union of the hosts serving `roles`, first occurrence wins.
    fn hosts_for(&self, roles: &[Role]) -> Vec<String> {
        let mut hosts: Vec<String> = Vec::new();
        for &role in roles {
            for host in self.servers(role) {
                if !hosts.contains(host) {
                    hosts.push(host.clone());
                }
            }
        }
        hosts
    }

    /// Check that every directory and git setting resolves to a value.
    fn validate(&self) -> Result<(), TargetError> {
        let required = [
            ("repository-dir", self.repository_dir()),
            ("siteconfig-dir", self.siteconfig_dir()),
            ("virtualenv-dir", self.virtualenv_dir()),
            ("media-dir", self.media_dir()),
            ("static-dir", self.static_dir()),
            ("git-repository", self.git_repository().to_string()),
            ("git-branch", self.git_branch().to_string()),
            ("git-remote", self.git_remote().to_string()),
        ];

        for (setting, value) in required {
            if value.trim().is_empty() {
                return Err(TargetError::MissingSetting {
                    target: self.name().to_string(),
                    setting,
                });
            }
        }

        Ok(())
    }
}

/// Join a remote POSIX path and a relative component.
pub fn remote_join(base: &str, component: &str) -> String {
    if base.is_empty() {
        return String::new();
    }
    format!("{}/{}", base.trim_end_matches('/'), component)
}

/// The closed set of target layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// Every directory and role configured explicitly
    #[default]
    Basic,
    /// One host serving every role, directories derived from three roots
    Simple,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Basic => "basic",
            TargetKind::Simple => "simple",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(TargetKind::Basic),
            "simple" => Ok(TargetKind::Simple),
            _ => Err(format!(
                "unknown target kind `{}`; expected `basic` or `simple`",
                s
            )),
        }
    }
}

/// Fully distributed layout: every path and role list is spelled out.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BasicTarget {
    #[serde(skip)]
    name: String,

    #[serde(flatten)]
    git: GitSettings,

    repository_dir: String,
    siteconfig_dir: String,
    virtualenv_dir: String,
    media_dir: String,
    static_dir: String,

    app_servers: HostList,
    db_servers: HostList,
    static_servers: HostList,

    deploy_env: String,
}

impl BasicTarget {
    /// Deserialize a layout from its merged settings table.
    pub fn from_settings(name: &str, settings: toml::Table) -> Result<Self, TargetError> {
        let mut target: BasicTarget =
            toml::Value::Table(settings)
                .try_into()
                .map_err(|e: toml::de::Error| TargetError::Invalid {
                    name: name.to_string(),
                    message: e.message().to_string(),
                })?;
        target.name = name.to_string();
        Ok(target)
    }
}

impl DeployTarget for BasicTarget {
    fn name(&self) -> &str {
        &self.name
    }

    fn repository_dir(&self) -> String {
        self.repository_dir.clone()
    }

    fn siteconfig_dir(&self) -> String {
        self.siteconfig_dir.clone()
    }

    fn virtualenv_dir(&self) -> String {
        self.virtualenv_dir.clone()
    }

    fn media_dir(&self) -> String {
        self.media_dir.clone()
    }

    fn static_dir(&self) -> String {
        self.static_dir.clone()
    }

    fn git(&self) -> &GitSettings {
        &self.git
    }

    fn deploy_env(&self) -> &str {
        &self.deploy_env
    }

    fn app_servers(&self) -> &[String] {
        self.app_servers.as_slice()
    }

    fn db_servers(&self) -> &[String] {
        self.db_servers.as_slice()
    }

    fn static_servers(&self) -> &[String] {
        self.static_servers.as_slice()
    }
}

/// Small deploys: one host serves every role and the deploy user hosts one
/// application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SimpleTarget {
    #[serde(skip)]
    name: String,

    #[serde(flatten)]
    git: GitSettings,

    server: HostList,

    project_dir: String,
    virtualenv_dir: String,
    htdocs_dir: String,

    deploy_env: String,
}

impl Default for SimpleTarget {
    fn default() -> Self {
        SimpleTarget {
            name: String::new(),
            git: GitSettings::default(),
            server: HostList::default(),
            project_dir: "~/project".to_string(),
            virtualenv_dir: "~/venv".to_string(),
            htdocs_dir: "~/public_html".to_string(),
            deploy_env: String::new(),
        }
    }
}

impl SimpleTarget {
    /// A single-host target with the default directory layout.
    pub fn new(name: impl Into<String>, server: &str, git: GitSettings) -> Self {
        SimpleTarget {
            name: name.into(),
            git,
            server: HostList::from(server),
            ..SimpleTarget::default()
        }
    }

    /// Set the `DJANGO_DEPLOY_ENV` value.
    pub fn with_deploy_env(mut self, env: impl Into<String>) -> Self {
        self.deploy_env = env.into();
        self
    }

    /// Deserialize a layout from its merged settings table.
    pub fn from_settings(name: &str, settings: toml::Table) -> Result<Self, TargetError> {
        let mut target: SimpleTarget =
            toml::Value::Table(settings)
                .try_into()
                .map_err(|e: toml::de::Error| TargetError::Invalid {
                    name: name.to_string(),
                    message: e.message().to_string(),
                })?;
        target.name = name.to_string();
        Ok(target)
    }
}

impl DeployTarget for SimpleTarget {
    fn name(&self) -> &str {
        &self.name
    }

    fn repository_dir(&self) -> String {
        self.project_dir.clone()
    }

    fn siteconfig_dir(&self) -> String {
        remote_join(&self.project_dir, "siteconfig")
    }

    fn virtualenv_dir(&self) -> String {
        self.virtualenv_dir.clone()
    }

    fn media_dir(&self) -> String {
        remote_join(&self.htdocs_dir, "media")
    }

    fn static_dir(&self) -> String {
        remote_join(&self.htdocs_dir, "static")
    }

    fn git(&self) -> &GitSettings {
        &self.git
    }

    fn deploy_env(&self) -> &str {
        &self.deploy_env
    }

    fn app_servers(&self) -> &[String] {
        self.server.as_slice()
    }

    fn db_servers(&self) -> &[String] {
        self.server.as_slice()
    }

    fn static_servers(&self) -> &[String] {
        self.server.as_slice()
    }
}

/// A constructed, validated deploy target of any layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Basic(BasicTarget),
    Simple(SimpleTarget),
}

impl Target {
    pub fn kind(&self) -> TargetKind {
        match self {
            Target::Basic(_) => TargetKind::Basic,
            Target::Simple(_) => TargetKind::Simple,
        }
    }

    fn layout(&self) -> &dyn DeployTarget {
        match self {
            Target::Basic(t) => t,
            Target::Simple(t) => t,
        }
    }
}

impl From<BasicTarget> for Target {
    fn from(target: BasicTarget) -> Self {
        Target::Basic(target)
    }
}

impl From<SimpleTarget> for Target {
    fn from(target: SimpleTarget) -> Self {
        Target::Simple(target)
    }
}

impl DeployTarget for Target {
    fn name(&self) -> &str {
        self.layout().name()
    }

    fn repository_dir(&self) -> String {
        self.layout().repository_dir()
    }

    fn siteconfig_dir(&self) -> String {
        self.layout().siteconfig_dir()
    }

    fn virtualenv_dir(&self) -> String {
        self.layout().virtualenv_dir()
    }

    fn media_dir(&self) -> String {
        self.layout().media_dir()
    }

    fn static_dir(&self) -> String {
        self.layout().static_dir()
    }

    fn git(&self) -> &GitSettings {
        self.layout().git()
    }

    fn deploy_env(&self) -> &str {
        self.layout().deploy_env()
    }

    fn app_servers(&self) -> &[String] {
        self.layout().app_servers()
    }

    fn db_servers(&self) -> &[String] {
        self.layout().db_servers()
    }

    fn static_servers(&self) -> &[String] {
        self.layout().static_servers()
    }
}
