//! `quay target` and `quay list-targets` commands

use anyhow::Result;

use super::Invocation;
use quay::core::target::DeployTarget;
use quay::util::shell::Status;

/// Print the registered target names, one per line.
pub fn list(inv: &Invocation) -> Result<()> {
    let registry = inv.registry()?;

    if inv.shell.is_json() {
        let names: Vec<&str> = registry.names().collect();
        inv.shell.json_event(&serde_json::json!({
            "reason": "targets",
            "targets": names,
        }));
        return Ok(());
    }

    for name in registry.names() {
        println!("{}", name);
    }
    Ok(())
}

/// Validate a target and print its role map.
pub fn select(inv: &Invocation, name: &str) -> Result<()> {
    let target = inv.build_target(name)?;
    let roles = target.get_roles();

    inv.shell.status(
        Status::Selected,
        format!("deploy target `{}` ({})", target.name(), target.kind()),
    );

    if inv.shell.is_json() {
        let roles: serde_json::Map<String, serde_json::Value> = roles
            .iter()
            .map(|(role, hosts)| (role.to_string(), serde_json::json!(hosts)))
            .collect();
        inv.shell.json_event(&serde_json::json!({
            "reason": "target",
            "name": target.name(),
            "kind": target.kind().as_str(),
            "branch": target.git_branch(),
            "roles": roles,
        }));
        return Ok(());
    }

    for (role, hosts) in &roles {
        let hosts = if hosts.is_empty() {
            "(none)".to_string()
        } else {
            hosts.join(", ")
        };
        println!("{:>6}: {}", role.as_str(), hosts);
    }
    Ok(())
}
