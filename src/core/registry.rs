//! Target registry - discovery and lookup of deploy targets by name.
//!
//! Discovery walks the `[targets]` tables of a [`TargetManifest`] once and
//! keeps a [`TargetSpec`] per conforming entry. Entries that are not a table,
//! name an unknown `kind`, or fail to deserialize are skipped with a warning.
//! Construction and validation happen later, in [`TargetSpec::build`], when a
//! target is actually selected.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::core::errors::TargetError;
use crate::core::manifest::{TargetManifest, DEFAULTS_TABLE};
use crate::core::target::{BasicTarget, DeployTarget, SimpleTarget, Target, TargetKind};

/// Constructor for one named target: its layout and merged settings.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetSpec {
    name: String,
    kind: TargetKind,
    settings: toml::Table,
}

impl TargetSpec {
    /// Create a spec from a layout and its settings table.
    pub fn new(name: impl Into<String>, kind: TargetKind, settings: toml::Table) -> Self {
        TargetSpec {
            name: name.into(),
            kind,
            settings,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TargetKind {
        self.kind
    }

    /// Deserialize the layout without validating it.
    fn instantiate(&self) -> Result<Target, TargetError> {
        let settings = self.settings.clone();
        Ok(match self.kind {
            TargetKind::Basic => BasicTarget::from_settings(&self.name, settings)?.into(),
            TargetKind::Simple => SimpleTarget::from_settings(&self.name, settings)?.into(),
        })
    }

    /// Construct the target and check that it is complete.
    pub fn build(&self) -> Result<Target, TargetError> {
        let target = self.instantiate()?;
        target.validate()?;
        Ok(target)
    }
}

/// Registered targets, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct TargetRegistry {
    targets: BTreeMap<String, TargetSpec>,
}

impl TargetRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from every conforming target table in `manifest`.
    pub fn discover(manifest: &TargetManifest) -> Self {
        let mut registry = TargetRegistry::new();

        for (name, value) in &manifest.targets {
            if name == DEFAULTS_TABLE {
                tracing::warn!("Skipping target `{}`: the name is reserved", name);
                continue;
            }

            let Some(table) = value.as_table() else {
                tracing::warn!("Skipping target `{}`: not a table", name);
                continue;
            };

            let mut settings = manifest.defaults.clone();
            for (key, value) in table {
                settings.insert(key.clone(), value.clone());
            }

            let kind = match settings.remove("kind") {
                None => TargetKind::default(),
                Some(toml::Value::String(kind)) => match kind.parse::<TargetKind>() {
                    Ok(kind) => kind,
                    Err(e) => {
                        tracing::warn!("Skipping target `{}`: {}", name, e);
                        continue;
                    }
                },
                Some(other) => {
                    tracing::warn!(
                        "Skipping target `{}`: `kind` must be a string, found {}",
                        name,
                        other.type_str()
                    );
                    continue;
                }
            };

            let spec = TargetSpec::new(name.clone(), kind, settings);
            if let Err(e) = spec.instantiate() {
                tracing::warn!("Skipping target `{}`: {}", name, e);
                continue;
            }

            if let Err(e) = registry.register(spec) {
                tracing::warn!("{}", e);
            }
        }

        tracing::debug!("Discovered {} deploy target(s)", registry.len());
        registry
    }

    /// Register a target explicitly. Names are unique.
    pub fn register(&mut self, spec: TargetSpec) -> Result<(), TargetError> {
        if self.targets.contains_key(spec.name()) {
            return Err(TargetError::Duplicate {
                name: spec.name().to_string(),
            });
        }
        self.targets.insert(spec.name().to_string(), spec);
        Ok(())
    }

    /// Look up a target by name.
    pub fn resolve(&self, name: &str) -> Result<&TargetSpec, TargetError> {
        self.targets
            .get(name)
            .ok_or_else(|| TargetError::NotFound {
                name: name.to_string(),
                available: self.names().map(str::to_string).collect(),
            })
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.targets.keys().map(String::as_str)
    }

    /// Get the number of registered targets.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Check if a target is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.targets.contains_key(name)
    }
}

/// A registry populated at most once.
///
/// The first `populate` call runs its closure; every later call returns the
/// registry from the first call and drops its own closure unrun.
#[derive(Debug, Default)]
pub struct RegistryCell(OnceLock<TargetRegistry>);

impl RegistryCell {
    pub const fn new() -> Self {
        RegistryCell(OnceLock::new())
    }

    /// Populate the cell if empty and return its registry.
    pub fn populate(&self, discover: impl FnOnce() -> TargetRegistry) -> &TargetRegistry {
        self.0.get_or_init(discover)
    }

    /// The registry, if already populated.
    pub fn get(&self) -> Option<&TargetRegistry> {
        self.0.get()
    }
}

/// The process-wide target registry.
pub static TARGETS: RegistryCell = RegistryCell::new();
