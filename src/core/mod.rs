//! Core data structures for Quay.
//!
//! This module contains the foundational types used throughout Quay:
//! - Deploy targets and their host roles
//! - The target manifest (`Quay.toml`)
//! - The registry of named targets

pub mod errors;
pub mod manifest;
pub mod registry;
pub mod target;

pub use errors::TargetError;
pub use manifest::{TargetManifest, MANIFEST_NAME};
pub use registry::{TargetRegistry, TargetSpec};
pub use target::{BasicTarget, DeployTarget, Role, SimpleTarget, Target};
