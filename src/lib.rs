//! Quay - remote deployment for Django sites
//!
//! This crate provides the core library functionality for Quay: the deploy
//! target model and registry, the transports that run commands on hosts, and
//! the procedures that set up, update and restart a site.

pub mod core;
pub mod ops;
pub mod remote;
pub mod util;

/// Test utilities and mocks for Quay unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides mock implementations for the remote
/// transport, the operator's terminal and the local git checkout.
#[cfg(test)]
pub mod test_support;

pub use crate::core::{
    registry::{TargetRegistry, TARGETS},
    target::{DeployTarget, Role, Target},
};

pub use crate::ops::{DeployContext, DeployError};
pub use crate::util::context::GlobalContext;
