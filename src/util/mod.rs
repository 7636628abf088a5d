//! Shared utilities

pub mod config;
pub mod context;
pub mod diagnostic;
pub mod git;
pub mod process;
pub mod prompt;
pub mod shell;

pub use config::Config;
pub use context::GlobalContext;
pub use diagnostic::Diagnostic;
