//! # Scopebus Runtime
//!
//! Wires the converter repository, the socket connector and the connectors
//! of one process together.
//!
//! - `config`: [`RuntimeConfig`] from defaults, a TOML file and the
//!   environment
//! - `context`: [`RuntimeContext`], the dependency-injected process
//!   singletons

pub mod config;
pub mod context;

pub use config::{RuntimeConfig, RuntimeConfigError};
pub use context::RuntimeContext;
