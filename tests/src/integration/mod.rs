//! Cross-crate tests over real loopback sockets.

pub mod buses;
pub mod connectors;
pub mod sharing;
pub mod support;
pub mod wire;
