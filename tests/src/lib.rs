//! # Scopebus Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── support.rs     # ports, collectors, polling
//!     ├── wire.rs        # raw sockets against the framing protocol
//!     ├── buses.rs       # server/client buses, fan-out, failures
//!     ├── sharing.rs     # SocketConnector, BusCache, RefCountingBus
//!     └── connectors.rs  # events end to end, across processes' worth of buses
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p sb-tests
//! cargo test -p sb-tests integration::wire::
//! ```

#![allow(dead_code)]

pub mod integration;
