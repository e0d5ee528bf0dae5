//! # SB-02 Socket Transport
//!
//! Carries [`Notification`](shared_types::Notification) envelopes between
//! processes over TCP.
//!
//! ## Architecture
//!
//! - **Framing** (`framing`): handshake token and length-prefixed frames
//! - **Connection** (`connection`): one socket, its handshake, a dedicated
//!   writer thread
//! - **Bus** (`bus/`): fan-in/fan-out over a set of connections
//!   - `ServerBus`: listens, relays between peers
//!   - `ClientBus`: one outgoing connection
//!   - `RefCountingBus`: shares a bus between owners
//! - **Cache** (`cache`): one shared bus per `SocketOptions`
//! - **Connector** (`connector`): create-or-reuse by `ServerMode`
//!
//! ## Threads
//!
//! | Thread | Count | Blocks on |
//! |--------|-------|-----------|
//! | acceptor | one per active `ServerBus` | `accept` |
//! | receiver | one per connection | `read_frame` |
//! | writer | one per connection | its task queue |
//!
//! ## Usage Example
//!
//! ```ignore
//! use sb_02_socket_transport::{Bus, ServerMode, SocketConnector, SocketOptions};
//!
//! let connector = SocketConnector::new();
//! let bus = connector.acquire(&SocketOptions::default(), ServerMode::Auto)?;
//! bus.add_notification_receiver(receiver);
//! bus.handle_outgoing(&notification)?;
//! bus.deactivate()?;
//! ```

pub mod bus;
pub mod cache;
pub mod config;
pub mod connection;
pub mod connector;
pub mod error;
pub mod framing;
pub mod options;
pub mod receiver;

pub use bus::{Bus, ClientBus, DeactivationCallback, RefCountingBus, ServerBus};
pub use cache::{BusCache, BusCacheGuard};
pub use config::SocketConfig;
pub use connection::{BusConnection, ConnectionRole, ConnectionState, DEFAULT_SHUTDOWN_TIMEOUT};
pub use connector::SocketConnector;
pub use error::{ConfigError, FramingError, TransportError};
pub use options::{ServerMode, SocketOptions};
pub use receiver::{NotificationReceiver, ReceiverError};
