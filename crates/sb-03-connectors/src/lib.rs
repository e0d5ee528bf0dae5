//! # SB-03 Connectors
//!
//! Application-facing publish and subscribe on top of the socket bus.
//!
//! ## Architecture
//!
//! - **Domain** (`domain/`): [`Event`] and its [`MetaData`]
//! - **Ports** (`ports/`): [`EventHandler`]
//! - **Envelope** (`envelope`): `Event` ↔ `Notification` through the
//!   converter selection strategies
//! - **Connectors**: [`OutConnector`] publishes, [`InPushConnector`]
//!   delivers to handlers
//!
//! Both connectors obtain their bus from a shared
//! [`SocketConnector`](sb_02_socket_transport::SocketConnector) on
//! `activate()` and release it on `deactivate()` or drop. Connectors built
//! from the same `SocketConnector` and options share one bus.
//!
//! ## Usage Example
//!
//! ```ignore
//! let out = OutConnector::new(scope.clone(), config.clone(), connector.clone(), serialization);
//! let inbound = InPushConnector::new(scope.clone(), config, connector, deserialization);
//! inbound.add_handler(Arc::new(|event: &Event| -> Result<(), HandlerError> {
//!     println!("{}: {:?}", event.scope(), event.downcast_ref::<i32>());
//!     Ok(())
//! }));
//! inbound.activate()?;
//! out.activate()?;
//! out.push(Event::with_value(scope, 42_i32))?;
//! ```

mod binding;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod in_push;
pub mod out_connector;
pub mod ports;

pub use domain::{now_micros, Event, MetaData};
pub use error::ConnectorError;
pub use in_push::InPushConnector;
pub use out_connector::OutConnector;
pub use ports::{EventHandler, HandlerError};
