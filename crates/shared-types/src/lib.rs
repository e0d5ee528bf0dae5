//! # Shared Types Crate
//!
//! Types shared by every layer of the bus:
//!
//! - [`protocol`]: protobuf messages written to the wire, most importantly the
//!   [`Notification`](protocol::Notification) envelope.
//! - [`Scope`]: hierarchical event address.
//! - [`ParticipantId`] / [`EventId`]: identity of publishers and events.

pub mod errors;
pub mod identifiers;
pub mod protocol;
pub mod scope;

pub use errors::{IdentifierError, ScopeError};
pub use identifiers::{EventId, ParticipantId};
pub use protocol::Notification;
pub use scope::Scope;
