//! Error types for the connectors

use sb_01_converters::{ConversionError, SelectionError};
use sb_02_socket_transport::TransportError;
use shared_types::{IdentifierError, Scope, ScopeError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("Connector is not active")]
    NotActive,

    #[error("Illegal connector state: {0}")]
    IllegalState(String),

    /// The event is addressed outside the connector's scope.
    #[error("Event scope {event} is not within connector scope {connector}")]
    ScopeMismatch { connector: Scope, event: Scope },

    #[error("Invalid scope in notification: {0}")]
    InvalidScope(#[from] ScopeError),

    #[error("Invalid event id in notification: {0}")]
    InvalidEventId(#[from] IdentifierError),

    #[error("Converter selection failed: {0}")]
    Selection(#[from] SelectionError),

    #[error("Conversion failed: {0}")]
    Conversion(#[from] ConversionError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

impl ConnectorError {
    /// Whether the failure came from finding or running a converter.
    #[must_use]
    pub fn is_conversion(&self) -> bool {
        matches!(self, Self::Selection(_) | Self::Conversion(_))
    }
}
