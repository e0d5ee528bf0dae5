//! Error types for the socket transport.

use std::io;

use thiserror::Error;

/// Errors reading or writing the byte-level protocol.
#[derive(Debug, Error)]
pub enum FramingError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Handshake mismatch: expected {expected:#010x}, got {actual:#010x}")]
    HandshakeMismatch { expected: i32, actual: i32 },

    #[error("Negative frame length {0}")]
    NegativeLength(i32),

    #[error("Frame of {0} bytes exceeds the maximum frame size")]
    FrameTooLarge(usize),
}

impl FramingError {
    /// Whether the peer went away, as opposed to sending garbage.
    #[must_use]
    pub fn is_disconnect(&self) -> bool {
        match self {
            FramingError::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::NotConnected
            ),
            _ => false,
        }
    }
}

/// Errors from buses, connections and the bus cache.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Lifecycle misuse: double activation, double deactivation, more
    /// deactivations than activations.
    #[error("Illegal state: {0}")]
    IllegalState(String),

    #[error("Illegal argument: {0}")]
    IllegalArgument(String),

    #[error("Not active")]
    NotActive,

    #[error("Handshake failed: {0}")]
    Handshake(#[source] FramingError),

    #[error("Cannot listen on {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("Cannot connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("Cannot resolve {address}:{port}")]
    UnresolvableAddress { address: String, port: u16 },

    #[error(transparent)]
    Framing(#[from] FramingError),

    #[error("Malformed notification: {0}")]
    MalformedNotification(#[from] prost::DecodeError),

    #[error("Write executor stopped")]
    ExecutorStopped,

    #[error("Cannot spawn {name} thread: {source}")]
    Spawn {
        name: String,
        #[source]
        source: io::Error,
    },
}

/// Invalid `transport.socket.*` configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}
