//! Error types for the converter subsystem

use thiserror::Error;

use crate::domain::{ConverterSignature, DataType};

/// Errors raised by a single converter while serializing or deserializing.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Converter for {expected} cannot serialize data of type {actual}")]
    DataTypeMismatch { expected: DataType, actual: DataType },

    #[error("Value does not hold the declared data type {0}")]
    ValueMismatch(DataType),

    #[error("Converter for wire schema {expected:?} cannot deserialize {actual:?}")]
    WireSchemaMismatch { expected: String, actual: String },

    #[error("Wire schema {wire_schema:?} requires {expected} bytes, got {actual}")]
    InvalidLength {
        wire_schema: String,
        expected: usize,
        actual: usize,
    },

    #[error("Character {character:?} at byte {position} cannot be encoded as {charset}")]
    Unmappable {
        charset: &'static str,
        character: char,
        position: usize,
    },

    #[error("Malformed {charset} input at byte {position}")]
    Malformed {
        charset: &'static str,
        position: usize,
    },

    #[error("Invalid protobuf payload: {0}")]
    InvalidMessage(#[from] prost::DecodeError),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(#[from] shared_types::IdentifierError),
}

/// Errors from building or querying a selection strategy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// Nothing was registered under the requested type name or wire schema.
    #[error("No converter registered for {key:?}")]
    NoSuchConverter { key: String },

    /// A strict map already holds a converter for this key.
    #[error("Ambiguous converter key {key:?}: {existing} conflicts with {rejected}")]
    DuplicateKey {
        key: String,
        existing: ConverterSignature,
        rejected: ConverterSignature,
    },
}
