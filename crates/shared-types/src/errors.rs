//! # Error Types
//!
//! Errors raised while parsing shared protocol values.

use thiserror::Error;

/// Errors from parsing a [`Scope`](crate::Scope).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    /// Scope strings must start with `/`.
    #[error("Scope must start with '/': {0:?}")]
    MissingLeadingSeparator(String),

    /// Two separators without a component in between.
    #[error("Scope contains an empty component: {0:?}")]
    EmptyComponent(String),

    /// A component contains a character outside `[A-Za-z0-9_-]`.
    #[error("Scope {scope:?} contains invalid character {character:?}")]
    InvalidCharacter { scope: String, character: char },
}

/// Errors from decoding participant and event identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    /// Participant ids are exactly 16 UUID bytes.
    #[error("Participant id must be 16 bytes, got {0}")]
    InvalidLength(usize),
}
