//! # Identifiers
//!
//! Participant and event identifiers carried in every [`Notification`].
//!
//! [`Notification`]: crate::protocol::Notification

use std::fmt;

use uuid::Uuid;

use crate::errors::IdentifierError;
use crate::protocol;

/// Unique identity of a publishing participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticipantId(Uuid);

impl ParticipantId {
    /// Generate a fresh random id.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Decode from the 16 raw bytes used on the wire.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::InvalidLength`] unless exactly 16 bytes
    /// are given.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, IdentifierError> {
        Uuid::from_slice(bytes)
            .map(Self)
            .map_err(|_| IdentifierError::InvalidLength(bytes.len()))
    }

    /// Raw wire bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a single event: `(participant, sequence number)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId {
    participant_id: ParticipantId,
    sequence_number: u32,
}

impl EventId {
    #[must_use]
    pub fn new(participant_id: ParticipantId, sequence_number: u32) -> Self {
        Self {
            participant_id,
            sequence_number,
        }
    }

    #[must_use]
    pub fn participant_id(&self) -> ParticipantId {
        self.participant_id
    }

    #[must_use]
    pub fn sequence_number(&self) -> u32 {
        self.sequence_number
    }

    /// Convert into the protobuf representation.
    #[must_use]
    pub fn to_message(&self) -> protocol::EventId {
        protocol::EventId {
            sender_id: self.participant_id.as_bytes().to_vec(),
            sequence_number: self.sequence_number,
        }
    }

    /// Convert from the protobuf representation.
    ///
    /// # Errors
    ///
    /// Fails when `sender_id` is not a 16 byte UUID.
    pub fn from_message(message: &protocol::EventId) -> Result<Self, IdentifierError> {
        Ok(Self {
            participant_id: ParticipantId::from_slice(&message.sender_id)?,
            sequence_number: message.sequence_number,
        })
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.participant_id, self.sequence_number)
    }
}
