//! Composite converter for [`shared_types::EventId`].
//!
//! Encodes the identifier through the `scopebus.protocol.EventId` protobuf
//! message, so peers can decode it with any protobuf library.

use std::any::Any;

use shared_types::{protocol, EventId};

use super::protobuf::ProtocolBufferConverter;
use crate::domain::{AnnotatedData, ConverterSignature, DataType, WireData};
use crate::error::ConversionError;
use crate::ports::Converter;

#[derive(Debug)]
pub struct EventIdConverter {
    signature: ConverterSignature,
    message: ProtocolBufferConverter<protocol::EventId>,
}

impl EventIdConverter {
    #[must_use]
    pub fn new() -> Self {
        let message =
            ProtocolBufferConverter::<protocol::EventId>::new(&format!("{}.EventId", protocol::PACKAGE));
        Self {
            signature: ConverterSignature::new(
                message.signature().wire_schema(),
                DataType::of::<EventId>(),
            ),
            message,
        }
    }
}

impl Default for EventIdConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl Converter for EventIdConverter {
    fn signature(&self) -> &ConverterSignature {
        &self.signature
    }

    fn serialize(
        &self,
        data_type: &DataType,
        value: &(dyn Any + Send + Sync),
    ) -> Result<WireData, ConversionError> {
        self.check_data_type(data_type)?;
        let id = value
            .downcast_ref::<EventId>()
            .ok_or_else(|| ConversionError::ValueMismatch(data_type.clone()))?;
        Ok(self.message.encode(&id.to_message()))
    }

    fn deserialize(&self, wire_schema: &str, bytes: &[u8]) -> Result<AnnotatedData, ConversionError> {
        let message = self.message.decode(wire_schema, bytes)?;
        Ok(AnnotatedData::new(EventId::from_message(&message)?))
    }
}
