//! Nested protobuf message converter.
//!
//! The wire schema of a message type is its fully qualified protobuf name with
//! a leading dot, e.g. `.scopebus.protocol.EventId`.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

use prost::Message;

use crate::domain::{AnnotatedData, ConverterSignature, DataType, WireData};
use crate::error::ConversionError;
use crate::ports::Converter;

/// Wire schema for a protobuf message with the given fully qualified name.
#[must_use]
pub fn message_wire_schema(full_name: &str) -> String {
    format!(".{}", full_name.trim_start_matches('.'))
}

pub struct ProtocolBufferConverter<M> {
    signature: ConverterSignature,
    _marker: PhantomData<fn() -> M>,
}

impl<M: Message + Default + 'static> ProtocolBufferConverter<M> {
    /// Create a converter for `M`, whose protobuf name is `full_name`
    /// (`package.Message`).
    #[must_use]
    pub fn new(full_name: &str) -> Self {
        Self {
            signature: ConverterSignature::new(message_wire_schema(full_name), DataType::of::<M>()),
            _marker: PhantomData,
        }
    }

    /// Encode `message` directly, without going through [`Converter`].
    pub fn encode(&self, message: &M) -> WireData {
        WireData::new(self.signature.wire_schema(), message.encode_to_vec())
    }

    /// Decode a payload directly, without going through [`Converter`].
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::WireSchemaMismatch`] for a foreign wire
    /// schema or [`ConversionError::InvalidMessage`] for a malformed payload.
    pub fn decode(&self, wire_schema: &str, bytes: &[u8]) -> Result<M, ConversionError> {
        self.check_wire_schema(wire_schema)?;
        Ok(M::decode(bytes)?)
    }
}

impl<M> fmt::Debug for ProtocolBufferConverter<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtocolBufferConverter")
            .field("signature", &self.signature)
            .finish()
    }
}

impl<M: Message + Default + 'static> Converter for ProtocolBufferConverter<M> {
    fn signature(&self) -> &ConverterSignature {
        &self.signature
    }

    fn serialize(
        &self,
        data_type: &DataType,
        value: &(dyn Any + Send + Sync),
    ) -> Result<WireData, ConversionError> {
        self.check_data_type(data_type)?;
        let message = value
            .downcast_ref::<M>()
            .ok_or_else(|| ConversionError::ValueMismatch(data_type.clone()))?;
        Ok(self.encode(message))
    }

    fn deserialize(&self, wire_schema: &str, bytes: &[u8]) -> Result<AnnotatedData, ConversionError> {
        let message = self.decode(wire_schema, bytes)?;
        Ok(AnnotatedData::new(message))
    }
}
