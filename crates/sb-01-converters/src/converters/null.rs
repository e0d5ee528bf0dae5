//! Converter for the void marker: an empty payload tagged `void`.

use std::any::Any;

use crate::domain::{AnnotatedData, ConverterSignature, DataType, WireData};
use crate::error::ConversionError;
use crate::ports::Converter;

pub const VOID_WIRE_SCHEMA: &str = "void";

#[derive(Debug)]
pub struct NullConverter {
    signature: ConverterSignature,
}

impl NullConverter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            signature: ConverterSignature::new(VOID_WIRE_SCHEMA, DataType::void()),
        }
    }
}

impl Default for NullConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl Converter for NullConverter {
    fn signature(&self) -> &ConverterSignature {
        &self.signature
    }

    fn serialize(
        &self,
        data_type: &DataType,
        value: &(dyn Any + Send + Sync),
    ) -> Result<WireData, ConversionError> {
        self.check_data_type(data_type)?;
        if !value.is::<()>() {
            return Err(ConversionError::ValueMismatch(data_type.clone()));
        }
        Ok(WireData::new(VOID_WIRE_SCHEMA, Vec::new()))
    }

    fn deserialize(&self, wire_schema: &str, bytes: &[u8]) -> Result<AnnotatedData, ConversionError> {
        self.check_wire_schema(wire_schema)?;
        if !bytes.is_empty() {
            return Err(ConversionError::InvalidLength {
                wire_schema: wire_schema.to_string(),
                expected: 0,
                actual: bytes.len(),
            });
        }
        Ok(AnnotatedData::null())
    }
}
