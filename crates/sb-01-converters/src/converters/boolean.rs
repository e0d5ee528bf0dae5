//! Single-byte boolean converter.
//!
//! `true` is written as `0x01` and `false` as `0x00`. On read, only `0x01`
//! is `true`; every other byte value decodes to `false`.

use std::any::Any;

use crate::domain::{AnnotatedData, ConverterSignature, DataType, WireData};
use crate::error::ConversionError;
use crate::ports::Converter;

pub const BOOL_WIRE_SCHEMA: &str = "bool";

const TRUE_BYTE: u8 = 1;
const FALSE_BYTE: u8 = 0;

#[derive(Debug)]
pub struct BoolConverter {
    signature: ConverterSignature,
}

impl BoolConverter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            signature: ConverterSignature::new(BOOL_WIRE_SCHEMA, DataType::of::<bool>()),
        }
    }
}

impl Default for BoolConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl Converter for BoolConverter {
    fn signature(&self) -> &ConverterSignature {
        &self.signature
    }

    fn serialize(
        &self,
        data_type: &DataType,
        value: &(dyn Any + Send + Sync),
    ) -> Result<WireData, ConversionError> {
        self.check_data_type(data_type)?;
        let value = value
            .downcast_ref::<bool>()
            .ok_or_else(|| ConversionError::ValueMismatch(data_type.clone()))?;
        let byte = if *value { TRUE_BYTE } else { FALSE_BYTE };
        Ok(WireData::new(BOOL_WIRE_SCHEMA, vec![byte]))
    }

    fn deserialize(&self, wire_schema: &str, bytes: &[u8]) -> Result<AnnotatedData, ConversionError> {
        self.check_wire_schema(wire_schema)?;
        match bytes {
            [byte] => Ok(AnnotatedData::new(*byte == TRUE_BYTE)),
            _ => Err(ConversionError::InvalidLength {
                wire_schema: wire_schema.to_string(),
                expected: 1,
                actual: bytes.len(),
            }),
        }
    }
}
