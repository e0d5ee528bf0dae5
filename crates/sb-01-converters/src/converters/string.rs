//! Charset-parameterized string converter.

use std::any::Any;

use super::charset::{self, Charset};
use crate::domain::{AnnotatedData, ConverterSignature, DataType, WireData};
use crate::error::ConversionError;
use crate::ports::Converter;

pub const UTF8_STRING_WIRE_SCHEMA: &str = "utf-8-string";
pub const ASCII_STRING_WIRE_SCHEMA: &str = "ascii-string";
pub const LATIN1_STRING_WIRE_SCHEMA: &str = "iso-8859-1-string";

/// Converts [`String`] values using one [`Charset`] under one wire schema.
#[derive(Debug)]
pub struct StringConverter {
    signature: ConverterSignature,
    charset: Charset,
}

impl StringConverter {
    #[must_use]
    pub fn new(charset: Charset, wire_schema: impl Into<String>) -> Self {
        Self {
            signature: ConverterSignature::new(wire_schema, DataType::of::<String>()),
            charset,
        }
    }

    /// UTF-8 strings under `utf-8-string`.
    #[must_use]
    pub fn utf8() -> Self {
        Self::new(Charset::Utf8, UTF8_STRING_WIRE_SCHEMA)
    }

    /// US-ASCII strings under `ascii-string`.
    #[must_use]
    pub fn ascii() -> Self {
        Self::new(Charset::UsAscii, ASCII_STRING_WIRE_SCHEMA)
    }

    /// ISO-8859-1 strings under `iso-8859-1-string`.
    #[must_use]
    pub fn latin1() -> Self {
        Self::new(Charset::Latin1, LATIN1_STRING_WIRE_SCHEMA)
    }

    #[must_use]
    pub fn charset(&self) -> Charset {
        self.charset
    }
}

impl Converter for StringConverter {
    fn signature(&self) -> &ConverterSignature {
        &self.signature
    }

    fn serialize(
        &self,
        data_type: &DataType,
        value: &(dyn Any + Send + Sync),
    ) -> Result<WireData, ConversionError> {
        self.check_data_type(data_type)?;
        let text = value
            .downcast_ref::<String>()
            .ok_or_else(|| ConversionError::ValueMismatch(data_type.clone()))?;
        let bytes = charset::encode(self.charset, text)?;
        Ok(WireData::new(self.signature.wire_schema(), bytes))
    }

    fn deserialize(&self, wire_schema: &str, bytes: &[u8]) -> Result<AnnotatedData, ConversionError> {
        self.check_wire_schema(wire_schema)?;
        let text = charset::decode(self.charset, bytes)?;
        Ok(AnnotatedData::new(text))
    }
}
