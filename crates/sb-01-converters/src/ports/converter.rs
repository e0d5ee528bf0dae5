use std::any::Any;
use std::fmt;

use crate::domain::{AnnotatedData, ConverterSignature, DataType, WireData};
use crate::error::ConversionError;

/// Bidirectional codec between one application data type and one wire
/// schema.
///
/// # Thread Safety
///
/// Converters are built once at registration time and shared between
/// threads afterwards. Implementations are stateless or keep their mutable
/// state thread-confined.
pub trait Converter: Send + Sync + fmt::Debug {
    /// The `(wire schema, data type)` pair this converter handles.
    fn signature(&self) -> &ConverterSignature;

    /// Encode `value`, declared to be of `data_type`.
    fn serialize(
        &self,
        data_type: &DataType,
        value: &(dyn Any + Send + Sync),
    ) -> Result<WireData, ConversionError>;

    /// Decode `bytes` tagged with `wire_schema`.
    fn deserialize(&self, wire_schema: &str, bytes: &[u8]) -> Result<AnnotatedData, ConversionError>;

    /// Fails unless `data_type` is the one in this converter's signature.
    fn check_data_type(&self, data_type: &DataType) -> Result<(), ConversionError> {
        let expected = self.signature().data_type();
        if expected == data_type {
            Ok(())
        } else {
            Err(ConversionError::DataTypeMismatch {
                expected: expected.clone(),
                actual: data_type.clone(),
            })
        }
    }

    /// Fails unless `wire_schema` is the one in this converter's signature.
    fn check_wire_schema(&self, wire_schema: &str) -> Result<(), ConversionError> {
        let expected = self.signature().wire_schema();
        if expected == wire_schema {
            Ok(())
        } else {
            Err(ConversionError::WireSchemaMismatch {
                expected: expected.to_string(),
                actual: wire_schema.to_string(),
            })
        }
    }
}
