use std::fmt;

use super::DataType;

/// Unique key of a converter: the wire schema it produces plus the data
/// type it accepts.
///
/// Two converters with equal signatures are duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConverterSignature {
    wire_schema: String,
    data_type: DataType,
}

impl ConverterSignature {
    #[must_use]
    pub fn new(wire_schema: impl Into<String>, data_type: DataType) -> Self {
        Self {
            wire_schema: wire_schema.into(),
            data_type,
        }
    }

    #[must_use]
    pub fn wire_schema(&self) -> &str {
        &self.wire_schema
    }

    #[must_use]
    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }
}

impl fmt::Display for ConverterSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.wire_schema, self.data_type)
    }
}
