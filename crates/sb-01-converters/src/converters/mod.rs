//! Built-in converters.

mod boolean;
pub mod charset;
mod event_id;
mod null;
mod numeric;
mod protobuf;
mod string;

pub use boolean::{BoolConverter, BOOL_WIRE_SCHEMA};
pub use charset::Charset;
pub use event_id::EventIdConverter;
pub use null::{NullConverter, VOID_WIRE_SCHEMA};
pub use numeric::{
    DoubleConverter, FixedWidth, FloatConverter, Int32Converter, Int64Converter, NumericConverter,
    Uint32Converter, Uint64Converter,
};
pub use protobuf::{message_wire_schema, ProtocolBufferConverter};
pub use string::{
    StringConverter, ASCII_STRING_WIRE_SCHEMA, LATIN1_STRING_WIRE_SCHEMA, UTF8_STRING_WIRE_SCHEMA,
};
