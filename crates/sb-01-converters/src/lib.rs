//! # SB-01 Converters
//!
//! Maps typed application data to wire-schema tagged bytes and back.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): value types, no I/O
//!   - `DataType`: type identifier used as the serialization lookup key
//!   - `ConverterSignature`: `(wire schema, data type)` pair
//!   - `AnnotatedData` / `WireData`: the two sides of a conversion
//!
//! - **Ports Layer** (`ports/`): trait definitions
//!   - `Converter`: bidirectional codec for one signature
//!   - `ConverterSelectionStrategy`: key → converter lookup
//!
//! - **Converters** (`converters/`): numeric, boolean, null, string,
//!   protobuf message and event id codecs
//!
//! - **Repository** (`repository/`): mutable registry plus the
//!   `UnambiguousConverterMap` snapshots it produces
//!
//! ## Invariants
//!
//! - Registering an existing signature in the repository replaces it.
//! - A selection strategy never maps one key to two converters.
//! - The serialization strategy never selects an `ascii-string` converter;
//!   the deserialization strategy includes every wire schema.
//!
//! ## Usage Example
//!
//! ```ignore
//! use sb_01_converters::{ConverterRepository, ConverterSelectionStrategy, DataType};
//!
//! let repository = ConverterRepository::with_default_converters();
//! let out = repository.converters_for_serialization()?;
//!
//! let converter = out.get_converter(DataType::of::<i32>().name())?;
//! let wire = converter.serialize(&DataType::of::<i32>(), &1_i32)?;
//! assert_eq!(wire.bytes, vec![1, 0, 0, 0]);
//! ```

pub mod converters;
pub mod domain;
pub mod error;
pub mod ports;
pub mod repository;

pub use converters::{
    BoolConverter, Charset, DoubleConverter, EventIdConverter, FloatConverter, Int32Converter,
    Int64Converter, NullConverter, ProtocolBufferConverter, StringConverter, Uint32Converter,
    Uint64Converter,
};
pub use domain::{AnnotatedData, ConverterSignature, DataType, WireData};
pub use error::{ConversionError, SelectionError};
pub use ports::{Converter, ConverterSelectionStrategy};
pub use repository::{ConverterRepository, UnambiguousConverterMap, ASCII_STRING_WIRE_SCHEMA};
