//! Fixed-width numeric converters.
//!
//! ## Byte Order
//!
//! | Wire schema | Type  | Width | Order on the wire |
//! |-------------|-------|-------|-------------------|
//! | `int32`     | `i32` | 4     | little-endian     |
//! | `uint32`    | `u32` | 4     | little-endian     |
//! | `int64`     | `i64` | 8     | little-endian     |
//! | `uint64`    | `u64` | 8     | little-endian     |
//! | `float`     | `f32` | 4     | big-endian        |
//! | `double`    | `f64` | 8     | big-endian        |
//!
//! The floating point codecs produce little-endian bytes and then reverse
//! them, so the IEEE-754 bytes end up big-endian on the wire. Peers depend
//! on this exact order.

use std::any::Any;
use std::marker::PhantomData;

use crate::domain::{AnnotatedData, ConverterSignature, DataType, WireData};
use crate::error::ConversionError;
use crate::ports::Converter;

/// A primitive with a fixed-width wire encoding.
pub trait FixedWidth: Copy + Send + Sync + 'static {
    /// Wire schema produced for this type.
    const WIRE_SCHEMA: &'static str;
    /// Encoded size in bytes.
    const WIDTH: usize;

    fn encode(self) -> Vec<u8>;

    /// `bytes.len()` is guaranteed to equal [`Self::WIDTH`].
    fn decode(bytes: &[u8]) -> Self;
}

macro_rules! little_endian {
    ($ty:ty, $schema:literal) => {
        impl FixedWidth for $ty {
            const WIRE_SCHEMA: &'static str = $schema;
            const WIDTH: usize = std::mem::size_of::<$ty>();

            fn encode(self) -> Vec<u8> {
                self.to_le_bytes().to_vec()
            }

            fn decode(bytes: &[u8]) -> Self {
                let mut raw = [0u8; std::mem::size_of::<$ty>()];
                raw.copy_from_slice(bytes);
                <$ty>::from_le_bytes(raw)
            }
        }
    };
}

macro_rules! flipped {
    ($ty:ty, $schema:literal) => {
        impl FixedWidth for $ty {
            const WIRE_SCHEMA: &'static str = $schema;
            const WIDTH: usize = std::mem::size_of::<$ty>();

            fn encode(self) -> Vec<u8> {
                let mut raw = self.to_le_bytes();
                raw.reverse();
                raw.to_vec()
            }

            fn decode(bytes: &[u8]) -> Self {
                let mut raw = [0u8; std::mem::size_of::<$ty>()];
                raw.copy_from_slice(bytes);
                raw.reverse();
                <$ty>::from_le_bytes(raw)
            }
        }
    };
}

little_endian!(i32, "int32");
little_endian!(u32, "uint32");
little_endian!(i64, "int64");
little_endian!(u64, "uint64");
flipped!(f32, "float");
flipped!(f64, "double");

/// Converter for one [`FixedWidth`] type.
#[derive(Debug)]
pub struct NumericConverter<T> {
    signature: ConverterSignature,
    _marker: PhantomData<fn() -> T>,
}

pub type Int32Converter = NumericConverter<i32>;
pub type Uint32Converter = NumericConverter<u32>;
pub type Int64Converter = NumericConverter<i64>;
pub type Uint64Converter = NumericConverter<u64>;
pub type FloatConverter = NumericConverter<f32>;
pub type DoubleConverter = NumericConverter<f64>;

impl<T: FixedWidth> NumericConverter<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            signature: ConverterSignature::new(T::WIRE_SCHEMA, DataType::of::<T>()),
            _marker: PhantomData,
        }
    }
}

impl<T: FixedWidth> Default for NumericConverter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: FixedWidth + std::fmt::Debug> Converter for NumericConverter<T> {
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
            .downcast_ref::<T>()
            .ok_or_else(|| ConversionError::ValueMismatch(data_type.clone()))?;
        Ok(WireData::new(T::WIRE_SCHEMA, value.encode()))
    }

    fn deserialize(&self, wire_schema: &str, bytes: &[u8]) -> Result<AnnotatedData, ConversionError> {
        self.check_wire_schema(wire_schema)?;
        if bytes.len() != T::WIDTH {
            return Err(ConversionError::InvalidLength {
                wire_schema: wire_schema.to_string(),
                expected: T::WIDTH,
                actual: bytes.len(),
            });
        }
        Ok(AnnotatedData::new(T::decode(bytes)))
    }
}
