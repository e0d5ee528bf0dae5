use std::any::Any;
use std::fmt;

use super::DataType;

/// A type-erased application value tagged with its [`DataType`].
pub struct AnnotatedData {
    data_type: DataType,
    value: Box<dyn Any + Send + Sync>,
}

impl AnnotatedData {
    /// Wrap `value`, deriving the data type from `T`.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            data_type: DataType::of::<T>(),
            value: Box::new(value),
        }
    }

    /// Wrap a value under an explicitly chosen data type.
    pub fn with_data_type<T: Any + Send + Sync>(data_type: DataType, value: T) -> Self {
        Self {
            data_type,
            value: Box::new(value),
        }
    }

    /// The "no value" payload.
    #[must_use]
    pub fn null() -> Self {
        Self::new(())
    }

    #[must_use]
    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    #[must_use]
    pub fn value(&self) -> &(dyn Any + Send + Sync) {
        self.value.as_ref()
    }

    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Take the value out, or give `self` back if it is not a `T`.
    pub fn into_inner<T: Any>(self) -> Result<T, Self> {
        match self.value.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(value) => Err(Self {
                data_type: self.data_type,
                value,
            }),
        }
    }
}

impl fmt::Debug for AnnotatedData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnnotatedData")
            .field("data_type", &self.data_type)
            .finish_non_exhaustive()
    }
}

/// Serialized payload plus the wire schema describing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireData {
    pub wire_schema: String,
    pub bytes: Vec<u8>,
}

impl WireData {
    #[must_use]
    pub fn new(wire_schema: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            wire_schema: wire_schema.into(),
            bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downcast() {
        let data = AnnotatedData::new(5_i32);
        assert_eq!(data.data_type(), &DataType::of::<i32>());
        assert_eq!(data.downcast_ref::<i32>(), Some(&5));
        assert_eq!(data.downcast_ref::<u32>(), None);
    }

    #[test]
    fn test_into_inner_returns_self_on_mismatch() {
        let data = AnnotatedData::new(String::from("x"));
        let data = data.into_inner::<i64>().unwrap_err();
        assert_eq!(data.into_inner::<String>().unwrap(), "x");
    }

    #[test]
    fn test_null_is_void() {
        assert!(AnnotatedData::null().data_type().is_void());
    }
}
