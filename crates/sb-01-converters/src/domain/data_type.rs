use std::borrow::Cow;
use std::fmt;

/// Identifies the Rust type of an application value.
///
/// The name is the lookup key of the serialization selection strategy.
/// [`DataType::of`] derives it from the type itself, so the same type always
/// maps to the same key within one process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DataType(Cow<'static, str>);

impl DataType {
    /// Data type of `T`.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self(Cow::Borrowed(std::any::type_name::<T>()))
    }

    /// Data type with an explicit name, for values whose Rust type is not
    /// the natural key.
    #[must_use]
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// The marker used for "no value" (`()`).
    #[must_use]
    pub fn void() -> Self {
        Self::of::<()>()
    }

    #[must_use]
    pub fn is_void(&self) -> bool {
        *self == Self::void()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_type_same_key() {
        assert_eq!(DataType::of::<String>(), DataType::of::<String>());
        assert_ne!(DataType::of::<i32>(), DataType::of::<u32>());
    }

    #[test]
    fn test_void_marker() {
        assert!(DataType::void().is_void());
        assert!(DataType::of::<()>().is_void());
        assert!(!DataType::of::<bool>().is_void());
    }

    #[test]
    fn test_named_matches_derived_name() {
        assert_eq!(DataType::named(std::any::type_name::<u64>()), DataType::of::<u64>());
    }
}
