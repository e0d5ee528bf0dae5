use std::fmt;
use std::sync::Arc;

use super::Converter;
use crate::error::SelectionError;

/// Resolves the converter to use for a key.
///
/// The serialization strategy is keyed by data type name, the
/// deserialization strategy by wire schema.
pub trait ConverterSelectionStrategy: Send + Sync + fmt::Debug {
    /// # Errors
    ///
    /// [`SelectionError::NoSuchConverter`] when nothing is registered for
    /// `key`.
    fn get_converter(&self, key: &str) -> Result<Arc<dyn Converter>, SelectionError>;
}
