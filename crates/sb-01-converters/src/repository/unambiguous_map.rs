//! Strict key → converter map used as a selection strategy snapshot.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::SelectionError;
use crate::ports::{Converter, ConverterSelectionStrategy};

/// Maps each key to exactly one converter. Adding a key twice is an error.
#[derive(Debug, Default, Clone)]
pub struct UnambiguousConverterMap {
    converters: HashMap<String, Arc<dyn Converter>>,
}

impl UnambiguousConverterMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `converter` under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::DuplicateKey`] when `key` is already mapped;
    /// the existing entry is kept.
    pub fn add_converter(
        &mut self,
        key: impl Into<String>,
        converter: Arc<dyn Converter>,
    ) -> Result<(), SelectionError> {
        let key = key.into();
        if let Some(existing) = self.converters.get(&key) {
            return Err(SelectionError::DuplicateKey {
                key,
                existing: existing.signature().clone(),
                rejected: converter.signature().clone(),
            });
        }
        self.converters.insert(key, converter);
        Ok(())
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.converters.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.converters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }

    /// Keys in sorted order.
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.converters.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

impl ConverterSelectionStrategy for UnambiguousConverterMap {
    fn get_converter(&self, key: &str) -> Result<Arc<dyn Converter>, SelectionError> {
        self.converters
            .get(key)
            .cloned()
            .ok_or_else(|| SelectionError::NoSuchConverter {
                key: key.to_string(),
            })
    }
}
