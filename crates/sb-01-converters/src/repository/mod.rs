//! # Converter Repository
//!
//! Mutable source of truth for the converters known to a process, keyed by
//! [`ConverterSignature`]. Registration is last-wins: adding a converter
//! whose signature is already present replaces the old one and logs a
//! warning.
//!
//! Selection strategies are built from a point-in-time copy of the
//! repository and never observe later registrations:
//!
//! | Strategy          | Key               | Excluded wire schemas |
//! |-------------------|-------------------|-----------------------|
//! | serialization     | data type name    | `ascii-string`        |
//! | deserialization   | wire schema       | none                  |

mod unambiguous_map;


use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::converters::{
    BoolConverter, DoubleConverter, EventIdConverter, FloatConverter, Int32Converter,
    Int64Converter, NullConverter, StringConverter, Uint32Converter, Uint64Converter,
};
use crate::domain::ConverterSignature;
use crate::error::SelectionError;
use crate::ports::Converter;

pub use crate::converters::ASCII_STRING_WIRE_SCHEMA;
pub use unambiguous_map::UnambiguousConverterMap;

#[derive(Debug, Default)]
pub struct ConverterRepository {
    converters: RwLock<HashMap<ConverterSignature, Arc<dyn Converter>>>,
}

impl ConverterRepository {
    /// Empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository holding the built-in converters:
    /// `bool`, `int32`, `uint32`, `int64`, `uint64`, `float`, `double`,
    /// `void`, `utf-8-string`, `ascii-string` and the event id converter.
    #[must_use]
    pub fn with_default_converters() -> Self {
        let repository = Self::new();
        let defaults: [Arc<dyn Converter>; 11] = [
            Arc::new(BoolConverter::new()),
            Arc::new(Int32Converter::new()),
            Arc::new(Uint32Converter::new()),
            Arc::new(Int64Converter::new()),
            Arc::new(Uint64Converter::new()),
            Arc::new(FloatConverter::new()),
            Arc::new(DoubleConverter::new()),
            Arc::new(NullConverter::new()),
            Arc::new(StringConverter::utf8()),
            Arc::new(StringConverter::ascii()),
            Arc::new(EventIdConverter::new()),
        ];
        for converter in defaults {
            repository.add_converter(converter);
        }
        repository
    }

    /// Register `converter`, replacing any converter with the same signature.
    ///
    /// Returns the replaced converter, if any.
    pub fn add_converter(&self, converter: Arc<dyn Converter>) -> Option<Arc<dyn Converter>> {
        let signature = converter.signature().clone();
        let previous = self.converters.write().insert(signature.clone(), converter);
        match &previous {
            Some(_) => warn!(%signature, "Replacing already registered converter"),
            None => debug!(%signature, "Registered converter"),
        }
        previous
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.converters.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.converters.read().is_empty()
    }

    /// Signatures of all registered converters, sorted.
    #[must_use]
    pub fn signatures(&self) -> Vec<ConverterSignature> {
        self.snapshot().into_iter().map(|(signature, _)| signature).collect()
    }

    /// Build the data-type-name keyed strategy used when sending.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::DuplicateKey`] when two registered
    /// converters (other than `ascii-string` ones) claim the same data type.
    pub fn converters_for_serialization(&self) -> Result<UnambiguousConverterMap, SelectionError> {
        let mut map = UnambiguousConverterMap::new();
        for (signature, converter) in self.snapshot() {
            if signature.wire_schema() == ASCII_STRING_WIRE_SCHEMA {
                continue;
            }
            map.add_converter(signature.data_type().name(), converter)?;
        }
        Ok(map)
    }

    /// Build the wire-schema keyed strategy used when receiving.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::DuplicateKey`] when two registered
    /// converters claim the same wire schema.
    pub fn converters_for_deserialization(&self) -> Result<UnambiguousConverterMap, SelectionError> {
        let mut map = UnambiguousConverterMap::new();
        for (signature, converter) in self.snapshot() {
            map.add_converter(signature.wire_schema(), converter)?;
        }
        Ok(map)
    }

    /// Copy the live map so strategy construction never sees a concurrent
    /// registration half way through.
    fn snapshot(&self) -> Vec<(ConverterSignature, Arc<dyn Converter>)> {
        let mut entries: Vec<_> = self
            .converters
            .read()
            .iter()
            .map(|(signature, converter)| (signature.clone(), converter.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}
