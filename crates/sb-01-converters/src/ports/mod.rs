//! # Ports
//!
//! The two seams of the converter subsystem:
//!
//! - [`Converter`]: a bidirectional codec, implemented by every type codec.
//! - [`ConverterSelectionStrategy`]: a read-only lookup consumed by the
//!   transport connectors at construction time.

mod converter;
mod selection;

pub use converter::Converter;
pub use selection::ConverterSelectionStrategy;
