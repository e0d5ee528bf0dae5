//! Domain types of the converter subsystem.

mod annotated;
mod data_type;
mod signature;

pub use annotated::{AnnotatedData, WireData};
pub use data_type::DataType;
pub use signature::ConverterSignature;
