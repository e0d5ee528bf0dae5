//! Events as seen by applications.

mod event;
mod meta_data;

pub use event::Event;
pub use meta_data::{now_micros, MetaData};
