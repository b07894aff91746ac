//! PO file format support: POT output and the exclusion-set reader.

pub mod reader;
pub mod writer;

pub use reader::read_exclusion_keys;
pub use writer::{WriterOptions, write_pot};
