//! Source reading: encoding conversion and character-level access.

pub mod chars;
pub mod encoding;

pub use chars::CharReader;
pub use encoding::{MAX_INPUT_SIZE, SourceEncoding, decode_source};
