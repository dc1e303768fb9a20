//! Byte-level primitives: CompactSize, bounds-checked cursors, and a
//! hex-friendly owned buffer. Leaf module — everything else in this crate
//! builds on it.

pub mod byte_array;
pub mod compact_size;
pub mod cursor;

pub use byte_array::ByteArray;
pub use cursor::{ReadView, WriteBuffer};
