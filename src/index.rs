//! Segment, field and posting access.
//!
//! The ranking core only talks to the traits in [`reader`]. [`memory`] holds
//! an in-memory implementation of them.

pub mod memory;
pub mod reader;

pub use memory::{FieldOptions, MemorySegment, MemorySegmentBuilder};
pub use reader::{
    FieldReader, NO_MORE_DOCS, NormReader, PostingIterator, SegmentReader, TermAttributes,
};
