//! Reader contracts the ranking core is written against.
//!
//! Segments, fields, term dictionaries and posting lists are owned by the
//! storage layer. The scorers, statistics collectors and the n-gram matcher
//! only need the small surface defined here:
//!
//! - [`SegmentReader`] - one immutable index segment
//! - [`FieldReader`] - one field of a segment with its aggregate counts
//! - [`PostingIterator`] - position-aware postings of one term
//! - [`NormReader`] - per-document field lengths for length normalization

use std::fmt::Debug;

use crate::error::Result;

/// Document id reported by exhausted iterators.
pub const NO_MORE_DOCS: u64 = u64::MAX;

/// Trait for index segment readers.
pub trait SegmentReader: Send + Sync + Debug {
    /// Name of the segment, used for diagnostics only.
    fn name(&self) -> &str;

    /// Number of live documents in the segment.
    fn doc_count(&self) -> u64;

    /// Upper bound (exclusive) of document ids in the segment.
    fn max_doc(&self) -> u64;

    /// Get a reader for the named field, if the segment has postings for it.
    fn field(&self, name: &str) -> Option<&dyn FieldReader>;
}

/// Trait for per-segment field readers.
pub trait FieldReader: Send + Sync + Debug {
    /// Name of the field.
    fn name(&self) -> &str;

    /// Number of documents in the segment having at least one posting in this field.
    fn docs_count(&self) -> u64;

    /// Sum of term frequencies over every term and document of the field.
    ///
    /// `None` when the field was indexed without frequencies.
    fn total_term_freq(&self) -> Option<u64>;

    /// Whether postings of this field carry positions.
    fn has_positions(&self) -> bool;

    /// Look up the metadata of a term.
    fn term(&self, term: &[u8]) -> Option<TermAttributes>;

    /// Open the postings of a term, or `None` if the term does not occur.
    fn postings(&self, term: &[u8]) -> Result<Option<Box<dyn PostingIterator>>>;

    /// Per-document field lengths, if they were recorded.
    fn norms(&self) -> Option<&dyn NormReader>;
}

/// Metadata attributes attached to a term of a field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TermAttributes {
    /// Number of documents containing the term, when the dictionary records it.
    pub doc_freq: Option<u64>,

    /// Total number of occurrences of the term, when frequencies are indexed.
    pub total_freq: Option<u64>,
}

impl TermAttributes {
    /// Attributes carrying a document count.
    pub fn with_doc_freq(doc_freq: u64) -> Self {
        TermAttributes {
            doc_freq: Some(doc_freq),
            total_freq: None,
        }
    }
}

/// Reads the length (token count) of a field for a document.
pub trait NormReader: Send + Sync + Debug {
    /// Field length of `doc_id`; `0` for documents without the field.
    fn field_length(&self, doc_id: u64) -> u32;
}

/// Iterator over posting lists.
///
/// An iterator starts before its first posting: `next` or `skip_to` must be
/// called before `doc_id`, `term_freq` or `positions` are meaningful. Once
/// exhausted, `doc_id` returns [`NO_MORE_DOCS`].
pub trait PostingIterator: Send + Debug {
    /// Get the current document ID.
    fn doc_id(&self) -> u64;

    /// Get the term frequency in the current document.
    fn term_freq(&self) -> u64;

    /// Get the positions of the term in the current document, ascending.
    fn positions(&self) -> Result<Vec<u64>>;

    /// Replace the contents of `out` with the positions of the current
    /// document, reusing its allocation.
    fn positions_into(&self, out: &mut Vec<u64>) -> Result<()> {
        out.clear();
        out.extend(self.positions()?);
        Ok(())
    }

    /// Move to the next document.
    fn next(&mut self) -> Result<bool>;

    /// Skip to the first document >= target.
    ///
    /// Does not move when already positioned on a document >= target.
    fn skip_to(&mut self, target: u64) -> Result<bool>;

    /// Get the cost of iterating through this posting list.
    fn cost(&self) -> u64;
}
