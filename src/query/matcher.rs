//! Document matchers and the attributes they expose to scorers.

use std::fmt::Debug;

use crate::error::Result;
use crate::index::reader::NO_MORE_DOCS;

/// Attributes a document iterator can expose.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// `doc_id` is meaningful, so per-document data can be looked up.
    pub document: bool,
    /// `frequency` reports a term (or match) frequency.
    pub frequency: bool,
    /// `filter_boost` reports a match-quality multiplier.
    pub filter_boost: bool,
}

impl Capabilities {
    pub fn all() -> Self {
        Capabilities {
            document: true,
            frequency: true,
            filter_boost: true,
        }
    }

    /// Document id and frequency, no filter boost.
    pub fn postings() -> Self {
        Capabilities {
            document: true,
            frequency: true,
            filter_boost: false,
        }
    }
}

/// Per-document attributes read by score functions.
pub trait DocAttributes {
    fn capabilities(&self) -> Capabilities;

    /// Current document id.
    fn doc_id(&self) -> u64;

    /// Frequency of the current document; `1` when not tracked.
    fn frequency(&self) -> u64 {
        1
    }

    /// Match-quality multiplier of the current document; `1.0` when not tracked.
    fn filter_boost(&self) -> f32 {
        1.0
    }
}

/// Trait for document matchers.
///
/// A matcher starts before its first document and yields ids in strictly
/// increasing order. Once exhausted, `doc_id` returns [`NO_MORE_DOCS`].
pub trait Matcher: DocAttributes + Send + Debug {
    /// Move to the next matching document.
    fn next(&mut self) -> Result<bool>;

    /// Move to the first matching document >= target.
    ///
    /// Does not move when already positioned on a document >= target.
    fn skip_to(&mut self, target: u64) -> Result<bool>;

    /// Estimated number of documents this matcher will visit.
    fn cost(&self) -> u64;

    fn is_exhausted(&self) -> bool;

    /// Score of the current document; `0` when no scorer contributes.
    fn score(&self) -> f32;
}

/// A matcher that matches nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyMatcher;

impl EmptyMatcher {
    pub fn new() -> Self {
        EmptyMatcher
    }
}

impl DocAttributes for EmptyMatcher {
    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    fn doc_id(&self) -> u64 {
        NO_MORE_DOCS
    }
}

impl Matcher for EmptyMatcher {
    fn next(&mut self) -> Result<bool> {
        Ok(false)
    }

    fn skip_to(&mut self, _target: u64) -> Result<bool> {
        Ok(false)
    }

    fn cost(&self) -> u64 {
        0
    }

    fn is_exhausted(&self) -> bool {
        true
    }

    fn score(&self) -> f32 {
        0.0
    }
}
