//! # AlignRank
//!
//! Relevance ranking for inverted indexes.
//!
//! ## Features
//!
//! - BM25 and TF-IDF scorers with pluggable construction by name
//! - Statistics collection per segment, mergeable across shards
//! - Term, disjunction and match-all queries over segment readers
//! - Ordered n-gram similarity matching with alignment quality as a boost
//! - An in-memory segment for tests and small corpora

pub mod analysis;
pub mod error;
pub mod index;
pub mod query;
pub mod scoring;
pub mod stats;
pub mod util;

pub mod prelude {
    pub use crate::error::{AlignRankError, Result};
    pub use crate::index::{MemorySegment, MemorySegmentBuilder, SegmentReader};
    pub use crate::query::{
        DisjunctionQuery, DocAttributes, Matcher, NgramSimilarityQuery, Query, Searcher, TermQuery,
        TopDocs,
    };
    pub use crate::scoring::{BM25Scorer, Scorer, ScorerRegistry, TfIdfScorer};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
