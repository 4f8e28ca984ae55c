//! Query execution: matchers, queries and result collection.
//!
//! Queries are prepared once per search over every segment (gathering the
//! statistics their scorer asks for) and then executed segment by segment,
//! producing a [`Matcher`] that walks matching documents and scores them.

pub mod alignment;
pub mod all;
pub mod collector;
pub mod disjunction;
pub mod matcher;
pub mod ngram;
#[allow(clippy::module_inception)]
pub mod query;
pub mod searcher;
pub mod term;

pub use alignment::{AlignmentResult, SequenceAligner};
pub use all::AllQuery;
pub use collector::{Collector, CountCollector, SearchHit, TopDocsCollector};
pub use disjunction::DisjunctionQuery;
pub use matcher::{Capabilities, DocAttributes, EmptyMatcher, Matcher};
pub use ngram::{NgramMatchOptions, NgramSimilarityQuery};
pub use query::{PreparedQuery, Query};
pub use searcher::{Searcher, TopDocs};
pub use term::TermQuery;
