//! Relevance scoring.
//!
//! A [`Scorer`] is used in two phases:
//!
//! 1. **Preparation**: the scorer hands out the statistic collectors it needs
//!    ([`Scorer::prepare_field_collector`], [`Scorer::prepare_term_collector`]).
//!    Once every segment has been collected and merged,
//!    [`Scorer::finalize_stats`] turns the counts into [`ScoreConstants`].
//! 2. **Execution**: per segment, [`Scorer::prepare_scorer`] binds the
//!    constants, the field's length data and the capabilities of the document
//!    iterator into a [`ScoreFunction`], evaluated for every matching document.
//!
//! `prepare_scorer` returns `None` when the scorer cannot contribute for the
//! given iterator. Callers treat that as a score of `0` for the field.

pub mod bm25;
pub mod function;
pub mod registry;
pub mod tfidf;

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::index::reader::SegmentReader;
use crate::query::matcher::Capabilities;
use crate::stats::{FieldCollector, FieldStatistics, TermCollector, TermStatistics};

pub use bm25::{BM25Config, BM25Scorer};
pub use function::ScoreFunction;
pub use registry::{ScorerFactory, ScorerRegistry};
pub use tfidf::{TfIdfConfig, TfIdfScorer};

/// Trait for relevance scorers.
pub trait Scorer: Send + Sync + Debug {
    /// Registered name of the scorer.
    fn name(&self) -> &'static str;

    /// A fresh field collector, if this scorer uses field statistics.
    fn prepare_field_collector(&self) -> Option<FieldCollector>;

    /// A fresh term collector, if this scorer uses term statistics.
    fn prepare_term_collector(&self) -> Option<TermCollector>;

    /// Turn merged statistics into ranking constants.
    ///
    /// Terms contribute additively; finalization never fails.
    fn finalize_stats(&self, field: &FieldStatistics, terms: &[TermStatistics]) -> ScoreConstants;

    /// Build the per-document score function for one segment.
    fn prepare_scorer<'a>(
        &self,
        segment: &'a dyn SegmentReader,
        field: &str,
        constants: &'a ScoreConstants,
        capabilities: Capabilities,
        boost: f32,
    ) -> Option<ScoreFunction<'a>>;
}

/// Finalized TF-IDF constants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TfIdfStats {
    pub idf: f32,
}

/// Finalized BM25 constants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bm25Stats {
    pub idf: f32,
    /// `k * (1 - b)`, or `1` when `b == 0`.
    pub norm_const: f32,
    /// `k * b / avg_field_length`, or `0` when `b == 0`.
    pub norm_length: f32,
}

/// Ranking constants of one (query, field) pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ScoreConstants {
    TfIdf(TfIdfStats),
    Bm25(Bm25Stats),
}

impl ScoreConstants {
    pub fn idf(&self) -> f32 {
        match self {
            ScoreConstants::TfIdf(stats) => stats.idf,
            ScoreConstants::Bm25(stats) => stats.idf,
        }
    }
}
