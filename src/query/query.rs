//! Base query traits.

use std::fmt::Debug;
use std::sync::Arc;

use crate::error::Result;
use crate::index::reader::SegmentReader;
use crate::query::matcher::{Capabilities, DocAttributes, Matcher};
use crate::scoring::{ScoreConstants, ScoreFunction, Scorer};
use crate::stats::QueryStats;

/// Trait for search queries.
///
/// Preparation runs once per search: it gathers statistics over every segment
/// and finalizes the scorer constants. The resulting [`PreparedQuery`] is then
/// executed segment by segment.
pub trait Query: Send + Sync + Debug {
    /// Collect statistics over `segments` and bind `scorer`, if any.
    fn prepare(
        &self,
        segments: &[Arc<dyn SegmentReader>],
        scorer: Option<Arc<dyn Scorer>>,
    ) -> Result<Box<dyn PreparedQuery>>;

    /// Get the boost factor for this query.
    fn boost(&self) -> f32;

    /// Get a human-readable description of this query.
    fn description(&self) -> String;

    /// Get the field name this query searches in, if applicable.
    fn field(&self) -> Option<&str> {
        None
    }
}

/// A query bound to its statistics, ready to run against segments.
pub trait PreparedQuery: Send + Sync + Debug {
    /// Create a matcher over one segment.
    fn execute<'a>(&'a self, segment: &'a dyn SegmentReader) -> Result<Box<dyn Matcher + 'a>>;
}

/// A scorer together with the constants finalized for one query field.
#[derive(Debug, Clone)]
pub struct BoundScorer {
    scorer: Arc<dyn Scorer>,
    constants: ScoreConstants,
}

impl BoundScorer {
    pub fn new(scorer: Arc<dyn Scorer>, constants: ScoreConstants) -> Self {
        BoundScorer { scorer, constants }
    }

    /// Collect the statistics `scorer` needs for `terms` of `field` over every
    /// segment, then finalize them.
    pub fn collect<T>(
        scorer: Arc<dyn Scorer>,
        segments: &[Arc<dyn SegmentReader>],
        field: &str,
        terms: &[T],
    ) -> Result<Self>
    where
        T: AsRef<[u8]> + Sync,
    {
        let template = QueryStats::for_scorer(scorer.as_ref(), terms.len());
        let stats = template.collect_segments(segments, field, terms)?;
        let constants = stats.finalize(scorer.as_ref());
        Ok(BoundScorer { scorer, constants })
    }

    pub fn constants(&self) -> &ScoreConstants {
        &self.constants
    }

    /// Score function for one segment, `None` if the scorer cannot contribute.
    pub fn bind<'a>(
        &'a self,
        segment: &'a dyn SegmentReader,
        field: &str,
        capabilities: Capabilities,
        boost: f32,
    ) -> Option<ScoreFunction<'a>> {
        let function =
            self.scorer
                .prepare_scorer(segment, field, &self.constants, capabilities, boost);
        if function.is_none() {
            log::debug!(
                "scorer '{}' does not contribute to field '{}' in segment '{}'",
                self.scorer.name(),
                field,
                segment.name()
            );
        }
        function
    }
}

/// Score of the document `doc` is on, `0` without a score function.
pub(crate) fn score_with(function: Option<&ScoreFunction<'_>>, doc: &dyn DocAttributes) -> f32 {
    function.map(|f| f.score(doc)).unwrap_or(0.0)
}

/// A prepared query matching nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyPrepared;

impl PreparedQuery for EmptyPrepared {
    fn execute<'a>(&'a self, _segment: &'a dyn SegmentReader) -> Result<Box<dyn Matcher + 'a>> {
        Ok(Box::new(crate::query::matcher::EmptyMatcher))
    }
}
