//! Match-all query.

use std::sync::Arc;

use crate::error::Result;
use crate::index::reader::{NO_MORE_DOCS, SegmentReader};
use crate::query::matcher::{Capabilities, DocAttributes, Matcher};
use crate::query::query::{BoundScorer, PreparedQuery, Query, score_with};
use crate::scoring::{ScoreFunction, Scorer};
use crate::stats::{FieldStatistics, TermStatistics};

/// A query that matches every document.
///
/// Its matcher exposes no frequency, so scorers only contribute when
/// configured with `boost_as_score`, in which case every document scores the
/// query boost.
#[derive(Debug, Clone)]
pub struct AllQuery {
    boost: f32,
}

impl Default for AllQuery {
    fn default() -> Self {
        AllQuery { boost: 1.0 }
    }
}

impl AllQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }
}

impl Query for AllQuery {
    fn prepare(
        &self,
        _segments: &[Arc<dyn SegmentReader>],
        scorer: Option<Arc<dyn Scorer>>,
    ) -> Result<Box<dyn PreparedQuery>> {
        let scoring = scorer.map(|scorer| {
            let constants =
                scorer.finalize_stats(&FieldStatistics::default(), &[] as &[TermStatistics]);
            BoundScorer::new(scorer, constants)
        });

        Ok(Box::new(PreparedAllQuery {
            boost: self.boost,
            scoring,
        }))
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn description(&self) -> String {
        "*:*".to_string()
    }
}

#[derive(Debug)]
struct PreparedAllQuery {
    boost: f32,
    scoring: Option<BoundScorer>,
}

impl PreparedQuery for PreparedAllQuery {
    fn execute<'a>(&'a self, segment: &'a dyn SegmentReader) -> Result<Box<dyn Matcher + 'a>> {
        let capabilities = Capabilities {
            document: true,
            frequency: false,
            filter_boost: false,
        };
        let score = self
            .scoring
            .as_ref()
            .and_then(|s| s.bind(segment, "", capabilities, self.boost));

        Ok(Box::new(AllMatcher::new(segment.max_doc(), capabilities, score)))
    }
}

/// A matcher over every document id below `max_doc`.
#[derive(Debug)]
pub struct AllMatcher<'a> {
    max_doc: u64,
    current: Option<u64>,
    capabilities: Capabilities,
    score: Option<ScoreFunction<'a>>,
}

impl<'a> AllMatcher<'a> {
    pub fn new(max_doc: u64, capabilities: Capabilities, score: Option<ScoreFunction<'a>>) -> Self {
        AllMatcher {
            max_doc,
            current: None,
            capabilities,
            score,
        }
    }
}

impl DocAttributes for AllMatcher<'_> {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn doc_id(&self) -> u64 {
        match self.current {
            Some(doc) if doc < self.max_doc => doc,
            _ => NO_MORE_DOCS,
        }
    }
}

impl Matcher for AllMatcher<'_> {
    fn next(&mut self) -> Result<bool> {
        let next = match self.current {
            None => 0,
            Some(doc) => doc.saturating_add(1).min(self.max_doc),
        };
        self.current = Some(next);
        Ok(next < self.max_doc)
    }

    fn skip_to(&mut self, target: u64) -> Result<bool> {
        let next = match self.current {
            Some(doc) if doc >= target => doc,
            _ => target.min(self.max_doc),
        };
        self.current = Some(next);
        Ok(next < self.max_doc)
    }

    fn cost(&self) -> u64 {
        self.max_doc
    }

    fn is_exhausted(&self) -> bool {
        matches!(self.current, Some(doc) if doc >= self.max_doc)
    }

    fn score(&self) -> f32 {
        score_with(self.score.as_ref(), self)
    }
}
