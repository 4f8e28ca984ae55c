//! Term query implementation for exact term matching.

use std::sync::Arc;

use crate::error::Result;
use crate::index::reader::{PostingIterator, SegmentReader};
use crate::query::matcher::{Capabilities, DocAttributes, EmptyMatcher, Matcher};
use crate::query::query::{BoundScorer, PreparedQuery, Query, score_with};
use crate::scoring::{ScoreFunction, Scorer};

/// A query that matches documents containing a specific term.
#[derive(Debug, Clone)]
pub struct TermQuery {
    /// The field to search in.
    field: String,
    /// The term to search for.
    term: Vec<u8>,
    /// The boost factor for this query.
    boost: f32,
}

impl TermQuery {
    /// Create a new term query.
    ///
    /// The term is matched exactly; it is not analyzed.
    pub fn new<F, T>(field: F, term: T) -> Self
    where
        F: Into<String>,
        T: Into<Vec<u8>>,
    {
        TermQuery {
            field: field.into(),
            term: term.into(),
            boost: 1.0,
        }
    }

    /// Get the term.
    pub fn term(&self) -> &[u8] {
        &self.term
    }

    /// Set the boost factor.
    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }
}

impl Query for TermQuery {
    fn prepare(
        &self,
        segments: &[Arc<dyn SegmentReader>],
        scorer: Option<Arc<dyn Scorer>>,
    ) -> Result<Box<dyn PreparedQuery>> {
        let scoring = scorer
            .map(|scorer| {
                BoundScorer::collect(scorer, segments, &self.field, std::slice::from_ref(&self.term))
            })
            .transpose()?;

        Ok(Box::new(PreparedTermQuery {
            query: self.clone(),
            scoring,
        }))
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn description(&self) -> String {
        format!("{}:{}", self.field, String::from_utf8_lossy(&self.term))
    }

    fn field(&self) -> Option<&str> {
        Some(&self.field)
    }
}

#[derive(Debug)]
struct PreparedTermQuery {
    query: TermQuery,
    scoring: Option<BoundScorer>,
}

impl PreparedQuery for PreparedTermQuery {
    fn execute<'a>(&'a self, segment: &'a dyn SegmentReader) -> Result<Box<dyn Matcher + 'a>> {
        let field = &self.query.field;
        let Some(reader) = segment.field(field) else {
            return Ok(Box::new(EmptyMatcher::new()));
        };
        let Some(postings) = reader.postings(&self.query.term)? else {
            return Ok(Box::new(EmptyMatcher::new()));
        };

        let capabilities = Capabilities {
            document: true,
            frequency: reader.total_term_freq().is_some(),
            filter_boost: false,
        };
        let score = self
            .scoring
            .as_ref()
            .and_then(|s| s.bind(segment, field, capabilities, self.query.boost));

        Ok(Box::new(TermMatcher::new(postings, capabilities, score)))
    }
}

/// A matcher over the postings of a single term.
#[derive(Debug)]
pub struct TermMatcher<'a> {
    postings: Box<dyn PostingIterator>,
    capabilities: Capabilities,
    score: Option<ScoreFunction<'a>>,
    exhausted: bool,
}

impl<'a> TermMatcher<'a> {
    pub fn new(
        postings: Box<dyn PostingIterator>,
        capabilities: Capabilities,
        score: Option<ScoreFunction<'a>>,
    ) -> Self {
        TermMatcher {
            postings,
            capabilities,
            score,
            exhausted: false,
        }
    }
}

impl DocAttributes for TermMatcher<'_> {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn doc_id(&self) -> u64 {
        self.postings.doc_id()
    }

    fn frequency(&self) -> u64 {
        self.postings.term_freq()
    }
}

impl Matcher for TermMatcher<'_> {
    fn next(&mut self) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }
        let has_next = self.postings.next()?;
        self.exhausted = !has_next;
        Ok(has_next)
    }

    fn skip_to(&mut self, target: u64) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }
        let found = self.postings.skip_to(target)?;
        self.exhausted = !found;
        Ok(found)
    }

    fn cost(&self) -> u64 {
        self.postings.cost()
    }

    fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    fn score(&self) -> f32 {
        score_with(self.score.as_ref(), self)
    }
}
