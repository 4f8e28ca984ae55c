//! Disjunction (OR) of queries.
//!
//! The score of a document is the sum of the scores of the sub-queries
//! positioned on it. A sub-query whose scorer does not contribute, or which
//! does not match the document, adds `0`.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

use crate::error::Result;
use crate::index::reader::{NO_MORE_DOCS, SegmentReader};
use crate::query::matcher::{Capabilities, DocAttributes, Matcher};
use crate::query::query::{PreparedQuery, Query};
use crate::scoring::Scorer;

/// A query matching documents matched by any of its sub-queries.
#[derive(Debug)]
pub struct DisjunctionQuery {
    queries: Vec<Box<dyn Query>>,
    boost: f32,
}

impl Default for DisjunctionQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl DisjunctionQuery {
    pub fn new() -> Self {
        DisjunctionQuery {
            queries: Vec::new(),
            boost: 1.0,
        }
    }

    /// Add a sub-query.
    pub fn add<Q: Query + 'static>(mut self, query: Q) -> Self {
        self.queries.push(Box::new(query));
        self
    }

    pub fn add_boxed(&mut self, query: Box<dyn Query>) {
        self.queries.push(query);
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}

impl Query for DisjunctionQuery {
    fn prepare(
        &self,
        segments: &[Arc<dyn SegmentReader>],
        scorer: Option<Arc<dyn Scorer>>,
    ) -> Result<Box<dyn PreparedQuery>> {
        let prepared = self
            .queries
            .iter()
            .map(|query| query.prepare(segments, scorer.clone()))
            .collect::<Result<Vec<_>>>()?;

        Ok(Box::new(PreparedDisjunction {
            prepared,
            boost: self.boost,
        }))
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn description(&self) -> String {
        let parts: Vec<String> = self.queries.iter().map(|q| q.description()).collect();
        format!("({})", parts.join(" OR "))
    }
}

#[derive(Debug)]
struct PreparedDisjunction {
    prepared: Vec<Box<dyn PreparedQuery>>,
    boost: f32,
}

impl PreparedQuery for PreparedDisjunction {
    fn execute<'a>(&'a self, segment: &'a dyn SegmentReader) -> Result<Box<dyn Matcher + 'a>> {
        let matchers = self
            .prepared
            .iter()
            .map(|prepared| prepared.execute(segment))
            .collect::<Result<Vec<_>>>()?;
        Ok(Box::new(DisjunctionMatcher::new(matchers, self.boost)))
    }
}

/// Heap entry ordering matchers by their current document.
#[derive(Debug)]
struct MatcherEntry<'a> {
    matcher: Box<dyn Matcher + 'a>,
}

impl PartialEq for MatcherEntry<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.matcher.doc_id() == other.matcher.doc_id()
    }
}

impl Eq for MatcherEntry<'_> {}

impl PartialOrd for MatcherEntry<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MatcherEntry<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap: lower doc ids come first
        other.matcher.doc_id().cmp(&self.matcher.doc_id())
    }
}

/// A matcher that implements disjunction (OR) of multiple matchers.
#[derive(Debug)]
pub struct DisjunctionMatcher<'a> {
    /// Matchers not yet positioned.
    pending: Vec<Box<dyn Matcher + 'a>>,
    /// Min-heap of positioned matchers, ordered by current doc_id.
    heap: BinaryHeap<MatcherEntry<'a>>,
    current_doc: u64,
    started: bool,
    exhausted: bool,
    cost: u64,
    boost: f32,
}

impl<'a> DisjunctionMatcher<'a> {
    pub fn new(matchers: Vec<Box<dyn Matcher + 'a>>, boost: f32) -> Self {
        let cost = matchers.iter().map(|m| m.cost()).sum();
        DisjunctionMatcher {
            pending: matchers,
            heap: BinaryHeap::new(),
            current_doc: NO_MORE_DOCS,
            started: false,
            exhausted: false,
            cost,
            boost,
        }
    }

    fn update_current(&mut self) -> bool {
        match self.heap.peek() {
            Some(entry) => {
                self.current_doc = entry.matcher.doc_id();
                true
            }
            None => {
                self.current_doc = NO_MORE_DOCS;
                self.exhausted = true;
                false
            }
        }
    }
}

impl DocAttributes for DisjunctionMatcher<'_> {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            document: true,
            frequency: false,
            filter_boost: false,
        }
    }

    fn doc_id(&self) -> u64 {
        self.current_doc
    }
}

impl<'a> Matcher for DisjunctionMatcher<'a> {
    fn next(&mut self) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }

        if !self.started {
            self.started = true;
            for mut matcher in std::mem::take(&mut self.pending) {
                if matcher.next()? {
                    self.heap.push(MatcherEntry { matcher });
                }
            }
            return Ok(self.update_current());
        }

        // Advance all matchers that are at the current document
        let current_doc = self.current_doc;
        let mut advanced = Vec::new();
        while self
            .heap
            .peek()
            .is_some_and(|entry| entry.matcher.doc_id() == current_doc)
        {
            if let Some(mut entry) = self.heap.pop()
                && entry.matcher.next()?
            {
                advanced.push(entry);
            }
        }
        self.heap.extend(advanced);

        Ok(self.update_current())
    }

    fn skip_to(&mut self, target: u64) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }
        if self.started && self.current_doc >= target {
            return Ok(true);
        }

        let mut matchers: Vec<Box<dyn Matcher + 'a>> = std::mem::take(&mut self.pending);
        let mut positioned = Vec::new();
        for entry in std::mem::take(&mut self.heap) {
            if entry.matcher.doc_id() >= target {
                positioned.push(entry);
            } else {
                matchers.push(entry.matcher);
            }
        }
        for mut matcher in matchers {
            if matcher.skip_to(target)? {
                positioned.push(MatcherEntry { matcher });
            }
        }

        self.started = true;
        self.heap = positioned.into();
        Ok(self.update_current())
    }

    fn cost(&self) -> u64 {
        self.cost
    }

    fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    fn score(&self) -> f32 {
        let sum: f32 = self
            .heap
            .iter()
            .filter(|entry| entry.matcher.doc_id() == self.current_doc)
            .map(|entry| entry.matcher.score())
            .sum();
        sum * self.boost
    }
}
