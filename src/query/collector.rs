//! Collectors gathering ranked hits across segments.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A matched document with its score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Ordinal of the segment in the searcher.
    pub segment_ord: usize,
    /// Document id within the segment.
    pub doc_id: u64,
    pub score: f32,
}

impl SearchHit {
    /// Ranking order: higher score first, then segment and document order.
    fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| self.segment_ord.cmp(&other.segment_ord))
            .then_with(|| self.doc_id.cmp(&other.doc_id))
    }
}

/// Trait for collecting search results.
pub trait Collector: Send + Debug {
    /// Collect a document hit of segment `segment_ord`.
    fn collect(&mut self, segment_ord: usize, doc_id: u64, score: f32) -> Result<()>;

    /// Collected hits, best first.
    fn results(&self) -> Vec<SearchHit>;

    /// Number of documents offered to the collector.
    fn total_hits(&self) -> u64;

    /// Whether a hit below the current minimum could still be kept.
    fn needs_more(&self) -> bool;

    /// Score a hit must exceed to be kept.
    fn min_score(&self) -> f32;

    fn reset(&mut self);
}

/// Keeps the top N hits by score.
#[derive(Debug)]
pub struct TopDocsCollector {
    max_docs: usize,
    min_score: f32,
    /// Worst kept hit on top.
    hits: BinaryHeap<RankedHit>,
    total_hits: u64,
}

#[derive(Debug, Clone, Copy)]
struct RankedHit(SearchHit);

impl PartialEq for RankedHit {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RankedHit {}

impl PartialOrd for RankedHit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RankedHit {
    fn cmp(&self, other: &Self) -> Ordering {
        // Greater means ranked lower, so the heap top is the first to evict.
        self.0.rank_cmp(&other.0)
    }
}

impl TopDocsCollector {
    pub fn new(max_docs: usize) -> Self {
        Self::with_min_score(max_docs, 0.0)
    }

    /// Drop hits scoring below `min_score`.
    pub fn with_min_score(max_docs: usize, min_score: f32) -> Self {
        TopDocsCollector {
            max_docs,
            min_score,
            hits: BinaryHeap::with_capacity(max_docs.min(1024)),
            total_hits: 0,
        }
    }

    pub fn max_docs(&self) -> usize {
        self.max_docs
    }

    /// Score of the worst kept hit once the collector is full.
    pub fn current_min_score(&self) -> f32 {
        if self.needs_more() {
            self.min_score
        } else {
            self.hits.peek().map(|hit| hit.0.score).unwrap_or(self.min_score)
        }
    }
}

impl Collector for TopDocsCollector {
    fn collect(&mut self, segment_ord: usize, doc_id: u64, score: f32) -> Result<()> {
        self.total_hits += 1;

        if score < self.min_score || self.max_docs == 0 {
            return Ok(());
        }

        let hit = RankedHit(SearchHit {
            segment_ord,
            doc_id,
            score,
        });

        if self.hits.len() < self.max_docs {
            self.hits.push(hit);
        } else if let Some(worst) = self.hits.peek()
            && hit < *worst
        {
            self.hits.pop();
            self.hits.push(hit);
        }

        Ok(())
    }

    fn results(&self) -> Vec<SearchHit> {
        let mut results: Vec<SearchHit> = self.hits.iter().map(|hit| hit.0).collect();
        results.sort_by(SearchHit::rank_cmp);
        results
    }

    fn total_hits(&self) -> u64 {
        self.total_hits
    }

    fn needs_more(&self) -> bool {
        self.hits.len() < self.max_docs
    }

    fn min_score(&self) -> f32 {
        self.current_min_score()
    }

    fn reset(&mut self) {
        self.hits.clear();
        self.total_hits = 0;
    }
}

/// Counts matching documents.
#[derive(Debug, Default)]
pub struct CountCollector {
    count: u64,
    min_score: f32,
}

impl CountCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_score(min_score: f32) -> Self {
        CountCollector {
            count: 0,
            min_score,
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

impl Collector for CountCollector {
    fn collect(&mut self, _segment_ord: usize, _doc_id: u64, score: f32) -> Result<()> {
        if score >= self.min_score {
            self.count += 1;
        }
        Ok(())
    }

    fn results(&self) -> Vec<SearchHit> {
        Vec::new()
    }

    fn total_hits(&self) -> u64 {
        self.count
    }

    fn needs_more(&self) -> bool {
        true
    }

    fn min_score(&self) -> f32 {
        self.min_score
    }

    fn reset(&mut self) {
        self.count = 0;
    }
}
