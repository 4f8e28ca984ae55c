//! Searching a set of segments.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::index::reader::SegmentReader;
use crate::query::collector::{Collector, CountCollector, SearchHit, TopDocsCollector};
use crate::query::query::{PreparedQuery, Query};
use crate::scoring::Scorer;

/// Ranked results of a search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopDocs {
    /// Number of matching documents.
    pub total_hits: u64,
    /// Best hits, highest score first.
    pub hits: Vec<SearchHit>,
}

/// Runs queries over a fixed set of segments with an optional scorer.
///
/// Statistics are collected over every segment before any of them is
/// searched, so scores are comparable across segments.
#[derive(Debug, Clone)]
pub struct Searcher {
    segments: Vec<Arc<dyn SegmentReader>>,
    scorer: Option<Arc<dyn Scorer>>,
}

impl Searcher {
    pub fn new(segments: Vec<Arc<dyn SegmentReader>>) -> Self {
        Searcher {
            segments,
            scorer: None,
        }
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn Scorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    pub fn segments(&self) -> &[Arc<dyn SegmentReader>] {
        &self.segments
    }

    pub fn scorer(&self) -> Option<&Arc<dyn Scorer>> {
        self.scorer.as_ref()
    }

    pub fn prepare(&self, query: &dyn Query) -> Result<Box<dyn PreparedQuery>> {
        query.prepare(&self.segments, self.scorer.clone())
    }

    /// Best `limit` hits of `query`.
    pub fn search(&self, query: &dyn Query, limit: usize) -> Result<TopDocs> {
        let prepared = self.prepare(query)?;
        let mut collector = TopDocsCollector::new(limit);
        self.collect(prepared.as_ref(), &mut collector)?;

        log::debug!(
            "{} matched {} documents in {} segments",
            query.description(),
            collector.total_hits(),
            self.segments.len()
        );

        Ok(TopDocs {
            total_hits: collector.total_hits(),
            hits: collector.results(),
        })
    }

    /// Number of documents matching `query`.
    pub fn count(&self, query: &dyn Query) -> Result<u64> {
        let prepared = self.prepare(query)?;
        let mut collector = CountCollector::new();
        self.collect(prepared.as_ref(), &mut collector)?;
        Ok(collector.count())
    }

    /// Feed every match of `prepared` into `collector`, segment by segment.
    pub fn collect(&self, prepared: &dyn PreparedQuery, collector: &mut dyn Collector) -> Result<()> {
        for (segment_ord, segment) in self.segments.iter().enumerate() {
            let mut matcher = prepared.execute(segment.as_ref())?;
            while matcher.next()? {
                collector.collect(segment_ord, matcher.doc_id(), matcher.score())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::memory::MemorySegmentBuilder;
    use crate::query::term::TermQuery;
    use crate::scoring::BM25Scorer;

    fn segment(name: &str, docs: &[&str]) -> Arc<dyn SegmentReader> {
        let mut builder = MemorySegmentBuilder::new(name);
        for text in docs {
            let doc = builder.add_document();
            builder.add_text(doc, "body", text);
        }
        Arc::new(builder.build())
    }

    #[test]
    fn test_search_across_segments() -> Result<()> {
        let searcher = Searcher::new(vec![
            segment("s0", &["rust a a", "go"]),
            segment("s1", &["rust rust rust", "java"]),
        ])
        .with_scorer(Arc::new(BM25Scorer::default()));

        let top = searcher.search(&TermQuery::new("body", "rust"), 10)?;
        assert_eq!(top.total_hits, 2);
        assert_eq!(top.hits.len(), 2);
        // Same length, higher frequency.
        assert_eq!((top.hits[0].segment_ord, top.hits[0].doc_id), (1, 0));
        assert!(top.hits[0].score > top.hits[1].score);

        assert_eq!(searcher.count(&TermQuery::new("body", "go"))?, 1);
        assert_eq!(searcher.count(&TermQuery::new("body", "c"))?, 0);
        Ok(())
    }

    #[test]
    fn test_search_without_scorer() -> Result<()> {
        let searcher = Searcher::new(vec![segment("s0", &["a", "a", "b"])]);
        let top = searcher.search(&TermQuery::new("body", "a"), 1)?;

        assert_eq!(top.total_hits, 2);
        assert_eq!(top.hits.len(), 1);
        assert_eq!(top.hits[0].score, 0.0);
        assert_eq!(top.hits[0].doc_id, 0);
        Ok(())
    }
}
