//! N-gram similarity query.
//!
//! Matches documents whose field contains the query n-grams in order, allowing
//! gaps and missing grams. For every candidate document the positions of the
//! pattern terms are merged into one term sequence and aligned against the
//! pattern (see [`crate::query::alignment`]). A document matches when the
//! alignment quality reaches the threshold.
//!
//! The matcher exposes two attributes to scorers:
//!
//! - `frequency`: number of disjoint best alignments,
//! - `filter_boost`: the alignment quality.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use alignrank::index::memory::MemorySegmentBuilder;
//! use alignrank::index::reader::SegmentReader;
//! use alignrank::query::matcher::{DocAttributes, Matcher};
//! use alignrank::query::ngram::NgramSimilarityQuery;
//! use alignrank::query::query::Query;
//!
//! let mut builder = MemorySegmentBuilder::new("seg");
//! let doc = builder.add_document();
//! builder.add_text(doc, "body", "1 3 4 5 6 7 2");
//! let segments: Vec<Arc<dyn SegmentReader>> = vec![Arc::new(builder.build())];
//!
//! let query = NgramSimilarityQuery::new("body", ["1", "2", "3", "4"], 0.7).unwrap();
//! let prepared = query.prepare(&segments, None).unwrap();
//! let mut matcher = prepared.execute(segments[0].as_ref()).unwrap();
//!
//! assert!(matcher.next().unwrap());
//! assert_eq!(matcher.filter_boost(), 0.75);
//! ```

use std::sync::Arc;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::analysis::tokenizer::Tokenizer;
use crate::error::{AlignRankError, Result};
use crate::index::reader::{NO_MORE_DOCS, PostingIterator, SegmentReader};
use crate::query::alignment::{AlignmentResult, SequenceAligner, merge_positions, min_match_length};
use crate::query::all::AllMatcher;
use crate::query::matcher::{Capabilities, DocAttributes, EmptyMatcher, Matcher};
use crate::query::query::{BoundScorer, PreparedQuery, Query, score_with};
use crate::scoring::{ScoreFunction, Scorer};

fn default_threshold() -> f32 {
    1.0
}

/// Filter options as they arrive from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NgramMatchOptions {
    /// Pattern n-grams, in order. Duplicates are allowed.
    pub ngrams: Vec<String>,
    /// Minimum alignment quality, in `(0, 1]`.
    #[serde(default = "default_threshold")]
    pub threshold: f32,
}

/// A query matching documents by ordered n-gram similarity.
#[derive(Debug, Clone)]
pub struct NgramSimilarityQuery {
    field: String,
    ngrams: Vec<Vec<u8>>,
    threshold: f32,
    boost: f32,
}

impl NgramSimilarityQuery {
    /// Create a query over `field` for the given pattern.
    ///
    /// Fails unless `threshold` lies in `(0, 1]`.
    pub fn new<F, I, T>(field: F, ngrams: I, threshold: f32) -> Result<Self>
    where
        F: Into<String>,
        I: IntoIterator<Item = T>,
        T: Into<Vec<u8>>,
    {
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(AlignRankError::invalid_config(format!(
                "ngram threshold must be in (0, 1], got {threshold}"
            )));
        }

        Ok(NgramSimilarityQuery {
            field: field.into(),
            ngrams: ngrams.into_iter().map(Into::into).collect(),
            threshold,
            boost: 1.0,
        })
    }

    pub fn from_options<F: Into<String>>(field: F, options: NgramMatchOptions) -> Result<Self> {
        Self::new(field, options.ngrams, options.threshold)
    }

    /// Build from a JSON object `{"ngrams": [...], "threshold": 0.7}`.
    pub fn from_json<F: Into<String>>(field: F, args: &Value) -> Result<Self> {
        let options: NgramMatchOptions = serde_json::from_value(args.clone())
            .map_err(|e| AlignRankError::invalid_config(format!("ngram match: {e}")))?;
        Self::from_options(field, options)
    }

    /// Build the pattern by running `tokenizer` over `text`.
    pub fn from_text<F: Into<String>>(
        field: F,
        text: &str,
        tokenizer: &dyn Tokenizer,
        threshold: f32,
    ) -> Result<Self> {
        let ngrams: Vec<String> = tokenizer.tokenize(text)?.map(|token| token.text).collect();
        log::debug!(
            "{} tokenizer produced {} ngrams for '{}'",
            tokenizer.name(),
            ngrams.len(),
            text
        );
        Self::new(field, ngrams, threshold)
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    pub fn ngrams(&self) -> &[Vec<u8>] {
        &self.ngrams
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Distinct pattern terms in first-occurrence order, and the pattern
    /// expressed as indexes into them.
    fn distinct_terms(&self) -> (Vec<Vec<u8>>, Vec<usize>) {
        let mut ids: AHashMap<&[u8], usize> = AHashMap::new();
        let mut terms = Vec::new();
        let mut pattern = Vec::with_capacity(self.ngrams.len());

        for ngram in &self.ngrams {
            let id = *ids.entry(ngram.as_slice()).or_insert_with(|| {
                terms.push(ngram.clone());
                terms.len() - 1
            });
            pattern.push(id);
        }
        (terms, pattern)
    }
}

impl Query for NgramSimilarityQuery {
    fn prepare(
        &self,
        segments: &[Arc<dyn SegmentReader>],
        scorer: Option<Arc<dyn Scorer>>,
    ) -> Result<Box<dyn PreparedQuery>> {
        let (terms, pattern) = self.distinct_terms();
        let scoring = scorer
            .map(|scorer| BoundScorer::collect(scorer, segments, &self.field, &terms))
            .transpose()?;

        let min_match = min_match_length(pattern.len(), self.threshold);
        log::debug!(
            "prepared ngram query on '{}': {} ngrams, {} distinct, min match {}",
            self.field,
            pattern.len(),
            terms.len(),
            min_match
        );

        Ok(Box::new(PreparedNgramQuery {
            field: self.field.clone(),
            terms,
            pattern,
            threshold: self.threshold,
            min_match,
            boost: self.boost,
            scoring,
        }))
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn description(&self) -> String {
        let ngrams: Vec<_> = self
            .ngrams
            .iter()
            .map(|ngram| String::from_utf8_lossy(ngram))
            .collect();
        format!("{}:ngram({}, {})", self.field, ngrams.join(" "), self.threshold)
    }

    fn field(&self) -> Option<&str> {
        Some(&self.field)
    }
}

#[derive(Debug)]
struct PreparedNgramQuery {
    field: String,
    terms: Vec<Vec<u8>>,
    pattern: Vec<usize>,
    threshold: f32,
    min_match: usize,
    boost: f32,
    scoring: Option<BoundScorer>,
}

impl PreparedQuery for PreparedNgramQuery {
    fn execute<'a>(&'a self, segment: &'a dyn SegmentReader) -> Result<Box<dyn Matcher + 'a>> {
        let capabilities = Capabilities::all();
        let bind = move || {
            self.scoring
                .as_ref()
                .and_then(|s| s.bind(segment, &self.field, capabilities, self.boost))
        };

        if self.pattern.is_empty() {
            return Ok(Box::new(AllMatcher::new(segment.max_doc(), capabilities, bind())));
        }

        let Some(reader) = segment.field(&self.field) else {
            return Ok(Box::new(EmptyMatcher::new()));
        };

        let mut streams = Vec::with_capacity(self.terms.len());
        for (term_id, term) in self.terms.iter().enumerate() {
            if let Some(postings) = reader.postings(term)? {
                let weight = self.pattern.iter().filter(|&&id| id == term_id).count();
                streams.push(TermStream {
                    term_id,
                    weight,
                    postings,
                    active: false,
                });
            }
        }

        let reachable: usize = streams.iter().map(|s| s.weight).sum();
        if reachable < self.min_match {
            log::trace!(
                "segment '{}' holds {} of {} pattern ngrams, below {}",
                segment.name(),
                reachable,
                self.pattern.len(),
                self.min_match
            );
            return Ok(Box::new(EmptyMatcher::new()));
        }

        Ok(Box::new(NgramSimilarityMatcher {
            streams,
            aligner: SequenceAligner::new(self.pattern.clone()),
            threshold: self.threshold,
            min_match: self.min_match,
            positional: reader.has_positions(),
            score: bind(),
            current_doc: NO_MORE_DOCS,
            result: AlignmentResult::NO_MATCH,
            started: false,
            exhausted: false,
            lists: Vec::new(),
            events: Vec::new(),
        }))
    }
}

/// Postings of one distinct pattern term.
#[derive(Debug)]
struct TermStream {
    term_id: usize,
    /// Occurrences of the term in the pattern.
    weight: usize,
    postings: Box<dyn PostingIterator>,
    /// Positioned on a document.
    active: bool,
}

impl TermStream {
    fn is_on(&self, doc: u64) -> bool {
        self.active && self.postings.doc_id() == doc
    }
}

/// Matcher walking the documents that align with an n-gram pattern.
#[derive(Debug)]
pub struct NgramSimilarityMatcher<'a> {
    streams: Vec<TermStream>,
    aligner: SequenceAligner,
    threshold: f32,
    min_match: usize,
    positional: bool,
    score: Option<ScoreFunction<'a>>,
    current_doc: u64,
    result: AlignmentResult,
    started: bool,
    exhausted: bool,
    /// Scratch: position buffers, one per stream on the candidate document.
    lists: Vec<(usize, Vec<u64>)>,
    /// Scratch: merged term sequence of the candidate document.
    events: Vec<usize>,
}

impl NgramSimilarityMatcher<'_> {
    /// Current alignment result.
    pub fn alignment(&self) -> AlignmentResult {
        self.result
    }

    /// Advance the streams positioned on `doc`.
    fn advance_past(&mut self, doc: u64) -> Result<()> {
        for stream in self.streams.iter_mut().filter(|s| s.is_on(doc)) {
            stream.active = stream.postings.next()?;
        }
        Ok(())
    }

    /// Scan forward from the streams' current documents to the next match.
    fn find_match(&mut self) -> Result<bool> {
        loop {
            let candidate = self
                .streams
                .iter()
                .filter(|s| s.active)
                .map(|s| s.postings.doc_id())
                .min();
            let Some(doc) = candidate else {
                self.exhausted = true;
                self.current_doc = NO_MORE_DOCS;
                self.result = AlignmentResult::NO_MATCH;
                return Ok(false);
            };

            let matched: usize = self
                .streams
                .iter()
                .filter(|s| s.is_on(doc))
                .map(|s| s.weight)
                .sum();

            if matched >= self.min_match {
                let result = self.evaluate(doc, matched)?;
                if result.is_match(self.threshold) {
                    self.current_doc = doc;
                    self.result = result;
                    return Ok(true);
                }
            }

            self.advance_past(doc)?;
        }
    }

    fn evaluate(&mut self, doc: u64, matched: usize) -> Result<AlignmentResult> {
        let pattern_len = self.aligner.pattern().len();

        let result = if self.positional {
            // Position buffers are kept across documents; only `used` are live.
            let mut used = 0;
            for stream in self.streams.iter().filter(|s| s.is_on(doc)) {
                if used == self.lists.len() {
                    self.lists.push((0, Vec::new()));
                }
                let (term_id, positions) = &mut self.lists[used];
                *term_id = stream.term_id;
                stream.postings.positions_into(positions)?;
                used += 1;
            }
            merge_positions(&self.lists[..used], &mut self.events);
            self.aligner.align(&self.events)
        } else {
            // Without positions order is unknown: count the pattern terms present.
            AlignmentResult {
                frequency: 1,
                quality: matched as f32 / pattern_len as f32,
            }
        };

        log::trace!("doc {doc}: {matched} of {pattern_len} ngrams present, {result:?}");
        Ok(result)
    }
}

impl DocAttributes for NgramSimilarityMatcher<'_> {
    fn capabilities(&self) -> Capabilities {
        Capabilities::all()
    }

    fn doc_id(&self) -> u64 {
        self.current_doc
    }

    fn frequency(&self) -> u64 {
        self.result.frequency
    }

    fn filter_boost(&self) -> f32 {
        self.result.quality
    }
}

impl Matcher for NgramSimilarityMatcher<'_> {
    fn next(&mut self) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }

        if self.started {
            self.advance_past(self.current_doc)?;
        } else {
            self.started = true;
            for stream in self.streams.iter_mut() {
                stream.active = stream.postings.next()?;
            }
        }
        self.find_match()
    }

    fn skip_to(&mut self, target: u64) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }
        if self.started && self.current_doc >= target {
            return Ok(true);
        }

        let first = !self.started;
        self.started = true;
        for stream in self.streams.iter_mut() {
            if first || (stream.active && stream.postings.doc_id() < target) {
                stream.active = stream.postings.skip_to(target)?;
            }
        }
        self.find_match()
    }

    fn cost(&self) -> u64 {
        self.streams.iter().map(|s| s.postings.cost()).sum()
    }

    fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    fn score(&self) -> f32 {
        score_with(self.score.as_ref(), self)
    }
}
