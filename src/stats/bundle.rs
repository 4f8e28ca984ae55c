//! Statistics of one query over one field, as a single unit.
//!
//! A [`QueryStats`] groups the optional field collector and the term
//! collectors a scorer asked for. Its wire form is a varint frame count
//! followed by one varint length-prefixed frame per collector:
//!
//! ```text
//! frames := count:varint (len:varint bytes[len]){count}
//! ```
//!
//! The field frame, when present, comes first; term frames follow in query
//! term order.

use std::io::{ErrorKind, Read, Write};
use std::sync::Arc;

use rayon::prelude::*;

use crate::error::{AlignRankError, Result};
use crate::index::reader::SegmentReader;
use crate::scoring::{ScoreConstants, Scorer};
use crate::stats::collector::{FieldCollector, StatsCollector, TermCollector};
use crate::stats::{FieldStatistics, TermStatistics};
use crate::util::varint::{self, VarIntCursor, encode_u64_into};

/// Field and term collectors of a prepared query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryStats {
    field: Option<FieldCollector>,
    terms: Vec<TermCollector>,
}

impl QueryStats {
    pub fn new(field: Option<FieldCollector>, terms: Vec<TermCollector>) -> Self {
        QueryStats { field, terms }
    }

    /// Collectors requested by `scorer` for a query over `term_count` terms.
    pub fn for_scorer(scorer: &dyn Scorer, term_count: usize) -> Self {
        let field = scorer.prepare_field_collector();
        let terms = match scorer.prepare_term_collector() {
            Some(collector) => vec![collector; term_count],
            None => Vec::new(),
        };
        QueryStats { field, terms }
    }

    /// Collect one segment.
    ///
    /// `terms` must be empty when no term collectors were requested, and
    /// otherwise line up with the term collectors.
    pub fn collect<T: AsRef<[u8]>>(
        &mut self,
        segment: &dyn SegmentReader,
        field: &str,
        terms: &[T],
    ) -> Result<()> {
        if !self.terms.is_empty() && self.terms.len() != terms.len() {
            return Err(AlignRankError::query(format!(
                "expected {} terms, got {}",
                self.terms.len(),
                terms.len()
            )));
        }

        let Some(reader) = segment.field(field) else {
            return Ok(());
        };

        if let Some(collector) = self.field.as_mut() {
            collector.collect(segment, reader);
        }
        for (collector, term) in self.terms.iter_mut().zip(terms) {
            let attributes = reader.term(term.as_ref()).unwrap_or_default();
            collector.collect(segment, reader, &attributes);
        }
        Ok(())
    }

    /// Collect every segment on the rayon pool and merge the partial results.
    ///
    /// Each task owns its collectors; merging happens on the calling thread
    /// in segment order.
    pub fn collect_segments<T>(
        &self,
        segments: &[Arc<dyn SegmentReader>],
        field: &str,
        terms: &[T],
    ) -> Result<QueryStats>
    where
        T: AsRef<[u8]> + Sync,
    {
        let partials = segments
            .par_iter()
            .map(|segment| {
                let mut partial = self.empty();
                partial.collect(segment.as_ref(), field, terms)?;
                Ok(partial)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut merged = self.empty();
        for partial in &partials {
            merged.merge(partial)?;
        }

        log::debug!(
            "collected statistics for field '{}' over {} segments: {:?}",
            field,
            segments.len(),
            merged.field_statistics()
        );
        Ok(merged)
    }

    /// Add the counters of another bundle with the same shape.
    pub fn merge(&mut self, other: &QueryStats) -> Result<()> {
        self.check_shape(other.field.is_some(), other.terms.len())?;

        if let (Some(mine), Some(theirs)) = (self.field.as_mut(), other.field.as_ref()) {
            mine.merge(theirs);
        }
        for (mine, theirs) in self.terms.iter_mut().zip(&other.terms) {
            mine.merge(theirs);
        }
        Ok(())
    }

    /// Field counts, zero when no field collector was requested.
    pub fn field_statistics(&self) -> FieldStatistics {
        self.field
            .as_ref()
            .map(FieldCollector::statistics)
            .unwrap_or_default()
    }

    /// Term counts in query term order.
    pub fn term_statistics(&self) -> Vec<TermStatistics> {
        self.terms.iter().map(TermCollector::statistics).collect()
    }

    /// Finalize the collected counts into `scorer`'s ranking constants.
    pub fn finalize(&self, scorer: &dyn Scorer) -> ScoreConstants {
        scorer.finalize_stats(&self.field_statistics(), &self.term_statistics())
    }

    /// Write the wire form, prefixed with its length.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<usize> {
        let bytes = self.to_wire();
        let prefix = varint::write_u64(writer, bytes.len() as u64)?;
        writer.write_all(&bytes)?;
        Ok(prefix + bytes.len())
    }

    /// Read a length-prefixed wire form written by [`QueryStats::write_to`]
    /// and merge it into this bundle.
    ///
    /// A truncated stream is reported as corrupt statistics. The body is read
    /// incrementally, so a bogus length prefix never drives an allocation.
    pub fn read_from<R: Read>(&mut self, reader: &mut R) -> Result<()> {
        let len = varint::read_u64(reader).map_err(|e| match e {
            AlignRankError::Io(io) if io.kind() == ErrorKind::UnexpectedEof => {
                AlignRankError::corrupt_statistics("statistics stream ends inside the length prefix")
            }
            other => other,
        })?;

        let mut bytes = Vec::new();
        reader.by_ref().take(len).read_to_end(&mut bytes)?;
        if bytes.len() as u64 != len {
            return Err(AlignRankError::corrupt_statistics(format!(
                "statistics stream holds {} of {len} bytes",
                bytes.len()
            )));
        }
        self.merge_from(&bytes)
    }

    fn frame_count(&self) -> usize {
        usize::from(self.field.is_some()) + self.terms.len()
    }

    fn empty(&self) -> QueryStats {
        let mut stats = self.clone();
        stats.reset();
        stats
    }

    fn check_shape(&self, has_field: bool, term_count: usize) -> Result<()> {
        if self.field.is_some() != has_field || self.terms.len() != term_count {
            return Err(AlignRankError::corrupt_statistics(format!(
                "statistics shape mismatch: expected field={} terms={}, got field={} terms={}",
                self.field.is_some(),
                self.terms.len(),
                has_field,
                term_count
            )));
        }
        Ok(())
    }
}

impl StatsCollector for QueryStats {
    fn reset(&mut self) {
        if let Some(field) = self.field.as_mut() {
            field.reset();
        }
        self.terms.iter_mut().for_each(StatsCollector::reset);
    }

    fn merge_from(&mut self, bytes: &[u8]) -> Result<()> {
        let mut cursor = VarIntCursor::new(bytes);
        let count = cursor.read_u64()?;
        if count != self.frame_count() as u64 {
            return Err(AlignRankError::corrupt_statistics(format!(
                "expected {} frames, got {count}",
                self.frame_count()
            )));
        }

        // Decode into a scratch copy so a bad frame leaves `self` untouched.
        let mut decoded = self.empty();
        if let Some(field) = decoded.field.as_mut() {
            let len = cursor.read_u64()? as usize;
            field.merge_from(cursor.read_bytes(len)?)?;
        }
        for term in decoded.terms.iter_mut() {
            let len = cursor.read_u64()? as usize;
            term.merge_from(cursor.read_bytes(len)?)?;
        }
        cursor.finish()?;

        self.merge(&decoded)
    }

    fn to_wire(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        encode_u64_into(self.frame_count() as u64, &mut bytes);

        let frames = self
            .field
            .iter()
            .map(StatsCollector::to_wire)
            .chain(self.terms.iter().map(StatsCollector::to_wire));
        for frame in frames {
            encode_u64_into(frame.len() as u64, &mut bytes);
            bytes.extend_from_slice(&frame);
        }
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::memory::{MemorySegment, MemorySegmentBuilder};
    use crate::scoring::bm25::BM25Scorer;
    use crate::scoring::tfidf::TfIdfScorer;

    fn segment(name: &str, docs: &[&str]) -> MemorySegment {
        let mut builder = MemorySegmentBuilder::new(name);
        for text in docs {
            let doc = builder.add_document();
            builder.add_text(doc, "body", text);
        }
        builder.build()
    }

    #[test]
    fn test_for_scorer_shapes() {
        let bm25 = QueryStats::for_scorer(&BM25Scorer::default(), 2);
        assert_eq!(bm25.frame_count(), 3);

        let tfidf = QueryStats::for_scorer(&TfIdfScorer::default(), 2);
        assert_eq!(tfidf.frame_count(), 3);
    }

    #[test]
    fn test_collect_single_segment() {
        let seg = segment("s0", &["a b", "b c c", "d"]);
        let mut stats = QueryStats::new(
            Some(FieldCollector::new()),
            vec![TermCollector::new(), TermCollector::new()],
        );
        stats.collect(&seg, "body", &["b", "z"]).unwrap();

        assert_eq!(
            stats.field_statistics(),
            FieldStatistics {
                documents_with_field: 3,
                total_term_occurrences: 6,
            }
        );
        let terms = stats.term_statistics();
        assert_eq!(terms[0].documents_with_term, 2);
        assert_eq!(terms[1].documents_with_term, 0);

        // Missing field contributes nothing.
        stats.collect(&seg, "title", &["b", "z"]).unwrap();
        assert_eq!(stats.field_statistics().documents_with_field, 3);

        assert!(stats.collect(&seg, "body", &["b"]).is_err());
    }

    #[test]
    fn test_collect_segments_in_parallel() {
        let segments: Vec<Arc<dyn SegmentReader>> = vec![
            Arc::new(segment("s0", &["a b", "a"])),
            Arc::new(segment("s1", &["b", "c"])),
            Arc::new(segment("s2", &["a a a"])),
        ];
        let template = QueryStats::new(Some(FieldCollector::new()), vec![TermCollector::new()]);

        let merged = template.collect_segments(&segments, "body", &["a"]).unwrap();
        assert_eq!(merged.field_statistics().documents_with_field, 5);
        assert_eq!(merged.field_statistics().total_term_occurrences, 8);
        assert_eq!(merged.term_statistics()[0].documents_with_term, 3);

        // The template itself is untouched.
        assert_eq!(template.field_statistics(), FieldStatistics::default());
    }

    #[test]
    fn test_wire_round_trip_and_merge() {
        let seg = segment("s0", &["a b", "b"]);
        let mut stats = QueryStats::new(Some(FieldCollector::new()), vec![TermCollector::new()]);
        stats.collect(&seg, "body", &["b"]).unwrap();

        let wire = stats.to_wire();
        let mut decoded = stats.empty();
        decoded.merge_from(&wire).unwrap();
        assert_eq!(decoded, stats);

        decoded.merge_from(&wire).unwrap();
        assert_eq!(decoded.term_statistics()[0].documents_with_term, 4);
    }

    #[test]
    fn test_corrupt_frames() {
        let stats = QueryStats::new(Some(FieldCollector::new()), vec![TermCollector::new()]);
        let wire = stats.to_wire();

        let mut other_shape = QueryStats::new(Some(FieldCollector::new()), Vec::new());
        assert!(matches!(
            other_shape.merge_from(&wire),
            Err(AlignRankError::CorruptStatistics(_))
        ));

        let mut target = stats.empty();
        assert!(target.merge_from(&wire[..wire.len() - 1]).is_err());

        let mut trailing = wire.clone();
        trailing.push(1);
        assert!(target.merge_from(&trailing).is_err());
        assert_eq!(target, stats.empty());
    }

    #[test]
    fn test_write_read_stream() {
        let seg = segment("s0", &["x y z"]);
        let mut stats = QueryStats::new(Some(FieldCollector::new()), vec![TermCollector::new()]);
        stats.collect(&seg, "body", &["y"]).unwrap();

        let mut buffer = Vec::new();
        let written = stats.write_to(&mut buffer).unwrap();
        assert_eq!(written, buffer.len());

        let mut restored = stats.empty();
        restored.read_from(&mut buffer.as_slice()).unwrap();
        assert_eq!(restored, stats);
    }

    #[test]
    fn test_read_huge_length_prefix() {
        let mut buffer = vec![0xFF; 9];
        buffer.push(0x01);

        let mut stats = QueryStats::new(Some(FieldCollector::new()), vec![TermCollector::new()]);
        assert!(matches!(
            stats.read_from(&mut buffer.as_slice()),
            Err(AlignRankError::CorruptStatistics(_))
        ));
        assert_eq!(stats, stats.empty());
    }

    #[test]
    fn test_read_truncated_stream() {
        let seg = segment("s0", &["x y z"]);
        let mut stats = QueryStats::new(Some(FieldCollector::new()), vec![TermCollector::new()]);
        stats.collect(&seg, "body", &["y"]).unwrap();

        let mut buffer = Vec::new();
        stats.write_to(&mut buffer).unwrap();
        buffer.pop();

        let mut restored = stats.empty();
        assert!(matches!(
            restored.read_from(&mut buffer.as_slice()),
            Err(AlignRankError::CorruptStatistics(_))
        ));
        assert_eq!(restored, stats.empty());

        // Cut inside the length prefix.
        let mut prefix_only: &[u8] = &[0x80];
        assert!(matches!(
            restored.read_from(&mut prefix_only),
            Err(AlignRankError::CorruptStatistics(_))
        ));
        let mut empty: &[u8] = &[];
        assert!(matches!(
            restored.read_from(&mut empty),
            Err(AlignRankError::CorruptStatistics(_))
        ));
    }
}
