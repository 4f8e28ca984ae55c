//! Field and term statistic collectors.

use std::fmt::Debug;

use crate::error::Result;
use crate::index::reader::{FieldReader, SegmentReader, TermAttributes};
use crate::stats::{FieldStatistics, TermStatistics};
use crate::util::varint::{VarIntCursor, encode_u64_into};

/// Common contract of statistic accumulators.
pub trait StatsCollector: Send + Debug {
    /// Zero every counter.
    fn reset(&mut self);

    /// Decode a wire-encoded statistic and add it to this accumulator.
    ///
    /// Fails with [`crate::error::AlignRankError::CorruptStatistics`] unless
    /// `bytes` is consumed exactly. On failure the accumulator is unchanged.
    fn merge_from(&mut self, bytes: &[u8]) -> Result<()>;

    /// Encode the counters, in declaration order, as unsigned varints.
    fn to_wire(&self) -> Vec<u8>;
}

/// Accumulates [`FieldStatistics`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldCollector {
    stats: FieldStatistics,
}

impl FieldCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the counts one segment reports for a field.
    pub fn collect(&mut self, segment: &dyn SegmentReader, field: &dyn FieldReader) {
        self.stats.documents_with_field = self
            .stats
            .documents_with_field
            .saturating_add(field.docs_count());

        if let Some(total) = field.total_term_freq() {
            self.stats.total_term_occurrences =
                self.stats.total_term_occurrences.saturating_add(total);
        }

        log::trace!(
            "collected field '{}' in segment '{}': {:?}",
            field.name(),
            segment.name(),
            self.stats
        );
    }

    /// Add the state of another collector.
    pub fn merge(&mut self, other: &FieldCollector) {
        self.add(other.stats);
    }

    pub fn statistics(&self) -> FieldStatistics {
        self.stats
    }

    fn add(&mut self, stats: FieldStatistics) {
        self.stats.documents_with_field = self
            .stats
            .documents_with_field
            .saturating_add(stats.documents_with_field);
        self.stats.total_term_occurrences = self
            .stats
            .total_term_occurrences
            .saturating_add(stats.total_term_occurrences);
    }
}

impl From<FieldStatistics> for FieldCollector {
    fn from(stats: FieldStatistics) -> Self {
        FieldCollector { stats }
    }
}

impl StatsCollector for FieldCollector {
    fn reset(&mut self) {
        self.stats = FieldStatistics::default();
    }

    fn merge_from(&mut self, bytes: &[u8]) -> Result<()> {
        let mut cursor = VarIntCursor::new(bytes);
        let documents_with_field = cursor.read_u64()?;
        let total_term_occurrences = cursor.read_u64()?;
        cursor.finish()?;

        self.add(FieldStatistics {
            documents_with_field,
            total_term_occurrences,
        });
        Ok(())
    }

    fn to_wire(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(4);
        encode_u64_into(self.stats.documents_with_field, &mut bytes);
        encode_u64_into(self.stats.total_term_occurrences, &mut bytes);
        bytes
    }
}

/// Accumulates [`TermStatistics`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermCollector {
    stats: TermStatistics,
}

impl TermCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the document count of a term in one segment.
    ///
    /// Attributes without a document count contribute nothing.
    pub fn collect(
        &mut self,
        segment: &dyn SegmentReader,
        field: &dyn FieldReader,
        term: &TermAttributes,
    ) {
        if let Some(doc_freq) = term.doc_freq {
            self.stats.documents_with_term =
                self.stats.documents_with_term.saturating_add(doc_freq);
        }

        log::trace!(
            "collected term in field '{}' of segment '{}': {:?}",
            field.name(),
            segment.name(),
            term
        );
    }

    /// Add the state of another collector.
    pub fn merge(&mut self, other: &TermCollector) {
        self.stats.documents_with_term = self
            .stats
            .documents_with_term
            .saturating_add(other.stats.documents_with_term);
    }

    pub fn statistics(&self) -> TermStatistics {
        self.stats
    }
}

impl From<TermStatistics> for TermCollector {
    fn from(stats: TermStatistics) -> Self {
        TermCollector { stats }
    }
}

impl StatsCollector for TermCollector {
    fn reset(&mut self) {
        self.stats = TermStatistics::default();
    }

    fn merge_from(&mut self, bytes: &[u8]) -> Result<()> {
        let mut cursor = VarIntCursor::new(bytes);
        let documents_with_term = cursor.read_u64()?;
        cursor.finish()?;

        self.stats.documents_with_term = self
            .stats
            .documents_with_term
            .saturating_add(documents_with_term);
        Ok(())
    }

    fn to_wire(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(2);
        encode_u64_into(self.stats.documents_with_term, &mut bytes);
        bytes
    }
}
