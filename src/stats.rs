//! Corpus statistics gathered at query preparation time.
//!
//! Every segment taking part in a query is visited by a [`FieldCollector`]
//! and one [`TermCollector`] per query term. The accumulated counts are
//! format-independent: a scorer turns them into its own ranking constants
//! (see [`crate::scoring::Scorer::finalize_stats`]).
//!
//! Collectors add, they never overwrite, so partial results from any number
//! of segments or remote shards can be merged in any order. Their state
//! travels between shards in the varint wire format of
//! [`StatsCollector::to_wire`].

pub mod bundle;
pub mod collector;

use serde::{Deserialize, Serialize};

pub use bundle::QueryStats;
pub use collector::{FieldCollector, StatsCollector, TermCollector};

/// Per-field counts accumulated across segments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldStatistics {
    /// Documents having at least one posting in the field.
    pub documents_with_field: u64,
    /// Sum of term frequencies over every term and document of the field.
    pub total_term_occurrences: u64,
}

impl FieldStatistics {
    /// Average field length, or `None` when either count is zero.
    pub fn average_length(&self) -> Option<f64> {
        if self.documents_with_field == 0 || self.total_term_occurrences == 0 {
            None
        } else {
            Some(self.total_term_occurrences as f64 / self.documents_with_field as f64)
        }
    }
}

/// Per-term counts accumulated across segments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermStatistics {
    /// Documents containing the term.
    pub documents_with_term: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_length() {
        let stats = FieldStatistics {
            documents_with_field: 4,
            total_term_occurrences: 10,
        };
        assert_eq!(stats.average_length(), Some(2.5));
        assert_eq!(FieldStatistics::default().average_length(), None);

        let no_freqs = FieldStatistics {
            documents_with_field: 3,
            total_term_occurrences: 0,
        };
        assert_eq!(no_freqs.average_length(), None);
    }
}
