//! BM25 (and BM15, with `b = 0`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AlignRankError, Result};
use crate::index::reader::SegmentReader;
use crate::query::matcher::Capabilities;
use crate::scoring::function::{Bm25Context, ScoreFunction};
use crate::scoring::{Bm25Stats, ScoreConstants, Scorer};
use crate::stats::{FieldCollector, FieldStatistics, TermCollector, TermStatistics};

/// Parameters of [`BM25Scorer`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BM25Config {
    /// Term frequency saturation.
    pub k: f32,
    /// Length normalization strength; `0` disables it.
    pub b: f32,
    /// Score frequency-less documents with the query boost.
    pub boost_as_score: bool,
}

impl Default for BM25Config {
    fn default() -> Self {
        BM25Config {
            k: BM25Scorer::DEFAULT_K,
            b: BM25Scorer::DEFAULT_B,
            boost_as_score: false,
        }
    }
}

/// BM25 scorer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BM25Scorer {
    k: f32,
    b: f32,
    boost_as_score: bool,
}

impl Default for BM25Scorer {
    fn default() -> Self {
        BM25Scorer {
            k: Self::DEFAULT_K,
            b: Self::DEFAULT_B,
            boost_as_score: false,
        }
    }
}

impl BM25Scorer {
    pub const NAME: &'static str = "bm25";
    pub const DEFAULT_K: f32 = 1.2;
    pub const DEFAULT_B: f32 = 0.75;

    /// Create a BM25 scorer, validating `k` and `b`.
    pub fn new(k: f32, b: f32) -> Result<Self> {
        Self::from_config(BM25Config {
            k,
            b,
            boost_as_score: false,
        })
    }

    pub fn from_config(config: BM25Config) -> Result<Self> {
        if !config.k.is_finite() || config.k < 0.0 {
            return Err(AlignRankError::invalid_config(format!(
                "bm25: k must be a finite number >= 0, got {}",
                config.k
            )));
        }
        if !(0.0..=1.0).contains(&config.b) {
            return Err(AlignRankError::invalid_config(format!(
                "bm25: b must be in [0, 1], got {}",
                config.b
            )));
        }

        Ok(BM25Scorer {
            k: config.k,
            b: config.b,
            boost_as_score: config.boost_as_score,
        })
    }

    /// Build from JSON arguments: an object, a positional `[k, b]` array, or
    /// `null` for the defaults.
    pub fn from_json(args: &Value) -> Result<Self> {
        let config = match args {
            Value::Null => BM25Config::default(),
            Value::Object(_) => serde_json::from_value(args.clone())
                .map_err(|e| AlignRankError::invalid_config(format!("bm25: {e}")))?,
            Value::Array(items) => {
                if items.len() > 2 {
                    return Err(AlignRankError::invalid_config(format!(
                        "bm25: expected at most 2 positional arguments, got {}",
                        items.len()
                    )));
                }
                let mut config = BM25Config::default();
                if let Some(k) = items.first() {
                    config.k = positional_f32(k, "k")?;
                }
                if let Some(b) = items.get(1) {
                    config.b = positional_f32(b, "b")?;
                }
                config
            }
            other => {
                return Err(AlignRankError::invalid_config(format!(
                    "bm25: expected an object, an array or null, got {other}"
                )));
            }
        };

        Self::from_config(config)
    }

    pub fn with_boost_as_score(mut self, boost_as_score: bool) -> Self {
        self.boost_as_score = boost_as_score;
        self
    }

    pub fn k(&self) -> f32 {
        self.k
    }

    pub fn b(&self) -> f32 {
        self.b
    }

    pub fn boost_as_score(&self) -> bool {
        self.boost_as_score
    }

    /// BM15: no length normalization.
    pub fn is_bm15(&self) -> bool {
        self.b == 0.0
    }
}

fn positional_f32(value: &Value, name: &str) -> Result<f32> {
    value.as_f64().map(|v| v as f32).ok_or_else(|| {
        AlignRankError::invalid_config(format!("bm25: {name} must be a number, got {value}"))
    })
}

impl Scorer for BM25Scorer {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn prepare_field_collector(&self) -> Option<FieldCollector> {
        Some(FieldCollector::new())
    }

    fn prepare_term_collector(&self) -> Option<TermCollector> {
        Some(TermCollector::new())
    }

    fn finalize_stats(&self, field: &FieldStatistics, terms: &[TermStatistics]) -> ScoreConstants {
        let docs = field.documents_with_field as f64;

        let idf: f64 = terms
            .iter()
            .map(|term| {
                let with_term = term.documents_with_term as f64;
                let arg = 1.0 + (docs - with_term + 0.5) / (with_term + 0.5);
                arg.max(f64::EPSILON).ln().max(0.0)
            })
            .sum();

        let (norm_const, norm_length) = if self.is_bm15() {
            (1.0, 0.0)
        } else {
            let k = f64::from(self.k);
            let b = f64::from(self.b);
            let norm_length = match field.average_length() {
                Some(avg) => k * b / avg,
                None => k * b,
            };
            (k - k * b, norm_length)
        };

        let stats = Bm25Stats {
            idf: idf as f32,
            norm_const: norm_const as f32,
            norm_length: norm_length as f32,
        };
        log::debug!("finalized bm25 stats from {field:?} and {} terms: {stats:?}", terms.len());
        ScoreConstants::Bm25(stats)
    }

    fn prepare_scorer<'a>(
        &self,
        segment: &'a dyn SegmentReader,
        field: &str,
        constants: &'a ScoreConstants,
        capabilities: Capabilities,
        boost: f32,
    ) -> Option<ScoreFunction<'a>> {
        let ScoreConstants::Bm25(stats) = constants else {
            log::warn!("bm25 scorer given {constants:?}, field '{field}' is not scored");
            return None;
        };

        if !capabilities.frequency {
            return (self.boost_as_score && boost != 0.0).then_some(ScoreFunction::Constant(boost));
        }

        let norms = if self.is_bm15() {
            None
        } else {
            if !capabilities.document {
                return None;
            }
            let norms = segment.field(field).and_then(|reader| reader.norms());
            if norms.is_none() {
                log::debug!(
                    "no field lengths for '{}' in segment '{}'",
                    field,
                    segment.name()
                );
            }
            norms
        };

        Some(ScoreFunction::Bm25(Bm25Context::new(
            stats,
            self.k,
            boost,
            norms,
            capabilities.filter_boost,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::memory::MemorySegmentBuilder;
    use crate::scoring::TfIdfStats;
    use serde_json::json;

    fn field(documents_with_field: u64, total_term_occurrences: u64) -> FieldStatistics {
        FieldStatistics {
            documents_with_field,
            total_term_occurrences,
        }
    }

    fn term(documents_with_term: u64) -> TermStatistics {
        TermStatistics {
            documents_with_term,
        }
    }

    fn bm25_stats(constants: ScoreConstants) -> Bm25Stats {
        match constants {
            ScoreConstants::Bm25(stats) => stats,
            other => panic!("expected bm25 constants, got {other:?}"),
        }
    }

    #[test]
    fn test_finalize() {
        let scorer = BM25Scorer::default();
        let stats = bm25_stats(scorer.finalize_stats(&field(10, 50), &[term(2)]));

        let expected_idf = (1.0f64 + (10.0 - 2.0 + 0.5) / (2.0 + 0.5)).ln() as f32;
        assert!((stats.idf - expected_idf).abs() < 1e-6);
        assert!((stats.norm_const - 0.3).abs() < 1e-6);
        assert!((stats.norm_length - 0.9 / 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_idf_sums_terms() {
        let scorer = BM25Scorer::default();
        let one = bm25_stats(scorer.finalize_stats(&field(10, 50), &[term(2)]));
        let two = bm25_stats(scorer.finalize_stats(&field(10, 50), &[term(2), term(2)]));
        assert!((two.idf - 2.0 * one.idf).abs() < 1e-5);
    }

    #[test]
    fn test_bm15() {
        let scorer = BM25Scorer::new(1.2, 0.0).unwrap();
        for (docs, total, with_term) in [(0, 0, 0), (10, 50, 3), (1, 0, 1), (u64::MAX, 7, 2)] {
            let stats = bm25_stats(scorer.finalize_stats(&field(docs, total), &[term(with_term)]));
            assert_eq!(stats.norm_const, 1.0);
            assert_eq!(stats.norm_length, 0.0);
        }
    }

    #[test]
    fn test_zero_average_keeps_unnormalized_length() {
        let scorer = BM25Scorer::default();
        let stats = bm25_stats(scorer.finalize_stats(&field(5, 0), &[term(1)]));
        assert!((stats.norm_length - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_inconsistent_counts_never_nan() {
        let scorer = BM25Scorer::default();
        let stats = bm25_stats(scorer.finalize_stats(&field(1, 1), &[term(100)]));
        assert!(stats.idf.is_finite());
        assert!(stats.idf >= 0.0);

        let stats = bm25_stats(scorer.finalize_stats(&field(0, 0), &[]));
        assert_eq!(stats.idf, 0.0);
    }

    #[test]
    fn test_validation() {
        assert!(BM25Scorer::new(-0.1, 0.5).is_err());
        assert!(BM25Scorer::new(f32::NAN, 0.5).is_err());
        assert!(BM25Scorer::new(1.2, 1.5).is_err());
        assert!(BM25Scorer::new(0.0, 1.0).is_ok());
    }

    #[test]
    fn test_from_json() {
        let scorer = BM25Scorer::from_json(&json!({"k": 2.0, "b": 0.5})).unwrap();
        assert_eq!((scorer.k(), scorer.b()), (2.0, 0.5));
        assert!(!scorer.boost_as_score());

        let scorer = BM25Scorer::from_json(&json!([1.5])).unwrap();
        assert_eq!((scorer.k(), scorer.b()), (1.5, BM25Scorer::DEFAULT_B));

        let scorer = BM25Scorer::from_json(&Value::Null).unwrap();
        assert_eq!(scorer, BM25Scorer::default());

        let scorer = BM25Scorer::from_json(&json!({"boost_as_score": true})).unwrap();
        assert!(scorer.boost_as_score());

        for bad in [
            json!({"k": 1.2, "x": 1}),
            json!({"k": "high"}),
            json!([1.0, 0.5, 3.0]),
            json!(["1.0"]),
            json!("bm25"),
            json!({"b": 2.0}),
        ] {
            let err = BM25Scorer::from_json(&bad).unwrap_err();
            assert!(err.is_config_error(), "{bad}: {err}");
        }
    }

    #[test]
    fn test_prepare_without_frequency() {
        let segment = MemorySegmentBuilder::new("s").build();
        let constants = BM25Scorer::default().finalize_stats(&field(1, 1), &[term(1)]);
        let no_freq = Capabilities {
            document: true,
            frequency: false,
            filter_boost: false,
        };

        let scorer = BM25Scorer::default();
        assert!(
            scorer
                .prepare_scorer(&segment, "body", &constants, no_freq, 2.0)
                .is_none()
        );

        let scorer = scorer.with_boost_as_score(true);
        let function = scorer
            .prepare_scorer(&segment, "body", &constants, no_freq, 2.0)
            .unwrap();
        assert!(matches!(function, ScoreFunction::Constant(s) if s == 2.0));
        assert!(
            scorer
                .prepare_scorer(&segment, "body", &constants, no_freq, 0.0)
                .is_none()
        );
    }

    #[test]
    fn test_prepare_requires_document_for_norms() {
        let segment = MemorySegmentBuilder::new("s").build();
        let constants = BM25Scorer::default().finalize_stats(&field(1, 1), &[term(1)]);
        let no_doc = Capabilities {
            document: false,
            frequency: true,
            filter_boost: false,
        };

        assert!(
            BM25Scorer::default()
                .prepare_scorer(&segment, "body", &constants, no_doc, 1.0)
                .is_none()
        );

        let bm15 = BM25Scorer::new(1.2, 0.0).unwrap();
        let constants = bm15.finalize_stats(&field(1, 1), &[term(1)]);
        assert!(
            bm15.prepare_scorer(&segment, "body", &constants, no_doc, 1.0)
                .is_some()
        );
    }

    #[test]
    fn test_prepare_with_mismatched_constants() {
        let segment = MemorySegmentBuilder::new("s").build();
        let constants = ScoreConstants::TfIdf(TfIdfStats { idf: 1.0 });
        assert!(
            BM25Scorer::default()
                .prepare_scorer(&segment, "body", &constants, Capabilities::all(), 1.0)
                .is_none()
        );
    }
}
