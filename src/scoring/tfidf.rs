//! TF-IDF.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AlignRankError, Result};
use crate::index::reader::SegmentReader;
use crate::query::matcher::Capabilities;
use crate::scoring::function::{ScoreFunction, TfIdfContext};
use crate::scoring::{ScoreConstants, Scorer, TfIdfStats};
use crate::stats::{FieldCollector, FieldStatistics, TermCollector, TermStatistics};

/// Parameters of [`TfIdfScorer`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TfIdfConfig {
    /// Multiply scores by `1 / sqrt(field_length)`.
    pub with_norms: bool,
    /// Score frequency-less documents with the query boost.
    pub boost_as_score: bool,
}

/// TF-IDF scorer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TfIdfScorer {
    with_norms: bool,
    boost_as_score: bool,
}

impl TfIdfScorer {
    pub const NAME: &'static str = "tfidf";

    pub fn new(with_norms: bool) -> Self {
        TfIdfScorer {
            with_norms,
            boost_as_score: false,
        }
    }

    pub fn from_config(config: TfIdfConfig) -> Self {
        TfIdfScorer {
            with_norms: config.with_norms,
            boost_as_score: config.boost_as_score,
        }
    }

    /// Build from JSON arguments: an object, a positional `[with_norms]`
    /// array, or `null` for the defaults.
    pub fn from_json(args: &Value) -> Result<Self> {
        let config = match args {
            Value::Null => TfIdfConfig::default(),
            Value::Object(_) => serde_json::from_value(args.clone())
                .map_err(|e| AlignRankError::invalid_config(format!("tfidf: {e}")))?,
            Value::Array(items) => match items.as_slice() {
                [] => TfIdfConfig::default(),
                [Value::Bool(with_norms)] => TfIdfConfig {
                    with_norms: *with_norms,
                    ..TfIdfConfig::default()
                },
                _ => {
                    return Err(AlignRankError::invalid_config(format!(
                        "tfidf: expected [with_norms: bool], got {args}"
                    )));
                }
            },
            other => {
                return Err(AlignRankError::invalid_config(format!(
                    "tfidf: expected an object, an array or null, got {other}"
                )));
            }
        };

        Ok(Self::from_config(config))
    }

    pub fn with_boost_as_score(mut self, boost_as_score: bool) -> Self {
        self.boost_as_score = boost_as_score;
        self
    }

    pub fn with_norms(&self) -> bool {
        self.with_norms
    }

    pub fn boost_as_score(&self) -> bool {
        self.boost_as_score
    }
}

impl Scorer for TfIdfScorer {
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
                let arg = (docs + 1.0) / (term.documents_with_term as f64 + 1.0);
                (arg.max(f64::EPSILON).ln() + 1.0).max(0.0)
            })
            .sum();

        let stats = TfIdfStats { idf: idf as f32 };
        log::debug!("finalized tfidf stats from {field:?} and {} terms: {stats:?}", terms.len());
        ScoreConstants::TfIdf(stats)
    }

    fn prepare_scorer<'a>(
        &self,
        segment: &'a dyn SegmentReader,
        field: &str,
        constants: &'a ScoreConstants,
        capabilities: Capabilities,
        boost: f32,
    ) -> Option<ScoreFunction<'a>> {
        let ScoreConstants::TfIdf(stats) = constants else {
            log::warn!("tfidf scorer given {constants:?}, field '{field}' is not scored");
            return None;
        };

        if !capabilities.frequency {
            return (self.boost_as_score && boost != 0.0).then_some(ScoreFunction::Constant(boost));
        }

        let norms = if self.with_norms {
            if !capabilities.document {
                return None;
            }
            segment.field(field).and_then(|reader| reader.norms())
        } else {
            None
        };

        Some(ScoreFunction::TfIdf(TfIdfContext::new(
            stats,
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
    use serde_json::json;

    fn idf(constants: ScoreConstants) -> f32 {
        match constants {
            ScoreConstants::TfIdf(stats) => stats.idf,
            other => panic!("expected tfidf constants, got {other:?}"),
        }
    }

    #[test]
    fn test_finalize() {
        let field = FieldStatistics {
            documents_with_field: 9,
            total_term_occurrences: 40,
        };
        let terms = [TermStatistics {
            documents_with_term: 4,
        }];

        let expected = (10.0f64 / 5.0).ln() as f32 + 1.0;
        assert!((idf(TfIdfScorer::default().finalize_stats(&field, &terms)) - expected).abs() < 1e-6);

        let doubled = [terms[0], terms[0]];
        assert!(
            (idf(TfIdfScorer::default().finalize_stats(&field, &doubled)) - 2.0 * expected).abs()
                < 1e-5
        );
    }

    #[test]
    fn test_finalize_degenerate_counts() {
        let scorer = TfIdfScorer::default();
        let empty = idf(scorer.finalize_stats(&FieldStatistics::default(), &[TermStatistics::default()]));
        assert_eq!(empty, 1.0);

        let inconsistent = idf(scorer.finalize_stats(
            &FieldStatistics::default(),
            &[TermStatistics {
                documents_with_term: 1_000_000,
            }],
        ));
        assert!(inconsistent.is_finite());
        assert!(inconsistent >= 0.0);
    }

    #[test]
    fn test_from_json() {
        assert!(TfIdfScorer::from_json(&json!([true])).unwrap().with_norms());
        assert!(!TfIdfScorer::from_json(&json!([])).unwrap().with_norms());
        assert!(!TfIdfScorer::from_json(&Value::Null).unwrap().with_norms());

        let scorer = TfIdfScorer::from_json(&json!({"with_norms": true, "boost_as_score": true}))
            .unwrap();
        assert!(scorer.with_norms());
        assert!(scorer.boost_as_score());

        for bad in [
            json!({"norms": true}),
            json!({"with_norms": 1}),
            json!([true, false]),
            json!(["yes"]),
            json!(3),
        ] {
            assert!(TfIdfScorer::from_json(&bad).unwrap_err().is_config_error(), "{bad}");
        }
    }

    #[test]
    fn test_prepare_capabilities() {
        let mut builder = MemorySegmentBuilder::new("s");
        let doc = builder.add_document();
        builder.add_text(doc, "body", "a b");
        let segment = builder.build();
        let constants = ScoreConstants::TfIdf(TfIdfStats { idf: 1.0 });

        let no_doc = Capabilities {
            document: false,
            frequency: true,
            filter_boost: false,
        };
        assert!(
            TfIdfScorer::new(true)
                .prepare_scorer(&segment, "body", &constants, no_doc, 1.0)
                .is_none()
        );
        assert!(
            TfIdfScorer::new(false)
                .prepare_scorer(&segment, "body", &constants, no_doc, 1.0)
                .is_some()
        );

        let no_freq = Capabilities {
            document: true,
            frequency: false,
            filter_boost: false,
        };
        assert!(
            TfIdfScorer::new(false)
                .prepare_scorer(&segment, "body", &constants, no_freq, 1.0)
                .is_none()
        );
        let constant = TfIdfScorer::new(false)
            .with_boost_as_score(true)
            .prepare_scorer(&segment, "body", &constants, no_freq, 3.0)
            .unwrap();
        assert!(matches!(constant, ScoreFunction::Constant(s) if s == 3.0));
    }
}
