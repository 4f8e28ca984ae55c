//! Per-document score functions.

use crate::index::reader::NormReader;
use crate::query::matcher::DocAttributes;
use crate::scoring::{Bm25Stats, TfIdfStats};
use crate::util::sqrt::sqrt_freq;

/// A score function bound to one segment and one set of constants.
///
/// Score functions are stateless between documents: evaluating the same
/// document twice yields the same score.
#[derive(Debug, Clone, Copy)]
pub enum ScoreFunction<'a> {
    /// The same score for every document.
    Constant(f32),
    TfIdf(TfIdfContext<'a>),
    Bm25(Bm25Context<'a>),
}

impl ScoreFunction<'_> {
    /// Score the document `doc` is currently positioned on.
    pub fn score(&self, doc: &dyn DocAttributes) -> f32 {
        match self {
            ScoreFunction::Constant(score) => *score,
            ScoreFunction::TfIdf(ctx) => ctx.score(doc),
            ScoreFunction::Bm25(ctx) => ctx.score(doc),
        }
    }

    /// Write the score of the current document into `out`.
    pub fn evaluate(&self, doc: &dyn DocAttributes, out: &mut f32) {
        *out = self.score(doc);
    }
}

fn filter_boost(enabled: bool, doc: &dyn DocAttributes) -> f32 {
    if enabled { doc.filter_boost() } else { 1.0 }
}

/// TF-IDF scoring state.
#[derive(Debug, Clone, Copy)]
pub struct TfIdfContext<'a> {
    stats: &'a TfIdfStats,
    /// `boost * idf`
    idf_boost: f32,
    norms: Option<&'a dyn NormReader>,
    use_filter_boost: bool,
}

impl<'a> TfIdfContext<'a> {
    pub fn new(
        stats: &'a TfIdfStats,
        boost: f32,
        norms: Option<&'a dyn NormReader>,
        use_filter_boost: bool,
    ) -> Self {
        TfIdfContext {
            stats,
            idf_boost: boost * stats.idf,
            norms,
            use_filter_boost,
        }
    }

    pub fn stats(&self) -> &'a TfIdfStats {
        self.stats
    }

    fn score(&self, doc: &dyn DocAttributes) -> f32 {
        let weight = self.idf_boost * filter_boost(self.use_filter_boost, doc);
        let score = weight * sqrt_freq(doc.frequency());

        match self.norms {
            Some(norms) => score * length_norm(norms.field_length(doc.doc_id())),
            None => score,
        }
    }
}

/// `1 / sqrt(length)`; `1` for an empty field.
fn length_norm(length: u32) -> f32 {
    if length == 0 {
        1.0
    } else {
        1.0 / sqrt_freq(u64::from(length))
    }
}

/// BM25 scoring state.
#[derive(Debug, Clone, Copy)]
pub struct Bm25Context<'a> {
    stats: &'a Bm25Stats,
    /// `boost * (k + 1) * idf`
    numerator: f32,
    norms: Option<&'a dyn NormReader>,
    use_filter_boost: bool,
}

impl<'a> Bm25Context<'a> {
    pub fn new(
        stats: &'a Bm25Stats,
        k: f32,
        boost: f32,
        norms: Option<&'a dyn NormReader>,
        use_filter_boost: bool,
    ) -> Self {
        Bm25Context {
            stats,
            numerator: boost * (k + 1.0) * stats.idf,
            norms,
            use_filter_boost,
        }
    }

    pub fn stats(&self) -> &'a Bm25Stats {
        self.stats
    }

    fn score(&self, doc: &dyn DocAttributes) -> f32 {
        let numerator = self.numerator * filter_boost(self.use_filter_boost, doc);
        let tf = sqrt_freq(doc.frequency());

        let length = self
            .norms
            .map(|norms| norms.field_length(doc.doc_id()) as f32)
            .unwrap_or(0.0);
        let denominator = self.stats.norm_const + self.stats.norm_length * length + tf;

        if denominator > 0.0 {
            numerator * tf / denominator
        } else {
            0.0
        }
    }
}
