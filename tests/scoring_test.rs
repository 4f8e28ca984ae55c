//! Integration tests for statistics collection and BM25 / TF-IDF ranking

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::sync::Arc;

use alignrank::prelude::*;
use alignrank::scoring::ScoreConstants;
use alignrank::stats::{QueryStats, StatsCollector};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde_json::json;
use tempfile::TempDir;

fn segment(name: &str, docs: &[&str]) -> Arc<dyn SegmentReader> {
    let mut builder = MemorySegmentBuilder::new(name);
    for text in docs {
        let doc = builder.add_document();
        builder.add_text(doc, "body", text);
    }
    Arc::new(builder.build())
}

fn corpus() -> Vec<Arc<dyn SegmentReader>> {
    vec![
        segment("s0", &["quick brown fox", "lazy dog", "quick quick fox jumps"]),
        segment("s1", &["brown dog", "fox"]),
        segment("s2", &["the quick brown fox jumps over the lazy dog", "cat"]),
        segment("s3", &["dog dog dog"]),
    ]
}

#[test]
fn test_bm25_matches_formula() -> Result<()> {
    let segments = vec![segment("s0", &["a b", "a", "c"])];
    let searcher = Searcher::new(segments).with_scorer(Arc::new(BM25Scorer::default()));

    let top = searcher.search(&TermQuery::new("body", "a"), 10)?;
    assert_eq!(top.total_hits, 2);

    // 3 documents, 4 tokens, "a" in 2 documents.
    let (k, b) = (1.2f64, 0.75f64);
    let idf = (1.0f64 + (3.0 - 2.0 + 0.5) / (2.0 + 0.5)).ln();
    let avg = 4.0 / 3.0;
    let expected = |len: f64| idf * (k + 1.0) / (k - k * b + k * b / avg * len + 1.0);

    assert_eq!(top.hits[0].doc_id, 1);
    assert!((f64::from(top.hits[0].score) - expected(1.0)).abs() < 1e-4);
    assert_eq!(top.hits[1].doc_id, 0);
    assert!((f64::from(top.hits[1].score) - expected(2.0)).abs() < 1e-4);
    Ok(())
}

#[test]
fn test_rare_terms_rank_higher() -> Result<()> {
    let searcher = Searcher::new(corpus()).with_scorer(Arc::new(BM25Scorer::default()));

    let query = DisjunctionQuery::new()
        .add(TermQuery::new("body", "cat"))
        .add(TermQuery::new("body", "dog"));

    let top = searcher.search(&query, 3)?;
    assert_eq!(top.total_hits, 5);
    // "cat" occurs once in the corpus, "dog" in four documents.
    assert_eq!((top.hits[0].segment_ord, top.hits[0].doc_id), (2, 1));
    Ok(())
}

#[test]
fn test_collection_order_does_not_matter() -> Result<()> {
    let scorer = BM25Scorer::default();
    let terms = ["fox", "dog", "missing"];
    let mut segments = corpus();

    let template = QueryStats::for_scorer(&scorer, terms.len());
    let parallel = template.collect_segments(&segments, "body", &terms)?;

    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..10 {
        segments.shuffle(&mut rng);

        let mut sequential = template.clone();
        for segment in &segments {
            let mut partial = template.clone();
            partial.collect(segment.as_ref(), "body", &terms)?;
            sequential.merge(&partial)?;
        }

        assert_eq!(sequential.field_statistics(), parallel.field_statistics());
        assert_eq!(sequential.term_statistics(), parallel.term_statistics());
        assert_eq!(sequential.finalize(&scorer), parallel.finalize(&scorer));
    }

    let field = parallel.field_statistics();
    assert_eq!(field.documents_with_field, 8);
    assert_eq!(field.total_term_occurrences, 25);
    let docs_with: Vec<u64> = parallel
        .term_statistics()
        .iter()
        .map(|t| t.documents_with_term)
        .collect();
    assert_eq!(docs_with, vec![4, 4, 0]);
    Ok(())
}

#[test]
fn test_remote_shard_statistics() -> Result<()> {
    let scorer = BM25Scorer::default();
    let terms = ["fox", "dog"];
    let all = corpus();
    let template = QueryStats::for_scorer(&scorer, terms.len());

    // Two shards exchange partial statistics through a file.
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("shard1.stats");
    {
        let remote = template.collect_segments(&all[2..], "body", &terms)?;
        let mut writer = BufWriter::new(File::create(&path)?);
        remote.write_to(&mut writer)?;
        writer.flush()?;
    }

    let mut merged = template.collect_segments(&all[..2], "body", &terms)?;
    merged.read_from(&mut BufReader::new(File::open(&path)?))?;

    let whole = template.collect_segments(&all, "body", &terms)?;
    assert_eq!(merged.to_wire(), whole.to_wire());
    assert_eq!(merged.finalize(&scorer), whole.finalize(&scorer));
    Ok(())
}

#[test]
fn test_corrupt_statistics_rejected() {
    let scorer = BM25Scorer::default();
    let template = QueryStats::for_scorer(&scorer, 2);
    let wire = template.collect_segments(&corpus(), "body", &["fox", "dog"]).unwrap().to_wire();

    let mut stats = template.clone();
    assert!(stats.merge_from(&wire[..wire.len() - 1]).is_err());

    let mut trailing = wire.clone();
    trailing.push(0);
    assert!(stats.merge_from(&trailing).is_err());

    // Failed merges leave the state untouched.
    assert_eq!(stats.to_wire(), template.to_wire());
}

#[test]
fn test_bm15_ignores_length() -> Result<()> {
    let segments = vec![segment("s0", &["x", "x y z w v u t s r q"])];
    let searcher =
        Searcher::new(segments).with_scorer(Arc::new(BM25Scorer::new(1.2, 0.0)?));

    let top = searcher.search(&TermQuery::new("body", "x"), 10)?;
    assert_eq!(top.hits.len(), 2);
    assert_eq!(top.hits[0].score, top.hits[1].score);
    Ok(())
}

#[test]
fn test_tfidf_prefers_frequent_terms() -> Result<()> {
    let segments = vec![segment("s0", &["a b b b", "a a b b", "a a a a", "c"])];
    let searcher = Searcher::new(segments).with_scorer(Arc::new(TfIdfScorer::new(false)));

    let top = searcher.search(&TermQuery::new("body", "a"), 10)?;
    let order: Vec<u64> = top.hits.iter().map(|hit| hit.doc_id).collect();
    assert_eq!(order, vec![2, 1, 0]);
    Ok(())
}

#[test]
fn test_registry_builds_scorers() -> Result<()> {
    let registry = ScorerRegistry::default();
    assert_eq!(registry.names(), vec!["bm25", "tfidf"]);

    let scorer = registry.create("BM25", &json!({"k": 2.0, "b": 0.5}))?;
    let segments = corpus();
    let stats = QueryStats::for_scorer(scorer.as_ref(), 1).collect_segments(&segments, "body", &["cat"])?;
    match stats.finalize(scorer.as_ref()) {
        ScoreConstants::Bm25(constants) => {
            assert!((constants.norm_const - 1.0).abs() < 1e-6);
            assert!(constants.idf > 0.0);
        }
        other => panic!("unexpected constants {other:?}"),
    }

    assert_eq!(registry.create("tfidf", &json!([true]))?.name(), "tfidf");
    assert!(matches!(
        registry.create("bm25", &json!("1.2")),
        Err(AlignRankError::InvalidConfig(_))
    ));
    assert!(registry.create("lm", &json!(null)).is_err());
    Ok(())
}
