mod common;

use std::sync::Arc;

use nyaya_ai::error::AgentError;
use nyaya_ai::index::VectorIndex;
use nyaya_ai::retrieve::retrieve;
use nyaya_core::domain::{Language, Passage, RegionFilter, RegionMetadata};
use pretty_assertions::assert_eq;

use common::{scored, CountABEmbedder, FixedIndex};

fn doc(id: &str, content: &str, taluk: &str) -> Passage {
    Passage {
        id: id.to_string(),
        content: content.to_string(),
        source: format!("{id}.txt"),
        language: Language::English,
        region: RegionMetadata {
            taluk: taluk.to_string(),
            pincode: "unknown".to_string(),
        },
    }
}

fn built_index(dir: &tempfile::TempDir) -> VectorIndex {
    let index = VectorIndex::open(dir.path().join("index"), Arc::new(CountABEmbedder), "count-ab")
        .expect("open");
    index
        .ingest(&[
            doc("all_a", "aaaa", "Mandya"),
            doc("mixed", "ab", "Mandya"),
            doc("all_b", "bbbb", "Hunsur"),
            doc("mostly_a", "aaab", "Hunsur"),
        ])
        .expect("ingest");
    index
}

#[test]
fn returns_at_most_top_k_best_first() {
    let dir = tempfile::tempdir().expect("tempdir");
    let index = built_index(&dir);

    let result = retrieve(&index, "a", 2, None).expect("retrieve");
    let ids: Vec<&str> = result.hits().iter().map(|h| h.passage.id.as_str()).collect();
    assert_eq!(ids, vec!["all_a", "mostly_a"]);
    assert!((result.hits()[0].score - 1.0).abs() < 1e-6);
    assert!(result.scores().iter().all(|s| (0.0..=1.0).contains(s)));
}

#[test]
fn region_filter_restricts_to_tagged_passages() {
    let dir = tempfile::tempdir().expect("tempdir");
    let index = built_index(&dir);
    let region = RegionFilter {
        taluk: "Hunsur".to_string(),
    };

    let result = retrieve(&index, "a", 3, Some(&region)).expect("retrieve");
    let ids: Vec<&str> = result.hits().iter().map(|h| h.passage.id.as_str()).collect();
    assert_eq!(ids, vec!["mostly_a", "all_b"]);
    assert!(result.hits().iter().all(|h| h.passage.region.taluk == "Hunsur"));
}

#[test]
fn unknown_region_yields_empty_result_without_widening() {
    let index = FixedIndex::new(vec![scored("p1", "a.txt", 0.9)]);
    let region = RegionFilter {
        taluk: "Chamarajanagar".to_string(),
    };

    let result = retrieve(&index, "land records", 3, Some(&region)).expect("retrieve");
    assert!(result.is_empty());
    assert_eq!(index.searches(), 0);
}

#[test]
fn unbuilt_index_is_unavailable_not_empty() {
    let dir = tempfile::tempdir().expect("tempdir");
    let index =
        VectorIndex::open(dir.path().join("missing"), Arc::new(CountABEmbedder), "count-ab")
            .expect("open");

    let err = retrieve(&index, "a", 3, None).expect_err("must fail");
    assert!(matches!(err, AgentError::IndexUnavailable(_)));
    assert_eq!(err.code(), "INDEX_UNAVAILABLE");

    let region = RegionFilter {
        taluk: "Mysuru".to_string(),
    };
    let err = retrieve(&index, "a", 3, Some(&region)).expect_err("must fail");
    assert!(matches!(err, AgentError::IndexUnavailable(_)));
}

#[test]
fn failing_index_is_reported_as_unavailable() {
    let index = FixedIndex::unavailable();
    let err = retrieve(&index, "q", 3, None).expect_err("must fail");
    assert_eq!(err.code(), "INDEX_UNAVAILABLE");
}

#[test]
fn equal_scores_keep_index_order() {
    let index = FixedIndex::new(vec![
        scored("first", "a.txt", 0.7),
        scored("second", "b.txt", 0.7),
        scored("best", "c.txt", 0.9),
    ]);

    let result = retrieve(&index, "q", 3, None).expect("retrieve");
    let ids: Vec<&str> = result.hits().iter().map(|h| h.passage.id.as_str()).collect();
    assert_eq!(ids, vec!["best", "first", "second"]);
}

#[test]
fn zero_top_k_is_rejected() {
    let index = FixedIndex::new(Vec::new());
    let err = retrieve(&index, "q", 0, None).expect_err("top_k=0");
    assert_eq!(err.code(), "QUERY_INVALID");
}
