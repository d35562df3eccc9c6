// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Exact nearest-neighbour search over a built VectorIndex

use ocr_chat_node::document::SentencePayload;
use ocr_chat_node::rag::{IndexEntry, IndexError, VectorIndex};

fn unit(values: &[f32]) -> Vec<f32> {
    let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    values.iter().map(|v| v / norm).collect()
}

fn entry(id: &str, values: &[f32]) -> IndexEntry {
    IndexEntry::new(
        id,
        unit(values),
        SentencePayload {
            title: format!("sentence {}", id),
            url: id.to_string(),
        },
    )
}

fn sample_index() -> VectorIndex {
    VectorIndex::build(vec![
        entry("a", &[1.0, 0.0, 0.0]),
        entry("b", &[0.8, 0.6, 0.0]),
        entry("c", &[0.0, 1.0, 0.0]),
        entry("d", &[0.0, 0.0, 1.0]),
    ])
    .unwrap()
}

#[test]
fn test_search_sorted_by_score_descending() {
    let index = sample_index();
    let results = index.search(&unit(&[1.0, 0.2, 0.0]), 4).unwrap();

    let ids: Vec<&str> = results.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c", "d"]);
    for pair in results.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[test]
fn test_search_returns_min_of_k_and_len() {
    let index = sample_index();
    assert_eq!(index.search(&unit(&[1.0, 0.0, 0.0]), 2).unwrap().len(), 2);
    assert_eq!(index.search(&unit(&[1.0, 0.0, 0.0]), 50).unwrap().len(), 4);
    assert!(index.search(&unit(&[1.0, 0.0, 0.0]), 0).unwrap().is_empty());
}

#[test]
fn test_exact_match_scores_one() {
    let index = sample_index();
    let results = index.search(&unit(&[0.0, 0.0, 1.0]), 1).unwrap();
    assert_eq!(results[0].id, "d");
    assert!((results[0].score - 1.0).abs() < 1e-5);
    assert_eq!(results[0].payload.title, "sentence d");
}

#[test]
fn test_ties_keep_insertion_order() {
    let index = VectorIndex::build(vec![
        entry("first", &[0.0, 1.0]),
        entry("second", &[0.0, 1.0]),
        entry("third", &[1.0, 0.0]),
    ])
    .unwrap();

    let results = index.search(&unit(&[0.0, 1.0]), 3).unwrap();
    assert_eq!(results[0].id, "first");
    assert_eq!(results[1].id, "second");
    assert_eq!(results[0].score, results[1].score);
}

#[test]
fn test_query_dimension_mismatch() {
    let index = sample_index();
    assert_eq!(
        index.search(&[1.0, 0.0], 1),
        Err(IndexError::DimensionMismatch {
            expected: 3,
            actual: 2
        })
    );
}

#[test]
fn test_empty_index_accepts_any_query() {
    let index = VectorIndex::build(Vec::new()).unwrap();
    assert!(index.is_empty());
    assert_eq!(index.dimension(), None);
    assert!(index.search(&[1.0, 0.0, 0.0, 0.0], 5).unwrap().is_empty());
}

#[test]
fn test_build_rejects_mixed_dimensions() {
    let result = VectorIndex::build(vec![entry("a", &[1.0, 0.0]), entry("b", &[1.0, 0.0, 0.0])]);
    assert!(matches!(result, Err(IndexError::DimensionMismatch { .. })));
}

#[test]
fn test_build_rejects_duplicate_ids() {
    let result = VectorIndex::build(vec![entry("a", &[1.0, 0.0]), entry("a", &[0.0, 1.0])]);
    assert_eq!(result.unwrap_err(), IndexError::DuplicateId("a".to_string()));
}

#[test]
fn test_build_rejects_non_finite_values() {
    let bad = IndexEntry::new(
        "nan",
        vec![f32::NAN, 0.0],
        SentencePayload {
            title: "broken".to_string(),
            url: "nan".to_string(),
        },
    );
    assert!(matches!(
        VectorIndex::build(vec![bad]),
        Err(IndexError::InvalidVector { .. })
    ));
}
