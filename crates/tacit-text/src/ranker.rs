//! TF‑IDF scoring and top‑k selection over a chunk slice.
//!
//! Statistics are recomputed from the given chunks on every call; nothing is
//! cached between queries.
//!
//! - `df(t)`: number of chunks whose de-duplicated term set contains `t`
//! - `tf(t)`: occurrences of `t` in the chunk / `max(len(chunk terms), 1)`
//! - `idf(t)`: `ln(N / df(t))`, or `0` when `df(t) == 0`
//! - score: sum of `tf * idf` over the query terms, repeats included

use std::collections::{HashMap, HashSet};

use tacit_core::types::DocumentChunk;
use tracing::debug;

use crate::tokenizer::tokenize;

/// A chunk position in the scored slice together with its relevance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredChunk {
    pub index: usize,
    pub score: f64,
}

/// Scores every chunk against `query`, in chunk order.
pub fn score_chunks(query: &str, chunks: &[DocumentChunk]) -> Vec<f64> {
    if chunks.is_empty() {
        return Vec::new();
    }
    let query_terms = tokenize(query);
    let chunk_terms: Vec<Vec<String>> = chunks.iter().map(|c| tokenize(&c.content)).collect();

    let mut doc_frequency: HashMap<&str, usize> = HashMap::new();
    for terms in &chunk_terms {
        let unique: HashSet<&str> = terms.iter().map(String::as_str).collect();
        for term in unique {
            *doc_frequency.entry(term).or_insert(0) += 1;
        }
    }

    let total = chunks.len() as f64;
    let idf = |term: &str| match doc_frequency.get(term) {
        Some(&df) if df > 0 => (total / df as f64).ln(),
        _ => 0.0,
    };

    chunk_terms
        .iter()
        .map(|terms| {
            let mut term_counts: HashMap<&str, usize> = HashMap::new();
            for term in terms {
                *term_counts.entry(term.as_str()).or_insert(0) += 1;
            }
            let length = terms.len().max(1) as f64;
            query_terms
                .iter()
                .map(|q| {
                    let tf = term_counts.get(q.as_str()).copied().unwrap_or(0) as f64 / length;
                    tf * idf(q)
                })
                .sum::<f64>()
        })
        .collect()
}

/// Returns the `k` best chunks with a positive score, best first.
///
/// Ties keep insertion order; zero scores are dropped before truncation.
pub fn rank(query: &str, chunks: &[DocumentChunk], k: usize) -> Vec<ScoredChunk> {
    let mut scored: Vec<ScoredChunk> = score_chunks(query, chunks)
        .into_iter()
        .enumerate()
        .map(|(index, score)| ScoredChunk { index, score })
        .collect();
    // `sort_by` is stable, which keeps equal scores in insertion order.
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scored.retain(|s| s.score > 0.0);
    scored.truncate(k);
    debug!(chunks = chunks.len(), hits = scored.len(), k, "ranked query");
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<DocumentChunk> {
        vec![
            DocumentChunk::new("apple banana apple", 1, "A"),
            DocumentChunk::new("banana cherry", 1, "B"),
            DocumentChunk::new("apple cherry cherry", 1, "C"),
        ]
    }

    #[test]
    fn empty_chunks_yield_no_scores() {
        assert!(score_chunks("apple", &[]).is_empty());
        assert!(rank("apple", &[], 3).is_empty());
    }

    #[test]
    fn scores_follow_tf_idf_formula() {
        let scores = score_chunks("apple", &corpus());
        let idf = (3.0f64 / 2.0).ln();
        assert!((scores[0] - (2.0 / 3.0) * idf).abs() < 1e-12);
        assert_eq!(scores[1], 0.0);
        assert!((scores[2] - (1.0 / 3.0) * idf).abs() < 1e-12);
    }

    #[test]
    fn apple_query_ranks_a_then_c_and_excludes_b() {
        let ranked = rank("apple", &corpus(), 2);
        let order: Vec<usize> = ranked.iter().map(|s| s.index).collect();
        assert_eq!(order, vec![0, 2]);
    }

    #[test]
    fn zero_scores_are_dropped_before_truncation() {
        let ranked = rank("apple", &corpus(), 10);
        assert_eq!(ranked.len(), 2);
    }

    #[test]
    fn term_in_every_chunk_scores_zero() {
        let chunks = vec![
            DocumentChunk::new("shared alpha", 1, "A"),
            DocumentChunk::new("shared beta", 1, "B"),
        ];
        assert!(rank("shared", &chunks, 3).is_empty());
    }

    #[test]
    fn no_overlap_returns_nothing() {
        assert!(rank("durian", &corpus(), 3).is_empty());
        assert!(rank("", &corpus(), 3).is_empty());
    }

    #[test]
    fn k_truncates_in_descending_order() {
        let chunks = vec![
            DocumentChunk::new("loan loan loan other", 1, "A"),
            DocumentChunk::new("loan other other other", 1, "B"),
            DocumentChunk::new("loan loan other other", 1, "C"),
            DocumentChunk::new("nothing relevant here", 1, "D"),
        ];
        let ranked = rank("loan", &chunks, 2);
        assert_eq!(ranked.iter().map(|s| s.index).collect::<Vec<_>>(), vec![0, 2]);
        assert!(ranked[0].score > ranked[1].score);
    }

    #[test]
    fn ties_keep_insertion_order() {
        let chunks = vec![
            DocumentChunk::new("cherry first", 1, "A"),
            DocumentChunk::new("unrelated words", 1, "B"),
            DocumentChunk::new("cherry second", 1, "C"),
        ];
        let ranked = rank("cherry", &chunks, 3);
        assert_eq!(ranked.iter().map(|s| s.index).collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(ranked[0].score, ranked[1].score);
    }

    #[test]
    fn repeated_query_terms_are_counted_per_occurrence() {
        let single = score_chunks("apple", &corpus());
        let doubled = score_chunks("apple apple", &corpus());
        for (s, d) in single.iter().zip(&doubled) {
            assert!((d - 2.0 * s).abs() < 1e-12);
        }
    }

    #[test]
    fn chunk_without_terms_does_not_divide_by_zero() {
        let chunks = vec![DocumentChunk::new("!! ??", 1, "A"), DocumentChunk::new("apple pie", 1, "B")];
        let scores = score_chunks("apple", &chunks);
        assert_eq!(scores[0], 0.0);
        assert!(scores[1] > 0.0);
    }
}
