//! Relevance filtering and context assembly.
//!
//! Low-similarity matches are noise: handed to the model they invite it to invent
//! links between unrelated entries and the question. The threshold trades recall
//! for precision and is configured via `[retrieval] similarity_threshold`.

use crate::store::SearchResult;

/// Keep results scoring at least `threshold`, in their original order.
///
/// The bound is inclusive. NaN scores never pass.
pub fn filter_relevant(results: Vec<SearchResult>, threshold: f32) -> Vec<SearchResult> {
    results
        .into_iter()
        .filter(|r| r.score >= threshold)
        .collect()
}

/// Join the texts of `results` with `separator`, preserving order.
pub fn join_context(results: &[SearchResult], separator: &str) -> String {
    results
        .iter()
        .map(|r| r.text.as_str())
        .collect::<Vec<_>>()
        .join(separator)
}
