//! BM25 lexical relevance scoring.

use rustc_hash::FxHashMap;

use super::stats::CorpusStats;

/// Term-frequency saturation constant.
pub const BM25_K1: f64 = 1.5;
/// Document-length normalization constant.
pub const BM25_B: f64 = 0.75;

/// Scores document `doc_index` of `stats` against a query term-count map.
///
/// Terms absent from either the query or the corpus contribute zero.
/// Degenerate inputs (empty document, empty corpus, zero mean length, or an
/// out-of-range index) score `0.0` so ranking stays total.
pub fn bm25_score(
    query_counts: &FxHashMap<String, usize>,
    stats: &CorpusStats,
    doc_index: usize,
) -> f64 {
    let total_docs = stats.len();
    let (Some(&doc_len), Some(doc_counts)) = (
        stats.doc_lengths.get(doc_index),
        stats.term_counts.get(doc_index),
    ) else {
        return 0.0;
    };
    if doc_len == 0 || stats.avg_doc_length == 0.0 || total_docs == 0 {
        return 0.0;
    }

    let n = total_docs as f64;
    let mut score = 0.0;
    for term in query_counts.keys() {
        let tf = doc_counts.get(term).copied().unwrap_or(0);
        if tf == 0 {
            continue;
        }
        let df = stats.doc_freqs.get(term).copied().unwrap_or(0);
        if df == 0 {
            continue;
        }
        let tf = tf as f64;
        let df = df as f64;
        let idf = (1.0 + (n - df + 0.5) / (df + 0.5)).ln();
        let denom =
            tf + BM25_K1 * (1.0 - BM25_B + BM25_B * doc_len as f64 / stats.avg_doc_length);
        score += idf * (tf * (BM25_K1 + 1.0) / denom);
    }
    score
}
