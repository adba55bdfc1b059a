//! Corpus-wide term statistics backing the lexical scorer.

use rustc_hash::FxHashMap;

use super::tokenizer::tokenize;
use crate::types::ReferencePassage;

/// Term statistics computed once per reference corpus.
///
/// All vectors are index-aligned with the passage list they were built from.
/// An empty corpus yields empty tables and a zero mean length.
#[derive(Clone, Debug, Default)]
pub struct CorpusStats {
    /// Per-document term frequency maps, in corpus order.
    pub term_counts: Vec<FxHashMap<String, usize>>,
    /// Per-document token totals.
    pub doc_lengths: Vec<usize>,
    /// Number of documents containing each term at least once.
    pub doc_freqs: FxHashMap<String, usize>,
    /// Arithmetic mean document length.
    pub avg_doc_length: f64,
}

impl CorpusStats {
    /// Builds the statistics tables for a passage corpus.
    pub fn build(passages: &[ReferencePassage]) -> Self {
        let mut term_counts = Vec::with_capacity(passages.len());
        let mut doc_lengths = Vec::with_capacity(passages.len());
        let mut doc_freqs: FxHashMap<String, usize> = FxHashMap::default();

        for passage in passages {
            let counts = token_counts(&passage.text);
            doc_lengths.push(counts.values().sum());
            for term in counts.keys() {
                *doc_freqs.entry(term.clone()).or_insert(0) += 1;
            }
            term_counts.push(counts);
        }

        let avg_doc_length = if doc_lengths.is_empty() {
            0.0
        } else {
            doc_lengths.iter().sum::<usize>() as f64 / doc_lengths.len() as f64
        };

        Self {
            term_counts,
            doc_lengths,
            doc_freqs,
            avg_doc_length,
        }
    }

    /// Number of documents in the corpus.
    pub fn len(&self) -> usize {
        self.doc_lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_lengths.is_empty()
    }
}

/// Token-count map for one free-standing text (query or document).
pub fn token_counts(text: &str) -> FxHashMap<String, usize> {
    let mut counts: FxHashMap<String, usize> = FxHashMap::default();
    for token in tokenize(text) {
        *counts.entry(token).or_insert(0) += 1;
    }
    counts
}
