//! Hybrid lexical+semantic passage retrieval.
//!
//! ```text
//! query ──► tokenizer ──► stats::token_counts ──┐
//!                                               ▼
//! corpus ──► stats::CorpusStats ──► bm25 ──► max-normalize ──┐
//!                                                            ├─► fuse 0.4/0.6 ─► sort ─► top-K
//! corpus ──► semantic::resolve_passage_embeddings ──► cosine ┘
//! ```
//!
//! BM25 scores are normalized by their maximum; cosine similarity is rescaled
//! from `[-1, 1]` to `[0, 1]`. The fusion weights and BM25 constants are fixed
//! design constants, not configuration.

pub mod bm25;
pub mod semantic;
pub mod stats;
pub mod tokenizer;

use std::sync::Arc;

use tracing::debug;

use crate::providers::EmbeddingProvider;
use crate::types::{AuditError, ReferencePassage};
use bm25::bm25_score;
use semantic::{cosine_similarity, embed_query, resolve_passage_embeddings};
use stats::{CorpusStats, token_counts};

/// Weight of the semantic component in the fused score.
pub const SEMANTIC_WEIGHT: f64 = 0.6;
/// Weight of the lexical component in the fused score.
pub const LEXICAL_WEIGHT: f64 = 0.4;

/// One passage with its normalized per-signal and fused relevance scores.
///
/// Computed fresh per query and discarded after selection.
#[derive(Clone, Debug)]
pub struct ScoredCandidate {
    pub passage: ReferencePassage,
    /// BM25 score divided by the corpus maximum (0 when the maximum is ≤ 0).
    pub lexical_score: f64,
    /// Cosine similarity rescaled to `[0, 1]`.
    pub semantic_score: f64,
    /// `SEMANTIC_WEIGHT * semantic + LEXICAL_WEIGHT * lexical`.
    pub fused_score: f64,
}

/// Ranks reference passages against a query by fusing BM25 with cosine
/// similarity over collaborator-provided embeddings.
pub struct PassageRanker {
    embedder: Arc<dyn EmbeddingProvider>,
}

impl PassageRanker {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { embedder }
    }

    /// Returns the `k` passages judged most relevant to `query`, best first.
    ///
    /// Fast paths, in order: `full_corpus` returns the entire corpus without
    /// scoring; an empty or whitespace-only query returns the first `k`
    /// passages in corpus order; an empty corpus returns nothing. Otherwise
    /// every passage is scored and the top `k` are returned (all of them when
    /// the corpus is smaller than `k`).
    pub async fn select_top(
        &self,
        query: &str,
        passages: &[ReferencePassage],
        k: usize,
        full_corpus: bool,
    ) -> Result<Vec<ReferencePassage>, AuditError> {
        if full_corpus {
            return Ok(passages.to_vec());
        }
        if query.trim().is_empty() {
            return Ok(passages.iter().take(k).cloned().collect());
        }
        if passages.is_empty() {
            return Ok(Vec::new());
        }

        let ranked = self.rank(query, passages).await?;
        Ok(ranked
            .into_iter()
            .take(k)
            .map(|candidate| candidate.passage)
            .collect())
    }

    /// Scores every passage against `query` and returns candidates sorted
    /// descending by fused score. The sort is stable, so ties keep their
    /// corpus order.
    pub async fn rank(
        &self,
        query: &str,
        passages: &[ReferencePassage],
    ) -> Result<Vec<ScoredCandidate>, AuditError> {
        let stats = CorpusStats::build(passages);
        let query_counts = token_counts(query);

        let query_embedding = embed_query(self.embedder.as_ref(), query).await?;
        let passage_embeddings =
            resolve_passage_embeddings(self.embedder.as_ref(), passages).await?;

        let lexical: Vec<f64> = (0..passages.len())
            .map(|index| bm25_score(&query_counts, &stats, index))
            .collect();
        let max_lexical = lexical.iter().fold(0.0_f64, |acc, score| acc.max(*score));

        let mut candidates: Vec<ScoredCandidate> = passages
            .iter()
            .enumerate()
            .map(|(index, passage)| {
                let lexical_score = if max_lexical > 0.0 {
                    lexical[index] / max_lexical
                } else {
                    0.0
                };
                let cosine = cosine_similarity(&query_embedding, &passage_embeddings[index]);
                let semantic_score = (cosine + 1.0) / 2.0;
                ScoredCandidate {
                    passage: passage.clone(),
                    lexical_score,
                    semantic_score,
                    fused_score: SEMANTIC_WEIGHT * semantic_score + LEXICAL_WEIGHT * lexical_score,
                }
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.fused_score
                .partial_cmp(&a.fused_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        debug!(
            corpus = passages.len(),
            max_lexical, "ranked passages against query"
        );
        Ok(candidates)
    }
}
