//! Vector-similarity scoring and passage embedding resolution.

use crate::providers::EmbeddingProvider;
use crate::types::{AuditError, ReferencePassage};

/// Maximum number of texts sent to the embedding collaborator per call.
pub const EMBED_BATCH_SIZE: usize = 64;

/// Cosine similarity of two vectors, accumulated in `f64`.
///
/// Empty input, mismatched lengths, or a zero norm scores `0.0`; degenerate
/// vectors get the neutral score rather than an error.
pub fn cosine_similarity(query: &[f32], doc: &[f32]) -> f64 {
    if query.is_empty() || doc.is_empty() || query.len() != doc.len() {
        return 0.0;
    }
    let mut dot = 0.0_f64;
    let mut query_norm_sq = 0.0_f64;
    let mut doc_norm_sq = 0.0_f64;
    for (q, d) in query.iter().zip(doc) {
        let q = f64::from(*q);
        let d = f64::from(*d);
        dot += q * d;
        query_norm_sq += q * q;
        doc_norm_sq += d * d;
    }
    if query_norm_sq == 0.0 || doc_norm_sq == 0.0 {
        return 0.0;
    }
    dot / (query_norm_sq.sqrt() * doc_norm_sq.sqrt())
}

/// Embeds the query text. Queries are transient and never cached.
pub async fn embed_query(
    provider: &dyn EmbeddingProvider,
    query: &str,
) -> Result<Vec<f32>, AuditError> {
    let mut vectors = provider.embed_batch(&[query.to_string()]).await?;
    if vectors.len() != 1 {
        return Err(AuditError::EmbeddingCountMismatch {
            requested: 1,
            received: vectors.len(),
        });
    }
    Ok(vectors.remove(0))
}

/// Resolves one embedding per passage, index-aligned with `passages`.
///
/// Cached vectors are reused; missing ones are requested from the
/// collaborator in fixed-size sequential batches and spliced back in corpus
/// order. A batch failure propagates unchanged.
pub async fn resolve_passage_embeddings(
    provider: &dyn EmbeddingProvider,
    passages: &[ReferencePassage],
) -> Result<Vec<Vec<f32>>, AuditError> {
    let missing: Vec<usize> = passages
        .iter()
        .enumerate()
        .filter(|(_, passage)| {
            passage
                .embedding
                .as_ref()
                .is_none_or(|embedding| embedding.is_empty())
        })
        .map(|(index, _)| index)
        .collect();

    let mut resolved: Vec<Vec<f32>> = passages
        .iter()
        .map(|passage| passage.embedding.clone().unwrap_or_default())
        .collect();
    if missing.is_empty() {
        return Ok(resolved);
    }

    let texts: Vec<String> = missing
        .iter()
        .map(|&index| passages[index].text.clone())
        .collect();
    let generated = embed_in_batches(provider, &texts).await?;
    if generated.len() != texts.len() {
        return Err(AuditError::EmbeddingCountMismatch {
            requested: texts.len(),
            received: generated.len(),
        });
    }

    for (slot, vector) in missing.into_iter().zip(generated) {
        resolved[slot] = vector;
    }
    Ok(resolved)
}

async fn embed_in_batches(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
) -> Result<Vec<Vec<f32>>, AuditError> {
    let mut out = Vec::with_capacity(texts.len());
    for batch in texts.chunks(EMBED_BATCH_SIZE) {
        out.extend(provider.embed_batch(batch).await?);
    }
    Ok(out)
}
