//! Collaborator seams: the generation and embedding calls this crate consumes.
//!
//! Both collaborators are black boxes behind async traits. Transport failures
//! are fatal for the surrounding run and propagate unchanged; there is no
//! retry logic at this layer.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;

use crate::retrieval::tokenizer::tokenize;
use crate::types::AuditError;

/// Reply from one generation call.
///
/// `usage` mirrors whatever accounting the backend reports, as a loose map;
/// absent or non-numeric fields count as zero when folded into a
/// [`UsageTotal`](crate::audit::usage::UsageTotal).
#[derive(Clone, Debug)]
pub struct ChatReply {
    pub text: String,
    pub usage: serde_json::Value,
}

impl ChatReply {
    /// A reply with no usage accounting attached.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: serde_json::Value::Null,
        }
    }

    /// Attach a usage delta map.
    #[must_use]
    pub fn with_usage(mut self, usage: serde_json::Value) -> Self {
        self.usage = usage;
        self
    }
}

/// The generation collaborator: system/user prompt strings in, reply out.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Run one generation call.
    ///
    /// # Errors
    ///
    /// Transport failures or empty replies surface as
    /// [`AuditError::Provider`] and abort the surrounding run.
    async fn complete(&self, system_prompt: &str, user_prompt: &str)
    -> Result<ChatReply, AuditError>;
}

/// The embedding collaborator: texts in, one fixed-length vector per text,
/// in the same order.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts.
    ///
    /// # Errors
    ///
    /// A failed batch is fatal and propagates as [`AuditError::Provider`].
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AuditError>;
}

/// Deterministic in-process embedding provider for tests and offline runs.
///
/// Hashes each lexical token (and adjacent-token bigram) into a signed
/// bucket, then L2-normalizes, so identical text always yields the identical
/// vector and token overlap shows up as cosine similarity.
#[derive(Clone, Debug)]
pub struct MockEmbeddingProvider {
    dimensions: usize,
}

impl MockEmbeddingProvider {
    pub fn new() -> Self {
        Self { dimensions: 64 }
    }

    /// Provider emitting vectors of the given length (minimum 8).
    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(8),
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimensions];
        let tokens = tokenize(text);
        for (index, token) in tokens.iter().enumerate() {
            bucket_feature(&mut vector, &format!("w:{token}"));
            if let Some(next) = tokens.get(index + 1) {
                bucket_feature(&mut vector, &format!("b:{token}_{next}"));
            }
        }
        normalize(&mut vector);
        vector
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AuditError> {
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }
}

fn bucket_feature(vector: &mut [f32], feature: &str) {
    let mut hasher = DefaultHasher::new();
    feature.hash(&mut hasher);
    let hash = hasher.finish();
    let index = (hash as usize) % vector.len();
    let sign = if (hash >> 63) & 1 == 0 { 1.0 } else { -1.0 };
    let weight = 1.0 + (((hash >> 48) & 0xFF) as f32 / 255.0);
    vector[index] += sign * weight;
}

fn normalize(vector: &mut [f32]) {
    let squared_norm = vector
        .iter()
        .map(|value| f64::from(*value) * f64::from(*value))
        .sum::<f64>();
    if squared_norm <= 0.0 {
        return;
    }
    let norm = squared_norm.sqrt() as f32;
    for value in vector.iter_mut() {
        *value /= norm;
    }
}
