//! Core record types and the crate-wide error enum.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One indexed reference text unit eligible for retrieval.
///
/// Identity is structural; records are never mutated in place. Re-embedding
/// produces a new record via [`ReferencePassage::with_embedding`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReferencePassage {
    /// Source document this passage came from (path, URL, or logical id).
    pub source_id: String,
    /// Section marker within the source document.
    pub section_label: String,
    /// The passage text itself.
    pub text: String,
    /// Embedding vector, lazily populated by the embedding collaborator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl ReferencePassage {
    /// Create a passage with no embedding yet.
    pub fn new(
        source_id: impl Into<String>,
        section_label: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            section_label: section_label.into(),
            text: text.into(),
            embedding: None,
        }
    }

    /// Returns a new record carrying the given embedding.
    #[must_use]
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

/// A bounded contiguous slice of an oversized input document.
///
/// `index` is 1-based; the index/total pair defines processing and narrative
/// order and is preserved end to end through the pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub index: usize,
    pub total: usize,
    pub text: String,
}

/// Errors surfaced by the retrieval and review pipeline.
///
/// Malformed generation *content* is never an error here; the resilience
/// layer absorbs it. Only structurally unusable replies
/// ([`AuditError::MissingJsonObject`]) and collaborator transport failures
/// ([`AuditError::Provider`]) abort a run.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The input document was empty after trimming.
    #[error("document text is empty")]
    EmptyDocument,

    /// The pipeline was started without any reference passages.
    #[error("reference corpus is empty")]
    EmptyCorpus,

    /// A generation reply carried no `{…}` object at all.
    #[error("no JSON object found in model reply")]
    MissingJsonObject,

    /// An external collaborator (generation or embedding call) failed.
    #[error("provider error ({provider}): {message}")]
    Provider {
        provider: &'static str,
        message: String,
    },

    /// The embedding collaborator broke its one-vector-per-input contract.
    #[error("embedding count mismatch: requested {requested}, received {received}")]
    EmbeddingCountMismatch { requested: usize, received: usize },
}
