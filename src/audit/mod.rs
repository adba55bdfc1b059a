//! The chunked review pipeline: retrieval, generation, coercion, merge.
//!
//! # Execution model
//!
//! 1. The document is split into ordered chunks ([`split_document`]).
//! 2. Chunks are reviewed strictly sequentially: each request carries the
//!    partial results of every earlier chunk as flat text, so there is no
//!    chunk-level parallelism to be had.
//! 3. Every reply passes through [`resilience::coerce_report`]; a malformed
//!    reply degrades the content but never aborts the run. A collaborator
//!    error does abort, unchanged.
//! 4. A final merge call folds the ordered partial reports into one report,
//!    which carries the partials under [`CHUNK_REPORTS_FIELD`].

pub mod citations;
pub mod memory;
pub mod prompt;
pub mod resilience;
pub mod usage;

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::chunking::split_document;
use crate::providers::{ChatProvider, EmbeddingProvider};
use crate::retrieval::PassageRanker;
use crate::types::{AuditError, ReferencePassage};
use resilience::coerce_report;
use usage::UsageTotal;

/// Name of the required list field in review reports.
pub const RISKS_FIELD: &str = "risks";
/// Field the merge step stores the ordered per-chunk reports under.
pub const CHUNK_REPORTS_FIELD: &str = "chunk_reports";

/// Default per-chunk character limit.
pub const DEFAULT_MAX_CHUNK_CHARS: usize = 20_000;
/// Default number of reference passages selected per chunk.
pub const DEFAULT_TOP_K: usize = 20;

/// Final result of a pipeline run.
#[derive(Clone, Debug)]
pub struct AuditOutcome {
    /// The merged review report; `summary` and `risks` are always present.
    pub report: Value,
    /// Accumulated token usage across every generation call of the run.
    pub usage: UsageTotal,
}

/// Drives chunked document review against a reference corpus.
///
/// Holds the two collaborator seams plus the run configuration; one pipeline
/// value can serve any number of independent runs, each of which owns its own
/// chunk list, partial results, and usage accumulator.
pub struct AuditPipeline {
    chat: Arc<dyn ChatProvider>,
    ranker: PassageRanker,
    max_chunk_chars: usize,
    top_k: usize,
    full_corpus: bool,
}

impl AuditPipeline {
    /// Start building a pipeline.
    #[must_use]
    pub fn builder() -> AuditPipelineBuilder {
        AuditPipelineBuilder::default()
    }

    /// Reviews `document` against `passages`, carrying `memory` into every
    /// request, and returns the merged report plus the usage total.
    ///
    /// # Errors
    ///
    /// - [`AuditError::EmptyDocument`] / [`AuditError::EmptyCorpus`] for
    ///   unusable input, surfaced before any collaborator call.
    /// - Collaborator failures propagate unchanged and abort the run; no
    ///   partial results are returned on that path.
    /// - [`AuditError::MissingJsonObject`] when a reply carries no JSON
    ///   object at all. Any lesser malformation is absorbed.
    pub async fn run(
        &self,
        document: &str,
        passages: &[ReferencePassage],
        memory: &str,
    ) -> Result<AuditOutcome, AuditError> {
        let chunks = split_document(document, self.max_chunk_chars);
        if chunks.is_empty() {
            return Err(AuditError::EmptyDocument);
        }
        if passages.is_empty() {
            return Err(AuditError::EmptyCorpus);
        }

        let system_prompt = prompt::build_system_prompt();
        let mut total_usage = UsageTotal::default();
        let mut partials: Vec<Value> = Vec::with_capacity(chunks.len());

        for chunk in &chunks {
            let selected = self
                .ranker
                .select_top(&chunk.text, passages, self.top_k, self.full_corpus)
                .await?;
            debug!(
                chunk = chunk.index,
                total = chunk.total,
                selected = selected.len(),
                "reviewing chunk"
            );

            let prior = prompt::render_partial_findings(&partials);
            let request = prompt::build_chunk_prompt(memory, &prior, chunk, &selected);
            let reply = self.chat.complete(&system_prompt, &request).await?;

            let mut report = coerce_report(&reply.text, RISKS_FIELD)?;
            if let Value::Object(fields) = &mut report {
                fields.insert("chunk_index".to_string(), Value::from(chunk.index));
                fields.insert("chunk_total".to_string(), Value::from(chunk.total));
                fields.insert("chunk_text".to_string(), Value::String(chunk.text.clone()));
            }
            partials.push(report);
            total_usage.merge(&reply.usage);
        }

        let merge_request = prompt::build_merge_prompt(memory, &partials);
        let reply = self.chat.complete(&system_prompt, &merge_request).await?;
        let mut final_report = coerce_report(&reply.text, RISKS_FIELD)?;
        if let Value::Object(fields) = &mut final_report {
            fields.insert(CHUNK_REPORTS_FIELD.to_string(), Value::Array(partials));
        }
        total_usage.merge(&reply.usage);

        info!(
            chunks = chunks.len(),
            prompt_tokens = total_usage.prompt_total,
            completion_tokens = total_usage.completion,
            "review complete"
        );
        Ok(AuditOutcome {
            report: final_report,
            usage: total_usage,
        })
    }
}

/// Builder for [`AuditPipeline`].
#[derive(Default)]
pub struct AuditPipelineBuilder {
    chat: Option<Arc<dyn ChatProvider>>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    max_chunk_chars: Option<usize>,
    top_k: Option<usize>,
    full_corpus: bool,
}

impl AuditPipelineBuilder {
    /// Set the generation collaborator. Required.
    #[must_use]
    pub fn chat(mut self, chat: impl ChatProvider + 'static) -> Self {
        self.chat = Some(Arc::new(chat));
        self
    }

    /// Set the generation collaborator from an existing `Arc`.
    #[must_use]
    pub fn chat_arc(mut self, chat: Arc<dyn ChatProvider>) -> Self {
        self.chat = Some(chat);
        self
    }

    /// Set the embedding collaborator. Required.
    #[must_use]
    pub fn embedder(mut self, embedder: impl EmbeddingProvider + 'static) -> Self {
        self.embedder = Some(Arc::new(embedder));
        self
    }

    /// Set the embedding collaborator from an existing `Arc`.
    #[must_use]
    pub fn embedder_arc(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Maximum characters per document chunk.
    ///
    /// Defaults to [`DEFAULT_MAX_CHUNK_CHARS`]; 0 disables splitting.
    #[must_use]
    pub fn max_chunk_chars(mut self, limit: usize) -> Self {
        self.max_chunk_chars = Some(limit);
        self
    }

    /// Number of reference passages selected per chunk.
    ///
    /// Defaults to [`DEFAULT_TOP_K`].
    #[must_use]
    pub fn top_k(mut self, k: usize) -> Self {
        self.top_k = Some(k);
        self
    }

    /// Skip scoring and hand the entire corpus to every chunk request.
    #[must_use]
    pub fn full_corpus(mut self, enabled: bool) -> Self {
        self.full_corpus = enabled;
        self
    }

    /// Build the pipeline.
    ///
    /// # Panics
    ///
    /// Panics if the chat or embedding collaborator was not set.
    pub fn build(self) -> AuditPipeline {
        AuditPipeline {
            chat: self
                .chat
                .expect("AuditPipelineBuilder requires a chat provider"),
            ranker: PassageRanker::new(
                self.embedder
                    .expect("AuditPipelineBuilder requires an embedding provider"),
            ),
            max_chunk_chars: self.max_chunk_chars.unwrap_or(DEFAULT_MAX_CHUNK_CHARS),
            top_k: self.top_k.unwrap_or(DEFAULT_TOP_K),
            full_corpus: self.full_corpus,
        }
    }

    /// Build the pipeline, returning `None` when a collaborator is missing.
    pub fn try_build(self) -> Option<AuditPipeline> {
        Some(AuditPipeline {
            chat: self.chat?,
            ranker: PassageRanker::new(self.embedder?),
            max_chunk_chars: self.max_chunk_chars.unwrap_or(DEFAULT_MAX_CHUNK_CHARS),
            top_k: self.top_k.unwrap_or(DEFAULT_TOP_K),
            full_corpus: self.full_corpus,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_requires_collaborators() {
        assert!(AuditPipelineBuilder::default().try_build().is_none());
    }
}
