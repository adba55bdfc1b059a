//! Hybrid lexical+semantic passage retrieval and chunked LLM document review.
//!
//! ```text
//! Reference text ──► corpus::parse_reference_passages ──► passage corpus
//!
//! Document ──► chunking::split_document ──► ordered chunks
//!                                             │
//!   per chunk: retrieval::PassageRanker ◄─────┤   BM25 + cosine, 0.6/0.4 fusion
//!                     │                       │
//!                     ▼                       ▼
//!       audit::AuditPipeline ──► ChatProvider ──► audit::resilience ──► partial reports
//!                     │
//!                     └─► merge pass ──► AuditOutcome { report, usage }
//! ```
//!
//! Generation and embedding are collaborator traits
//! ([`providers::ChatProvider`], [`providers::EmbeddingProvider`]); this crate
//! never talks to a backend itself, and it keeps no state across runs: the
//! cross-run memory blob is an explicit string parameter the caller persists.

pub mod audit;
pub mod chunking;
pub mod corpus;
pub mod providers;
pub mod retrieval;
pub mod types;

pub use audit::usage::UsageTotal;
pub use audit::{AuditOutcome, AuditPipeline};
pub use chunking::split_document;
pub use corpus::parse_reference_passages;
pub use providers::{ChatProvider, ChatReply, EmbeddingProvider, MockEmbeddingProvider};
pub use retrieval::{PassageRanker, ScoredCandidate};
pub use types::{AuditError, Chunk, ReferencePassage};
