//! ============================================================================
//! CHATQA-CORE: Retrieval-augmented Q&A with security layers
//! ============================================================================
//! This crate handles all logic behind the chat surface:
//! - Security gate (ban-list, personal information, policy judge)
//! - Cosine retrieval over a precomputed embedding store
//! - Prompt assembly and chat completion over OpenAI-compatible APIs
//! - Per-session settings and conversation history
//! ============================================================================

pub mod config;
pub mod error;
pub mod llm;
pub mod prompt;
pub mod retrieval;
pub mod security;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use config::{AppConfig, DataPaths};
pub use error::{QaError, Result};
pub use llm::{ChatCompletion, CompletionRequest, EmbeddingProvider, OpenAiClient};
pub use retrieval::{ChunkRecord, SimilarityRanker, VectorStore};
pub use security::{
    FilterMethod, SecurityCategory, SecurityGate, SecurityVerdict, ServiceErrorPolicy,
};
pub use session::{ChatSession, QaPipeline, SessionState, TurnOutcome};
pub use types::*;
