//! ============================================================================
//! Retrieval Module - Flat vector store and cosine ranking
//! ============================================================================
//! The store is loaded once at startup and never mutated, so it is shared
//! across sessions behind an `Arc`. Ranking is a linear scan per query.
//!
//! ```text
//! Query → Embed → cosine vs every row → stable sort → top K chunk texts
//! ```
//! ============================================================================

mod ranker;
mod store;

pub use ranker::{cosine_similarity, rank_by_vector, ScoredChunk, SimilarityRanker, DEFAULT_TOP_K};
pub use store::{ChunkRecord, VectorStore};
