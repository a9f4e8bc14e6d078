//! ============================================================================
//! Similarity Ranker - Cosine top-K over the vector store
//! ============================================================================
//! Rows are scored against the query vector, sorted by descending score
//! (stable, so ties keep table order) and truncated to K. A zero-norm
//! vector on either side scores `-inf` and therefore always ranks last.
//! ============================================================================

use std::sync::Arc;

use tracing::debug;

use super::store::VectorStore;
use crate::error::{QaError, Result};
use crate::llm::EmbeddingProvider;

/// Chunks handed to the prompt when no K is configured
pub const DEFAULT_TOP_K: usize = 5;

/// A chunk with its similarity to the query
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub index: usize,
    pub text: String,
    pub score: f32,
}

/// `dot(a, b) / (|a| * |b|)`, or `-inf` when either norm is zero
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(QaError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let (dot, norm_a, norm_b) = a.iter().zip(b).fold((0.0f32, 0.0f32, 0.0f32), |(d, na, nb), (x, y)| {
        (d + x * y, na + x * x, nb + y * y)
    });

    let denominator = norm_a.sqrt() * norm_b.sqrt();
    let score = dot / denominator;
    if denominator == 0.0 || !score.is_finite() {
        return Ok(f32::NEG_INFINITY);
    }
    Ok(score)
}

/// Rank every row of `store` against `query_vector`
pub fn rank_by_vector(query_vector: &[f32], store: &VectorStore, top_k: usize) -> Result<Vec<ScoredChunk>> {
    let Some(dimension) = store.dimension() else {
        return Ok(Vec::new());
    };
    if query_vector.len() != dimension {
        return Err(QaError::DimensionMismatch {
            expected: dimension,
            actual: query_vector.len(),
        });
    }

    let mut scored = store
        .records()
        .iter()
        .enumerate()
        .map(|(index, record)| {
            Ok(ScoredChunk {
                index,
                text: record.text.clone(),
                score: cosine_similarity(&record.embedding, query_vector)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    // sort_by is stable: equal scores stay in table order
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(top_k);
    Ok(scored)
}

/// Embeds the query and ranks the shared store
pub struct SimilarityRanker {
    embeddings: Arc<dyn EmbeddingProvider>,
    store: Arc<VectorStore>,
}

impl SimilarityRanker {
    pub fn new(embeddings: Arc<dyn EmbeddingProvider>, store: Arc<VectorStore>) -> Self {
        Self { embeddings, store }
    }

    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    /// Top-K chunk texts for `query`, best first
    pub async fn rank(&self, query: &str, top_k: usize) -> Result<Vec<String>> {
        Ok(self
            .rank_scored(query, top_k)
            .await?
            .into_iter()
            .map(|c| c.text)
            .collect())
    }

    pub async fn rank_scored(&self, query: &str, top_k: usize) -> Result<Vec<ScoredChunk>> {
        if self.store.is_empty() || top_k == 0 {
            debug!("Nothing to rank (store size {}, k {})", self.store.len(), top_k);
            return Ok(Vec::new());
        }

        let query_vector = self.embeddings.embed(query).await?;
        let ranked = rank_by_vector(&query_vector, &self.store, top_k)?;

        debug!(
            "Ranked {} rows, kept {} (best score {:?})",
            self.store.len(),
            ranked.len(),
            ranked.first().map(|c| c.score)
        );
        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::ChunkRecord;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedEmbedding {
        vector: Vec<f32>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingProvider for FixedEmbedding {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.vector.clone())
        }
    }

    fn store(rows: &[(&str, Vec<f32>)]) -> VectorStore {
        VectorStore::new(
            rows.iter()
                .map(|(t, v)| ChunkRecord::new(*t, v.clone()))
                .collect(),
        )
        .unwrap()
    }

    fn texts(chunks: &[ScoredChunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn test_cosine_basic() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]).unwrap() - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap().abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-2.0, 0.0]).unwrap() + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_zero_vector() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]).unwrap(), f32::NEG_INFINITY);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 0.0]).unwrap(), f32::NEG_INFINITY);
    }

    #[test]
    fn test_cosine_dimension_mismatch() {
        let err = cosine_similarity(&[1.0], &[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, QaError::DimensionMismatch { expected: 1, actual: 2 }));
    }

    #[test]
    fn test_rank_orders_by_score() {
        let s = store(&[
            ("far", vec![0.0, 1.0]),
            ("near", vec![1.0, 0.1]),
            ("mid", vec![1.0, 1.0]),
        ]);
        let ranked = rank_by_vector(&[1.0, 0.0], &s, 5).unwrap();
        assert_eq!(texts(&ranked), vec!["near", "mid", "far"]);
    }

    #[test]
    fn test_rank_respects_k_and_table_size() {
        let s = store(&[("a", vec![1.0]), ("b", vec![2.0]), ("c", vec![3.0])]);
        assert_eq!(rank_by_vector(&[1.0], &s, 2).unwrap().len(), 2);
        assert_eq!(rank_by_vector(&[1.0], &s, 10).unwrap().len(), 3);
        assert!(rank_by_vector(&[1.0], &s, 0).unwrap().is_empty());
    }

    #[test]
    fn test_rank_ties_keep_table_order() {
        // Parallel vectors with exact norms all score 1.0
        let s = store(&[
            ("first", vec![1.0, 0.0]),
            ("other", vec![0.0, 1.0]),
            ("second", vec![2.0, 0.0]),
            ("third", vec![0.5, 0.0]),
        ]);
        let ranked = rank_by_vector(&[4.0, 0.0], &s, 3).unwrap();
        assert_eq!(texts(&ranked), vec!["first", "second", "third"]);
        assert!(ranked.iter().all(|c| c.score == 1.0));

        let permuted = store(&[
            ("third", vec![0.5, 0.0]),
            ("other", vec![0.0, 1.0]),
            ("first", vec![1.0, 0.0]),
            ("second", vec![2.0, 0.0]),
        ]);
        let ranked = rank_by_vector(&[4.0, 0.0], &permuted, 3).unwrap();
        assert_eq!(texts(&ranked), vec!["third", "first", "second"]);
    }

    #[test]
    fn test_zero_rows_rank_last() {
        let s = store(&[("zero", vec![0.0, 0.0]), ("opposite", vec![-1.0, 0.0])]);
        let ranked = rank_by_vector(&[1.0, 0.0], &s, 5).unwrap();
        assert_eq!(texts(&ranked), vec!["opposite", "zero"]);

        let ranked = rank_by_vector(&[0.0, 0.0], &s, 5).unwrap();
        assert_eq!(texts(&ranked), vec!["zero", "opposite"]);
    }

    #[test]
    fn test_rank_dimension_mismatch_fails_loudly() {
        let s = store(&[("a", vec![1.0, 0.0])]);
        let err = rank_by_vector(&[1.0, 0.0, 0.0], &s, 5).unwrap_err();
        assert!(matches!(err, QaError::DimensionMismatch { expected: 2, actual: 3 }));
    }

    #[tokio::test]
    async fn test_ranker_empty_store_skips_embedding() {
        let embeddings = Arc::new(FixedEmbedding { vector: vec![1.0], calls: AtomicUsize::new(0) });
        let ranker = SimilarityRanker::new(embeddings.clone(), Arc::new(VectorStore::default()));
        let result = ranker.rank("¿qué produce Arauco?", DEFAULT_TOP_K).await.unwrap();
        assert!(result.is_empty());
        assert_eq!(embeddings.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ranker_returns_texts() {
        let embeddings = Arc::new(FixedEmbedding { vector: vec![1.0, 0.0], calls: AtomicUsize::new(0) });
        let s = store(&[("b", vec![0.0, 1.0]), ("a", vec![1.0, 0.0])]);
        let ranker = SimilarityRanker::new(embeddings.clone(), Arc::new(s));
        let result = ranker.rank("q", 1).await.unwrap();
        assert_eq!(result, vec!["a".to_string()]);
        assert_eq!(embeddings.calls.load(Ordering::SeqCst), 1);
    }
}
