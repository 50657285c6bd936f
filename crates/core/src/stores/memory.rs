//! In-process vector store over cosine similarity.
//!
//! Used for offline runs and tests. A reindex swaps the whole record set
//! under one write lock, so a concurrent query sees either the old set or
//! the new one, never a mix.

use crate::error::PipelineError;
use crate::models::{Chunk, ScoredChunk};
use crate::traits::VectorIndex;
use async_trait::async_trait;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct VectorRecord {
    id: String,
    source: String,
    text: String,
    embedding: Vec<f32>,
}

#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<Vec<VectorRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn cosine_similarity(left: &[f32], right: &[f32]) -> f64 {
    let dot: f32 = left.iter().zip(right).map(|(a, b)| a * b).sum();
    let left_norm: f32 = left.iter().map(|a| a * a).sum::<f32>().sqrt();
    let right_norm: f32 = right.iter().map(|b| b * b).sum::<f32>().sqrt();
    if left_norm == 0.0 || right_norm == 0.0 {
        return 0.0;
    }
    f64::from(dot / (left_norm * right_norm))
}

#[async_trait]
impl VectorIndex for MemoryStore {
    async fn reindex(
        &self,
        chunks: &[Chunk],
        embeddings: &[Vec<f32>],
    ) -> Result<(), PipelineError> {
        if chunks.len() != embeddings.len() {
            return Err(PipelineError::Storage(format!(
                "embedding count {} does not match chunk count {}",
                embeddings.len(),
                chunks.len()
            )));
        }
        if let Some(first) = embeddings.first() {
            if embeddings.iter().any(|embedding| embedding.len() != first.len()) {
                return Err(PipelineError::Storage(
                    "embeddings in one batch must share a dimensionality".to_string(),
                ));
            }
        }

        let fresh: Vec<VectorRecord> = chunks
            .iter()
            .zip(embeddings.iter())
            .map(|(chunk, embedding)| VectorRecord {
                id: chunk.id.clone(),
                source: chunk.source.clone(),
                text: chunk.text.clone(),
                embedding: embedding.clone(),
            })
            .collect();

        *self.records.write().await = fresh;
        Ok(())
    }

    async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, PipelineError> {
        let records = self.records.read().await;
        if records.is_empty() {
            return Ok(Vec::new());
        }
        if records[0].embedding.len() != embedding.len() {
            return Err(PipelineError::Storage(format!(
                "query dimension {} does not match index dimension {}",
                embedding.len(),
                records[0].embedding.len()
            )));
        }

        let mut hits: Vec<ScoredChunk> = records
            .iter()
            .map(|record| ScoredChunk {
                id: record.id.clone(),
                text: record.text.clone(),
                source: record.source.clone(),
                score: cosine_similarity(embedding, &record.embedding),
            })
            .collect();

        hits.sort_by(|left, right| right.score.total_cmp(&left.score));
        hits.truncate(top_k);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryStore;
    use crate::embeddings::{Embedder, HashedNgramEmbedder};
    use crate::models::Chunk;
    use crate::traits::VectorIndex;

    fn chunk(id: &str, text: &str) -> Chunk {
        Chunk {
            id: id.to_string(),
            source: "doc.md".to_string(),
            start_offset: 0,
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn empty_store_returns_no_hits() {
        let store = MemoryStore::new();
        let hits = store.query(&[0.0; 8], 3).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn chunk_retrieves_itself_as_top_hit() {
        let embedder = HashedNgramEmbedder::default();
        let chunks = vec![
            chunk("0", "Paris is the capital of France."),
            chunk("1", "Bread rises when the yeast ferments."),
            chunk("2", "Rust ownership prevents data races."),
        ];
        let embeddings: Vec<Vec<f32>> =
            chunks.iter().map(|chunk| embedder.embed(&chunk.text)).collect();

        let store = MemoryStore::new();
        store.reindex(&chunks, &embeddings).await.unwrap();

        for chunk in &chunks {
            let hits = store.query(&embedder.embed(&chunk.text), 1).await.unwrap();
            assert_eq!(hits[0].id, chunk.id);
        }
    }

    #[tokio::test]
    async fn scores_are_non_increasing_and_capped_at_top_k() {
        let embedder = HashedNgramEmbedder::default();
        let chunks = vec![
            chunk("0", "alpha beta gamma"),
            chunk("1", "alpha beta"),
            chunk("2", "delta epsilon"),
            chunk("3", "alpha"),
        ];
        let embeddings: Vec<Vec<f32>> =
            chunks.iter().map(|chunk| embedder.embed(&chunk.text)).collect();

        let store = MemoryStore::new();
        store.reindex(&chunks, &embeddings).await.unwrap();

        let hits = store.query(&embedder.embed("alpha beta"), 3).await.unwrap();
        assert_eq!(hits.len(), 3);
        for pair in hits.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[tokio::test]
    async fn reindex_fully_replaces_previous_set() {
        let embedder = HashedNgramEmbedder::default();
        let first = vec![chunk("0", "old content about pottery")];
        let first_embeddings = vec![embedder.embed(&first[0].text)];

        let store = MemoryStore::new();
        store.reindex(&first, &first_embeddings).await.unwrap();

        let second = vec![chunk("0", "new content about sailing")];
        let second_embeddings = vec![embedder.embed(&second[0].text)];
        store.reindex(&second, &second_embeddings).await.unwrap();

        let hits = store
            .query(&embedder.embed("old content about pottery"), 5)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text, "new content about sailing");
    }

    #[tokio::test]
    async fn mismatched_counts_are_a_storage_error() {
        let store = MemoryStore::new();
        let result = store.reindex(&[chunk("0", "text")], &[]).await;
        assert!(result.is_err());
    }
}
