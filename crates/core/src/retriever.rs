//! Query-time retrieval and grounded prompt assembly.

use crate::embeddings::Embedder;
use crate::error::PipelineError;
use crate::models::RetrievalResult;
use crate::traits::VectorIndex;

pub const CONTEXT_DELIMITER: &str = "\n\n---\n\n";

const PROMPT_TEMPLATE: &str = "Answer the question based only on the following context:

{context}

---

Answer the question based on the above context: {question}";

/// Wraps retrieved passages (descending similarity order) and the original
/// question into a prompt that instructs the generator to answer strictly
/// from the supplied context.
pub fn build_grounded_prompt(context_texts: &[String], question: &str) -> String {
    let context = context_texts.join(CONTEXT_DELIMITER);
    PROMPT_TEMPLATE
        .replace("{context}", &context)
        .replace("{question}", question)
}

/// Embeds the query with the same model used at ingestion time, runs
/// top-k nearest-neighbor search, and assembles the grounded prompt.
/// Zero hits is reported as [`PipelineError::NoMatches`], a valid negative
/// outcome rather than a system fault.
pub async fn retrieve<E, V>(
    embedder: &E,
    index: &V,
    query_text: &str,
    top_k: usize,
) -> Result<RetrievalResult, PipelineError>
where
    E: Embedder + Sync,
    V: VectorIndex + Sync,
{
    if query_text.trim().is_empty() {
        return Err(PipelineError::EmptyQuery);
    }

    let embedding = embedder.embed(query_text);
    let hits = index.query(&embedding, top_k).await?;
    if hits.is_empty() {
        return Err(PipelineError::NoMatches);
    }

    let context_texts: Vec<String> = hits.iter().map(|hit| hit.text.clone()).collect();
    let sources: Vec<String> = hits.iter().map(|hit| hit.source.clone()).collect();
    let prompt = build_grounded_prompt(&context_texts, query_text);

    Ok(RetrievalResult {
        context_texts,
        sources,
        prompt,
    })
}

#[cfg(test)]
mod tests {
    use super::{build_grounded_prompt, retrieve};
    use crate::embeddings::{Embedder, HashedNgramEmbedder};
    use crate::error::PipelineError;
    use crate::models::Chunk;
    use crate::stores::MemoryStore;
    use crate::traits::VectorIndex;

    #[test]
    fn prompt_contains_context_and_question_in_order() {
        let prompt = build_grounded_prompt(
            &["first passage".to_string(), "second passage".to_string()],
            "What happened?",
        );

        assert!(prompt.contains("first passage\n\n---\n\nsecond passage"));
        assert!(prompt.ends_with("Answer the question based on the above context: What happened?"));
        assert!(prompt.find("first passage").unwrap() < prompt.find("What happened?").unwrap());
    }

    #[tokio::test]
    async fn empty_index_reports_no_matches() {
        let store = MemoryStore::new();
        let embedder = HashedNgramEmbedder::default();
        let result = retrieve(&embedder, &store, "anything at all", 3).await;
        assert!(matches!(result, Err(PipelineError::NoMatches)));
    }

    #[tokio::test]
    async fn blank_query_is_rejected() {
        let store = MemoryStore::new();
        let embedder = HashedNgramEmbedder::default();
        let result = retrieve(&embedder, &store, "   ", 3).await;
        assert!(matches!(result, Err(PipelineError::EmptyQuery)));
    }

    #[tokio::test]
    async fn returns_min_of_top_k_and_collection_size_in_rank_order() {
        let embedder = HashedNgramEmbedder::default();
        let chunks: Vec<Chunk> = ["Paris is the capital of France.", "Berlin is in Germany."]
            .iter()
            .enumerate()
            .map(|(index, text)| Chunk {
                id: index.to_string(),
                source: "cities.md".to_string(),
                start_offset: index * 200,
                text: (*text).to_string(),
            })
            .collect();
        let embeddings: Vec<Vec<f32>> =
            chunks.iter().map(|chunk| embedder.embed(&chunk.text)).collect();

        let store = MemoryStore::new();
        store.reindex(&chunks, &embeddings).await.unwrap();

        let result = retrieve(&embedder, &store, "What is the capital of France?", 3)
            .await
            .unwrap();

        assert_eq!(result.context_texts.len(), 2);
        assert_eq!(result.sources.len(), 2);
        assert_eq!(result.context_texts[0], "Paris is the capital of France.");
        assert!(result.prompt.contains("Paris is the capital of France."));
        assert!(result.prompt.contains("What is the capital of France?"));
    }
}
