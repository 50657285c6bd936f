//! The pipeline facade composing normalization, chunking, embedding,
//! indexing, retrieval, and generation dispatch into the operations the
//! routing layer exposes.

use crate::chunking::{chunk_document, chunk_documents};
use crate::embeddings::Embedder;
use crate::error::PipelineError;
use crate::generation::{parse_question_list, GenerationRouter};
use crate::ingest::{self, SkippedDocument};
use crate::models::{
    BackendKind, ChunkingOptions, DocumentFingerprint, QuestionAnswer, QuestionSource,
    RetrievalOptions,
};
use crate::normalizer::DocumentNormalizer;
use crate::retriever::retrieve;
use crate::traits::VectorIndex;
use std::path::Path;

#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineOptions {
    pub chunking: ChunkingOptions,
    pub retrieval: RetrievalOptions,
}

pub struct IngestOutcome {
    pub chunks_indexed: usize,
    pub fingerprint: DocumentFingerprint,
}

pub struct IngestReport {
    pub chunks_indexed: usize,
    pub documents: Vec<DocumentFingerprint>,
    pub skipped: Vec<SkippedDocument>,
}

pub struct QueryOutcome {
    pub answer: String,
    pub sources: Vec<String>,
}

pub struct OcrAccuracyReport {
    pub accuracy: f64,
    pub extracted_text: String,
}

pub struct RagPipeline<V, E>
where
    V: VectorIndex,
    E: Embedder,
{
    normalizer: DocumentNormalizer,
    index: V,
    embedder: E,
    router: GenerationRouter,
    options: PipelineOptions,
}

impl<V, E> RagPipeline<V, E>
where
    V: VectorIndex + Send + Sync,
    E: Embedder + Send + Sync,
{
    pub fn new(
        normalizer: DocumentNormalizer,
        index: V,
        embedder: E,
        router: GenerationRouter,
        options: PipelineOptions,
    ) -> Self {
        Self {
            normalizer,
            index,
            embedder,
            router,
            options,
        }
    }

    /// Normalizes one document, chunks it, and fully replaces the index
    /// content with the fresh chunk set.
    pub async fn ingest(&self, path: &Path) -> Result<IngestOutcome, PipelineError> {
        let document = self.normalizer.normalize(path).await?;
        let fingerprint = ingest::fingerprint(path)?;

        let (chunks, _next_id) = chunk_document(&document, &self.options.chunking, 0)?;
        let embeddings: Vec<Vec<f32>> = chunks
            .iter()
            .map(|chunk| self.embedder.embed(&chunk.text))
            .collect();
        self.index.reindex(&chunks, &embeddings).await?;

        Ok(IngestOutcome {
            chunks_indexed: chunks.len(),
            fingerprint,
        })
    }

    /// Batch variant: every supported document under the folder lands in
    /// one reindex, with per-file failures reported as skips.
    pub async fn ingest_folder(&self, folder: &Path) -> Result<IngestReport, PipelineError> {
        let batch = ingest::normalize_folder_best_effort(&self.normalizer, folder).await?;

        let chunks = chunk_documents(&batch.documents, &self.options.chunking)?;
        let embeddings: Vec<Vec<f32>> = chunks
            .iter()
            .map(|chunk| self.embedder.embed(&chunk.text))
            .collect();
        self.index.reindex(&chunks, &embeddings).await?;

        Ok(IngestReport {
            chunks_indexed: chunks.len(),
            documents: batch.fingerprints,
            skipped: batch.skipped,
        })
    }

    /// Retrieval-augmented answer to a natural-language question.
    pub async fn query(
        &self,
        query_text: &str,
        backend: BackendKind,
    ) -> Result<QueryOutcome, PipelineError> {
        let retrieval = retrieve(
            &self.embedder,
            &self.index,
            query_text,
            self.options.retrieval.top_k,
        )
        .await?;

        let answer = self.router.generate(&retrieval.prompt, backend).await?;
        Ok(QueryOutcome {
            answer,
            sources: retrieval.sources,
        })
    }

    pub async fn summarize(
        &self,
        path: &Path,
        backend: BackendKind,
    ) -> Result<String, PipelineError> {
        let document = self.normalizer.normalize(path).await?;
        let prompt = format!(
            "Summarize the following document in a concise paragraph:\n\n{}",
            document.text
        );
        self.router.generate(&prompt, backend).await
    }

    /// Expands a document; when a target character count is requested the
    /// reply is truncated or right-padded with spaces to exactly that
    /// length.
    pub async fn expand(
        &self,
        path: &Path,
        backend: BackendKind,
        target_chars: Option<usize>,
    ) -> Result<String, PipelineError> {
        let document = self.normalizer.normalize(path).await?;
        let prompt = match target_chars {
            Some(target) => format!(
                "Expand the following text with additional supporting detail, aiming for roughly {target} characters:\n\n{}",
                document.text
            ),
            None => format!(
                "Expand the following text with additional supporting detail:\n\n{}",
                document.text
            ),
        };

        let reply = self.router.generate(&prompt, backend).await?;
        Ok(match target_chars {
            Some(target) => fit_to_length(&reply, target),
            None => reply,
        })
    }

    /// Asks the backend for question/answer pairs over the document.
    /// Malformed generator output degrades to an empty list.
    pub async fn generate_questions(
        &self,
        source: QuestionSource,
        backend: BackendKind,
    ) -> Result<Vec<QuestionAnswer>, PipelineError> {
        let text = match source {
            QuestionSource::File(path) => self.normalizer.normalize(&path).await?.text,
            QuestionSource::RawText(text) => text,
        };

        let prompt = format!(
            "Generate question and answer pairs covering the key points of the text below. \
             Respond with a JSON array of objects with \"question\" and \"answer\" fields and nothing else.\n\n{text}"
        );
        let reply = self.router.generate(&prompt, backend).await?;
        Ok(parse_question_list(&reply))
    }

    /// Scores the document's extracted text against a known reference
    /// transcript. Diagnostic only; never blocks ingestion.
    pub async fn evaluate_ocr_accuracy(
        &self,
        path: &Path,
        reference: &str,
    ) -> Result<OcrAccuracyReport, PipelineError> {
        let document = self.normalizer.normalize(path).await?;
        let accuracy = crate::accuracy::levenshtein_accuracy(&document.text, reference);
        Ok(OcrAccuracyReport {
            accuracy,
            extracted_text: document.text,
        })
    }
}

/// Truncates or right-pads with spaces to exactly `target` characters.
pub fn fit_to_length(text: &str, target: usize) -> String {
    let mut characters: Vec<char> = text.chars().collect();
    if characters.len() >= target {
        characters.truncate(target);
        return characters.into_iter().collect();
    }

    let mut padded: String = characters.into_iter().collect();
    padded.extend(std::iter::repeat(' ').take(target - text.chars().count()));
    padded
}

#[cfg(test)]
mod tests {
    use super::{fit_to_length, PipelineOptions, RagPipeline};
    use crate::error::{IngestError, PipelineError};
    use crate::generation::GenerationRouter;
    use crate::models::{BackendKind, QuestionSource};
    use crate::normalizer::DocumentNormalizer;
    use crate::stores::MemoryStore;
    use crate::traits::{GenerationBackend, OcrEngine, PdfConverter};
    use crate::embeddings::HashedNgramEmbedder;
    use async_trait::async_trait;
    use std::path::Path;
    use tempfile::tempdir;

    struct NoOcr;

    #[async_trait]
    impl OcrEngine for NoOcr {
        async fn recognize(&self, _path: &Path) -> Result<String, IngestError> {
            Err(IngestError::OcrService("not configured in tests".to_string()))
        }
    }

    struct NoConverter;

    #[async_trait]
    impl PdfConverter for NoConverter {
        async fn to_pdf(&self, _path: &Path) -> Result<Vec<u8>, IngestError> {
            Err(IngestError::Conversion("not configured in tests".to_string()))
        }
    }

    struct EchoBackend;

    #[async_trait]
    impl GenerationBackend for EchoBackend {
        fn name(&self) -> &'static str {
            "echo"
        }

        async fn generate(&self, prompt: &str) -> Result<String, PipelineError> {
            Ok(prompt.to_string())
        }
    }

    struct FixedReplyBackend {
        reply: String,
    }

    #[async_trait]
    impl GenerationBackend for FixedReplyBackend {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn generate(&self, _prompt: &str) -> Result<String, PipelineError> {
            Ok(self.reply.clone())
        }
    }

    fn pipeline(
        backend: Box<dyn GenerationBackend + Send + Sync>,
    ) -> RagPipeline<MemoryStore, HashedNgramEmbedder> {
        RagPipeline::new(
            DocumentNormalizer::new(Box::new(NoOcr), Box::new(NoConverter)),
            MemoryStore::new(),
            HashedNgramEmbedder::default(),
            GenerationRouter::new().with_backend(BackendKind::Local, backend),
            PipelineOptions::default(),
        )
    }

    #[tokio::test]
    async fn ingest_then_query_grounds_the_prompt_in_the_document() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("france.md");
        std::fs::write(&path, "Paris is the capital of France.").unwrap();

        let pipeline = pipeline(Box::new(EchoBackend));
        let outcome = pipeline.ingest(&path).await.unwrap();
        assert_eq!(outcome.chunks_indexed, 1);
        assert_eq!(outcome.fingerprint.source, "france.md");

        let result = pipeline
            .query("What is the capital of France?", BackendKind::Local)
            .await
            .unwrap();

        // the echo backend returns the assembled prompt verbatim
        assert!(result.answer.contains("Paris is the capital of France."));
        assert!(result.answer.contains("What is the capital of France?"));
        assert_eq!(result.sources, vec!["france.md".to_string()]);
    }

    #[tokio::test]
    async fn thousand_char_document_indexes_four_chunks() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("long.txt");
        std::fs::write(&path, "b".repeat(1000)).unwrap();

        let pipeline = pipeline(Box::new(EchoBackend));
        let outcome = pipeline.ingest(&path).await.unwrap();
        assert_eq!(outcome.chunks_indexed, 4);
    }

    #[tokio::test]
    async fn query_before_any_ingest_reports_no_matches() {
        let pipeline = pipeline(Box::new(EchoBackend));
        let result = pipeline.query("anything", BackendKind::Local).await;
        assert!(matches!(result, Err(PipelineError::NoMatches)));
    }

    #[tokio::test]
    async fn expand_pads_short_replies_to_the_requested_length() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("note.md");
        std::fs::write(&path, "A short note.").unwrap();

        let pipeline = pipeline(Box::new(FixedReplyBackend {
            reply: "y".repeat(300),
        }));
        let expanded = pipeline
            .expand(&path, BackendKind::Local, Some(500))
            .await
            .unwrap();

        assert_eq!(expanded.chars().count(), 500);
        assert!(expanded.ends_with(' '));
    }

    #[tokio::test]
    async fn expand_truncates_long_replies_to_the_requested_length() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("note.md");
        std::fs::write(&path, "A short note.").unwrap();

        let pipeline = pipeline(Box::new(FixedReplyBackend {
            reply: "z".repeat(900),
        }));
        let expanded = pipeline
            .expand(&path, BackendKind::Local, Some(500))
            .await
            .unwrap();
        assert_eq!(expanded.chars().count(), 500);
    }

    #[tokio::test]
    async fn malformed_question_output_yields_empty_list_not_error() {
        let pipeline = pipeline(Box::new(FixedReplyBackend {
            reply: "I'd rather chat about the weather.".to_string(),
        }));

        let questions = pipeline
            .generate_questions(
                QuestionSource::RawText("The mitochondria is the powerhouse of the cell.".to_string()),
                BackendKind::Local,
            )
            .await
            .unwrap();
        assert!(questions.is_empty());
    }

    #[tokio::test]
    async fn well_formed_question_output_parses() {
        let pipeline = pipeline(Box::new(FixedReplyBackend {
            reply: r#"[{"question":"What is Paris?","answer":"The capital of France."}]"#.to_string(),
        }));

        let questions = pipeline
            .generate_questions(
                QuestionSource::RawText("Paris is the capital of France.".to_string()),
                BackendKind::Local,
            )
            .await
            .unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].answer, "The capital of France.");
    }

    #[tokio::test]
    async fn ocr_accuracy_scores_extracted_text_against_reference() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("transcript.txt");
        std::fs::write(&path, "the quick brown fox").unwrap();

        let pipeline = pipeline(Box::new(EchoBackend));
        let report = pipeline
            .evaluate_ocr_accuracy(&path, "the quick brown fox")
            .await
            .unwrap();
        assert_eq!(report.accuracy, 100.0);
        assert_eq!(report.extracted_text, "the quick brown fox");
    }

    #[tokio::test]
    async fn folder_ingest_replaces_the_index_in_one_batch() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.md"), "Paris is the capital of France.").unwrap();
        std::fs::write(dir.path().join("b.md"), "Berlin is the capital of Germany.").unwrap();

        let pipeline = pipeline(Box::new(EchoBackend));
        let report = pipeline.ingest_folder(dir.path()).await.unwrap();

        assert_eq!(report.chunks_indexed, 2);
        assert_eq!(report.documents.len(), 2);
        assert!(report.skipped.is_empty());

        let result = pipeline
            .query("capital of Germany?", BackendKind::Local)
            .await
            .unwrap();
        assert!(result.sources.contains(&"b.md".to_string()));
    }

    #[test]
    fn fit_to_length_is_exact_in_both_directions() {
        assert_eq!(fit_to_length("abc", 5), "abc  ");
        assert_eq!(fit_to_length("abcdef", 4), "abcd");
        assert_eq!(fit_to_length("", 3), "   ");
        assert_eq!(fit_to_length("exact", 5), "exact");
    }
}
