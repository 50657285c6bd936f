use crate::error::{IngestError, PipelineError};
use crate::models::{Chunk, ScoredChunk};
use async_trait::async_trait;
use std::path::Path;

/// Collection-scoped vector storage. A reindex fully replaces the previous
/// document set; queries against an uninitialized collection return an empty
/// result rather than an error.
#[async_trait]
pub trait VectorIndex {
    async fn reindex(
        &self,
        chunks: &[Chunk],
        embeddings: &[Vec<f32>],
    ) -> Result<(), PipelineError>;

    async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, PipelineError>;
}

/// Optical character recognition over a PDF or image file on disk.
#[async_trait]
pub trait OcrEngine {
    async fn recognize(&self, path: &Path) -> Result<String, IngestError>;
}

/// Renders an office document, image, or text file as a PDF.
#[async_trait]
pub trait PdfConverter {
    async fn to_pdf(&self, path: &Path) -> Result<Vec<u8>, IngestError>;
}

/// A text-generation backend: free-text prompt in, free text out.
#[async_trait]
pub trait GenerationBackend {
    fn name(&self) -> &'static str;

    async fn generate(&self, prompt: &str) -> Result<String, PipelineError>;
}
