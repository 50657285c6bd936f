//! Format-agnostic document ingestion and retrieval-augmented generation.
//!
//! Documents (Markdown, plain text, PDF, scans, images, office files) are
//! normalized to plain text, chunked with a fixed overlapping window,
//! embedded, and indexed in a vector store. Queries are answered by
//! nearest-neighbor retrieval wrapped in a grounded prompt and dispatched
//! to a local or remote generation backend.

pub mod accuracy;
pub mod chunking;
pub mod convert;
pub mod embeddings;
pub mod error;
pub mod generation;
pub mod ingest;
pub mod models;
pub mod normalizer;
pub mod ocr;
pub mod orchestrator;
pub mod retriever;
pub mod stores;
pub mod traits;

pub use accuracy::{levenshtein, levenshtein_accuracy};
pub use chunking::{chunk_document, chunk_documents};
pub use convert::{ConvertConfig, HttpPdfConverter};
pub use embeddings::{Embedder, HashedNgramEmbedder, DEFAULT_EMBEDDING_DIMENSIONS};
pub use error::{IngestError, PipelineError, Result};
pub use generation::{
    parse_question_list, GenerationRouter, HostedBackend, LocalBackendConfig, OllamaBackend,
    RemoteBackendConfig,
};
pub use ingest::{discover_documents, normalize_folder_best_effort, NormalizedBatch, SkippedDocument};
pub use models::{
    BackendKind, Chunk, ChunkingOptions, DocumentFingerprint, NormalizedText, QuestionAnswer,
    QuestionSource, RetrievalOptions, RetrievalResult, ScoredChunk,
};
pub use normalizer::{extract_pdf_text, DocumentNormalizer};
pub use ocr::{OcrConfig, OcrSpaceClient};
pub use orchestrator::{
    IngestOutcome, IngestReport, OcrAccuracyReport, PipelineOptions, QueryOutcome, RagPipeline,
};
pub use retriever::{build_grounded_prompt, retrieve};
pub use stores::{ChromaConfig, ChromaStore, MemoryStore};
pub use traits::{GenerationBackend, OcrEngine, PdfConverter, VectorIndex};
