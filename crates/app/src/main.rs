use chrono::Utc;
use clap::{Parser, Subcommand};
use doc_rag_core::{
    BackendKind, ChromaConfig, ChromaStore, ChunkingOptions, ConvertConfig, DocumentNormalizer,
    GenerationRouter, HashedNgramEmbedder, HostedBackend, HttpPdfConverter, LocalBackendConfig,
    OcrConfig, OcrSpaceClient, OllamaBackend, PipelineOptions, QuestionSource, RagPipeline,
    RemoteBackendConfig, RetrievalOptions,
};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "doc-rag", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Chroma server base URL
    #[arg(long, default_value = "http://localhost:8000")]
    chroma_url: String,

    /// Logical collection name for the current document set
    #[arg(long, default_value = "documents")]
    collection: String,

    /// OCR service endpoint
    #[arg(long, default_value = "https://api.ocr.space/parse/image")]
    ocr_endpoint: String,

    /// OCR service API key
    #[arg(long, env = "OCR_API_KEY", default_value = "")]
    ocr_api_key: String,

    /// OCR engine variant (2 handles handwriting better)
    #[arg(long, default_value = "2")]
    ocr_engine: u8,

    /// Document-to-PDF conversion endpoint
    #[arg(long, env = "CONVERT_ENDPOINT", default_value = "http://localhost:3000/convert")]
    convert_endpoint: String,

    /// Optional bearer credential for the conversion endpoint
    #[arg(long, env = "CONVERT_API_KEY")]
    convert_api_key: Option<String>,

    /// Local inference server base URL
    #[arg(long, default_value = "http://localhost:11434")]
    local_llm_url: String,

    /// Model name on the local inference server
    #[arg(long, default_value = "llama3")]
    local_llm_model: String,

    /// Remote generation API base URL
    #[arg(long, default_value = "https://api.openai.com/v1")]
    remote_llm_url: String,

    /// Bearer credential for the remote generation API
    #[arg(long, env = "REMOTE_LLM_API_KEY")]
    remote_llm_api_key: Option<String>,

    /// Fixed model identifier on the remote API
    #[arg(long, default_value = "gpt-4o-mini")]
    remote_llm_model: String,

    /// Chunk window in characters
    #[arg(long, default_value = "300")]
    chunk_window: usize,

    /// Chunk overlap in characters
    #[arg(long, default_value = "100")]
    chunk_overlap: usize,

    /// Number of passages retrieved per query
    #[arg(long, default_value = "3")]
    top_k: usize,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest one document, or every supported document under a folder,
    /// fully replacing the indexed set.
    Ingest {
        /// File or folder to ingest.
        #[arg(long)]
        path: PathBuf,
    },
    /// Answer a question from the indexed documents.
    Query {
        /// The question text.
        #[arg(long)]
        query: String,
        /// Generation backend: local or remote.
        #[arg(long, default_value = "remote")]
        backend: BackendKind,
    },
    /// Summarize a document.
    Summarize {
        #[arg(long)]
        path: PathBuf,
        #[arg(long, default_value = "remote")]
        backend: BackendKind,
    },
    /// Expand a document, optionally to an exact character count.
    Expand {
        #[arg(long)]
        path: PathBuf,
        #[arg(long, default_value = "remote")]
        backend: BackendKind,
        /// Exact output length in characters (truncated or space-padded).
        #[arg(long)]
        length: Option<usize>,
    },
    /// Generate question/answer pairs from a document or raw text.
    Questions {
        #[arg(long, conflicts_with = "text")]
        path: Option<PathBuf>,
        #[arg(long)]
        text: Option<String>,
        #[arg(long, default_value = "remote")]
        backend: BackendKind,
    },
    /// Score extracted text against a reference transcript.
    OcrEval {
        #[arg(long)]
        path: PathBuf,
        /// Reference transcript given inline.
        #[arg(long, conflicts_with = "reference_file")]
        reference: Option<String>,
        /// Reference transcript read from a file.
        #[arg(long)]
        reference_file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    let normalizer = DocumentNormalizer::new(
        Box::new(OcrSpaceClient::new(OcrConfig {
            endpoint: cli.ocr_endpoint.clone(),
            api_key: cli.ocr_api_key.clone(),
            engine: cli.ocr_engine,
        })),
        Box::new(HttpPdfConverter::new(ConvertConfig::new(
            cli.convert_endpoint.clone(),
            cli.convert_api_key.clone(),
        ))),
    );

    let store = ChromaStore::new(ChromaConfig::new(&cli.chroma_url, &cli.collection)?);

    let mut router = GenerationRouter::new().with_backend(
        BackendKind::Local,
        Box::new(OllamaBackend::new(LocalBackendConfig::new(
            &cli.local_llm_url,
            &cli.local_llm_model,
        )?)),
    );
    match &cli.remote_llm_api_key {
        Some(api_key) if !api_key.trim().is_empty() => {
            router = router.with_backend(
                BackendKind::Remote,
                Box::new(HostedBackend::new(RemoteBackendConfig::new(
                    &cli.remote_llm_url,
                    api_key,
                    &cli.remote_llm_model,
                )?)),
            );
        }
        _ => warn!("no remote API key configured; remote backend unavailable"),
    }

    let pipeline = RagPipeline::new(
        normalizer,
        store,
        HashedNgramEmbedder::default(),
        router,
        PipelineOptions {
            chunking: ChunkingOptions {
                window_chars: cli.chunk_window,
                overlap_chars: cli.chunk_overlap,
            },
            retrieval: RetrievalOptions { top_k: cli.top_k },
        },
    );

    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        "doc-rag boot"
    );

    match cli.command {
        Command::Ingest { path } => {
            if path.is_dir() {
                let report = pipeline.ingest_folder(&path).await?;
                for skipped in &report.skipped {
                    warn!(path = %skipped.path.display(), reason = %skipped.reason, "skipped document");
                }
                println!(
                    "{} chunks indexed from {} document(s) at {}",
                    report.chunks_indexed,
                    report.documents.len(),
                    Utc::now().to_rfc3339()
                );
            } else {
                let outcome = pipeline.ingest(&path).await?;
                println!(
                    "{} chunks indexed from {} (sha256 {})",
                    outcome.chunks_indexed, outcome.fingerprint.source, outcome.fingerprint.checksum
                );
            }
        }
        Command::Query { query, backend } => {
            let outcome = pipeline.query(&query, backend).await?;
            println!("{}", outcome.answer);
            println!("sources: {}", outcome.sources.join(", "));
        }
        Command::Summarize { path, backend } => {
            let summary = pipeline.summarize(&path, backend).await?;
            println!("{summary}");
        }
        Command::Expand {
            path,
            backend,
            length,
        } => {
            let expanded = pipeline.expand(&path, backend, length).await?;
            println!("{expanded}");
        }
        Command::Questions {
            path,
            text,
            backend,
        } => {
            let source = match (path, text) {
                (Some(path), _) => QuestionSource::File(path),
                (None, Some(text)) => QuestionSource::RawText(text),
                (None, None) => anyhow::bail!("either --path or --text is required"),
            };

            let questions = pipeline.generate_questions(source, backend).await?;
            println!("{}", serde_json::to_string_pretty(&questions)?);
        }
        Command::OcrEval {
            path,
            reference,
            reference_file,
        } => {
            let reference = match (reference, reference_file) {
                (Some(reference), _) => reference,
                (None, Some(file)) => tokio::fs::read_to_string(file).await?,
                (None, None) => anyhow::bail!("either --reference or --reference-file is required"),
            };

            let report = pipeline.evaluate_ocr_accuracy(&path, &reference).await?;
            println!("accuracy: {:.2}%", report.accuracy);
            println!("extracted text:\n{}", report.extracted_text);
        }
    }

    Ok(())
}
