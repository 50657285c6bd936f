use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("ocr service failed: {0}")]
    OcrService(String),

    #[error("pdf conversion failed: {0}")]
    Conversion(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("path has no file name: {0}")]
    MissingFileName(String),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("no relevant results")]
    NoMatches,

    #[error("generation backend {backend} failed: {details}")]
    Backend { backend: String, details: String },

    #[error("vector store error: {0}")]
    Storage(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("query is empty")]
    EmptyQuery,
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
