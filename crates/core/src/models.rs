use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::IngestError;

/// Plain text extracted from one input document, regardless of its
/// original format. Page boundaries are not preserved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedText {
    pub text: String,
    pub source: String,
}

/// A bounded, overlapping slice of normalized document text. The id is
/// sequential within one ingestion batch; the full-replace reindex policy
/// keeps that sufficient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub source: String,
    pub start_offset: usize,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentFingerprint {
    pub source: String,
    pub checksum: String,
    pub ingested_at: DateTime<Utc>,
}

/// One nearest-neighbor hit returned by a vector store. Higher score means
/// more similar, whatever the store's native distance metric is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub id: String,
    pub text: String,
    pub source: String,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub context_texts: Vec<String>,
    pub sources: Vec<String>,
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionAnswer {
    pub question: String,
    pub answer: String,
}

/// Which generation backend a request should be routed to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    Local,
    #[default]
    Remote,
}

impl BackendKind {
    pub fn label(&self) -> &'static str {
        match self {
            BackendKind::Local => "local",
            BackendKind::Remote => "remote",
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "local" => Ok(BackendKind::Local),
            "remote" => Ok(BackendKind::Remote),
            other => Err(format!("unknown backend '{other}' (expected local or remote)")),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ChunkingOptions {
    pub window_chars: usize,
    pub overlap_chars: usize,
}

impl Default for ChunkingOptions {
    fn default() -> Self {
        Self {
            window_chars: 300,
            overlap_chars: 100,
        }
    }
}

impl ChunkingOptions {
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.window_chars == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "window must be at least 1 character".to_string(),
            ));
        }
        if self.overlap_chars >= self.window_chars {
            return Err(IngestError::InvalidChunkConfig(format!(
                "overlap {} must be smaller than window {}",
                self.overlap_chars, self.window_chars
            )));
        }
        Ok(())
    }

    pub fn step(&self) -> usize {
        self.window_chars - self.overlap_chars
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetrievalOptions {
    pub top_k: usize,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self { top_k: 3 }
    }
}

/// Input for question generation: either a document to normalize first or
/// raw text supplied directly.
#[derive(Debug, Clone)]
pub enum QuestionSource {
    File(PathBuf),
    RawText(String),
}
