use crate::error::IngestError;
use crate::models::{DocumentFingerprint, NormalizedText};
use crate::normalizer::{is_supported, DocumentNormalizer};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Recursively collects every supported document under a folder, sorted
/// for deterministic ingestion order.
pub fn discover_documents(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if entry.file_type().is_file() && is_supported(entry.path()) {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

pub fn digest_file(path: &Path) -> Result<String, IngestError> {
    let bytes = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

pub fn fingerprint(path: &Path) -> Result<DocumentFingerprint, IngestError> {
    let source = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| IngestError::MissingFileName(path.display().to_string()))?;

    Ok(DocumentFingerprint {
        source: source.to_string(),
        checksum: digest_file(path)?,
        ingested_at: Utc::now(),
    })
}

pub struct SkippedDocument {
    pub path: PathBuf,
    pub reason: String,
}

pub struct NormalizedBatch {
    pub documents: Vec<NormalizedText>,
    pub fingerprints: Vec<DocumentFingerprint>,
    pub skipped: Vec<SkippedDocument>,
}

/// Normalizes every supported document under a folder, skipping files
/// that fail instead of aborting the batch.
pub async fn normalize_folder_best_effort(
    normalizer: &DocumentNormalizer,
    folder: &Path,
) -> Result<NormalizedBatch, IngestError> {
    let files = discover_documents(folder);
    if files.is_empty() {
        return Err(IngestError::InvalidArgument(format!(
            "no supported documents found in {}",
            folder.display()
        )));
    }

    let mut documents = Vec::new();
    let mut fingerprints = Vec::new();
    let mut skipped = Vec::new();

    for path in files {
        let outcome = async {
            let document = normalizer.normalize(&path).await?;
            let fingerprint = fingerprint(&path)?;
            Ok::<_, IngestError>((document, fingerprint))
        }
        .await;

        match outcome {
            Ok((document, fingerprint)) => {
                documents.push(document);
                fingerprints.push(fingerprint);
            }
            Err(error) => skipped.push(SkippedDocument {
                path,
                reason: error.to_string(),
            }),
        }
    }

    Ok(NormalizedBatch {
        documents,
        fingerprints,
        skipped,
    })
}
