//! Format-agnostic document normalization.
//!
//! Every supported input collapses to one plain-text blob per document:
//! Markdown and plain text are read verbatim, born-digital PDFs go through
//! per-page extraction, scans fall back to OCR, and office documents or
//! images are first rendered as PDF by the conversion capability.

use crate::error::IngestError;
use crate::models::NormalizedText;
use crate::traits::{OcrEngine, PdfConverter};
use lopdf::Document as PdfDocument;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

pub const TEXT_EXTENSIONS: [&str; 3] = ["md", "markdown", "txt"];
pub const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];
pub const OFFICE_EXTENSIONS: [&str; 3] = ["doc", "docx", "odt"];

pub fn is_supported(path: &Path) -> bool {
    match extension_of(path) {
        Some(extension) => {
            extension == "pdf"
                || TEXT_EXTENSIONS.contains(&extension.as_str())
                || IMAGE_EXTENSIONS.contains(&extension.as_str())
                || OFFICE_EXTENSIONS.contains(&extension.as_str())
        }
        None => false,
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|extension| extension.to_str())
        .map(|extension| extension.to_ascii_lowercase())
}

fn file_name_of(path: &Path) -> Result<String, IngestError> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.to_string())
        .ok_or_else(|| IngestError::MissingFileName(path.display().to_string()))
}

/// Per-page text extraction from a born-digital PDF, concatenated in page
/// order.
pub fn extract_pdf_text(path: &Path) -> Result<String, IngestError> {
    let document =
        PdfDocument::load(path).map_err(|error| IngestError::PdfParse(error.to_string()))?;

    let mut text = String::new();
    for (page_number, _page_id) in document.get_pages() {
        let page_text = document
            .extract_text(&[page_number])
            .map_err(|error| IngestError::PdfParse(error.to_string()))?;
        text.push_str(&page_text);
        if !page_text.ends_with('\n') {
            text.push('\n');
        }
    }

    Ok(text)
}

pub struct DocumentNormalizer {
    ocr: Box<dyn OcrEngine + Send + Sync>,
    converter: Box<dyn PdfConverter + Send + Sync>,
}

impl DocumentNormalizer {
    pub fn new(
        ocr: Box<dyn OcrEngine + Send + Sync>,
        converter: Box<dyn PdfConverter + Send + Sync>,
    ) -> Self {
        Self { ocr, converter }
    }

    pub async fn normalize(&self, path: &Path) -> Result<NormalizedText, IngestError> {
        let source = file_name_of(path)?;
        let extension = extension_of(path).unwrap_or_default();

        let text = if TEXT_EXTENSIONS.contains(&extension.as_str()) {
            let bytes = tokio::fs::read(path).await?;
            String::from_utf8_lossy(&bytes).into_owned()
        } else if extension == "pdf" {
            self.pdf_text(path).await?
        } else if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            // images carry no text layer at all, so the rendered PDF goes
            // straight to OCR
            let staged = self.stage_as_pdf(path).await?;
            self.ocr.recognize(staged.path()).await?
        } else if OFFICE_EXTENSIONS.contains(&extension.as_str()) {
            let staged = self.stage_as_pdf(path).await?;
            extract_pdf_text(staged.path())?
        } else {
            return Err(IngestError::UnsupportedFormat(source));
        };

        Ok(NormalizedText { text, source })
    }

    /// Direct extraction first; a PDF without a readable text layer is
    /// treated as a scan and handed to the OCR capability.
    async fn pdf_text(&self, path: &Path) -> Result<String, IngestError> {
        match extract_pdf_text(path) {
            Ok(text) if !text.trim().is_empty() => Ok(text),
            Ok(_) | Err(IngestError::PdfParse(_)) => self.ocr.recognize(path).await,
            Err(error) => Err(error),
        }
    }

    /// Converted PDFs live in a scoped temp file that is removed on drop,
    /// on every exit path.
    async fn stage_as_pdf(&self, path: &Path) -> Result<NamedTempFile, IngestError> {
        let pdf = self.converter.to_pdf(path).await?;
        let mut staged = NamedTempFile::new()?;
        staged.write_all(&pdf)?;
        staged.flush()?;
        Ok(staged)
    }
}
