//! Client for an OCR.space-compatible recognition endpoint.
//!
//! The service takes a base64-encoded PDF or image and returns parsed text.
//! Requests are configured for English, automatic orientation detection, no
//! table detection, and a selectable engine variant (engine 2 handles
//! handwriting better).

use crate::error::IngestError;
use crate::traits::OcrEngine;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub endpoint: String,
    pub api_key: String,
    pub engine: u8,
}

pub struct OcrSpaceClient {
    config: OcrConfig,
    client: Client,
}

impl OcrSpaceClient {
    pub fn new(config: OcrConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OcrEnvelope {
    #[serde(default)]
    parsed_results: Option<Vec<OcrParsedResult>>,
    #[serde(default)]
    is_errored_on_processing: bool,
    #[serde(default)]
    error_message: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OcrParsedResult {
    #[serde(default)]
    parsed_text: Option<String>,
}

fn parsed_text(envelope: OcrEnvelope, path: &Path) -> Result<String, IngestError> {
    if envelope.is_errored_on_processing {
        let details = envelope
            .error_message
            .map(|message| message.to_string())
            .unwrap_or_else(|| "unknown error".to_string());
        return Err(IngestError::OcrService(details));
    }

    envelope
        .parsed_results
        .and_then(|results| results.into_iter().next())
        .and_then(|result| result.parsed_text)
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| {
            IngestError::OcrService(format!("no parsed text for {}", path.display()))
        })
}

fn file_kind(path: &Path) -> (&'static str, &'static str) {
    let extension = path
        .extension()
        .and_then(|extension| extension.to_str())
        .map(|extension| extension.to_ascii_lowercase());

    match extension.as_deref() {
        Some("png") => ("PNG", "image/png"),
        Some("jpg") | Some("jpeg") => ("JPG", "image/jpeg"),
        _ => ("PDF", "application/pdf"),
    }
}

#[async_trait]
impl OcrEngine for OcrSpaceClient {
    async fn recognize(&self, path: &Path) -> Result<String, IngestError> {
        if self.config.api_key.trim().is_empty() {
            return Err(IngestError::OcrService(
                "no OCR api key configured".to_string(),
            ));
        }

        let bytes = tokio::fs::read(path).await?;
        let (filetype, mime) = file_kind(path);
        let encoded = format!("data:{mime};base64,{}", STANDARD.encode(&bytes));
        let engine = self.config.engine.to_string();

        let form = [
            ("language", "eng"),
            ("detectOrientation", "true"),
            ("isTable", "false"),
            ("isOverlayRequired", "false"),
            ("scale", "true"),
            ("filetype", filetype),
            ("OCREngine", engine.as_str()),
            ("base64Image", encoded.as_str()),
        ];

        let response = self
            .client
            .post(&self.config.endpoint)
            .header("apikey", &self.config.api_key)
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(IngestError::OcrService(format!(
                "ocr endpoint returned {}",
                response.status()
            )));
        }

        let envelope: OcrEnvelope = response.json().await?;
        parsed_text(envelope, path)
    }
}
