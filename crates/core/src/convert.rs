//! HTTP client for a document-to-PDF conversion service.
//!
//! Office documents, images, and plain text that need a visual render are
//! posted as base64 JSON and come back as PDF bytes, which then flow through
//! the normal PDF extraction or OCR path.

use crate::error::IngestError;
use crate::traits::PdfConverter;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct ConvertConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
}

impl ConvertConfig {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key,
        }
    }
}

pub struct HttpPdfConverter {
    config: ConvertConfig,
    client: Client,
}

impl HttpPdfConverter {
    pub fn new(config: ConvertConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ConvertRequest {
    file_base64: String,
    file_name: String,
}

#[derive(Debug, Deserialize)]
struct ConvertResponse {
    pdf_base64: Option<String>,
}

#[async_trait]
impl PdfConverter for HttpPdfConverter {
    async fn to_pdf(&self, path: &Path) -> Result<Vec<u8>, IngestError> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| IngestError::MissingFileName(path.display().to_string()))?
            .to_string();

        let bytes = tokio::fs::read(path).await?;
        let payload = ConvertRequest {
            file_base64: STANDARD.encode(bytes),
            file_name,
        };

        let mut request = self
            .client
            .post(&self.config.endpoint)
            .header("content-type", "application/json")
            .json(&payload);
        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(IngestError::Conversion(format!(
                "conversion endpoint returned {}",
                response.status()
            )));
        }

        let body: ConvertResponse = response.json().await?;
        let encoded = body.pdf_base64.unwrap_or_default();
        if encoded.is_empty() {
            return Err(IngestError::Conversion(format!(
                "conversion response had no pdf for {}",
                path.display()
            )));
        }

        STANDARD
            .decode(encoded.as_bytes())
            .map_err(|error| IngestError::Conversion(format!("invalid pdf payload: {error}")))
    }
}

#[cfg(test)]
mod tests {
    use super::ConvertResponse;

    #[test]
    fn response_tolerates_missing_pdf_field() {
        let body: ConvertResponse = serde_json::from_str("{}").unwrap();
        assert!(body.pdf_base64.is_none());
    }

    #[test]
    fn response_parses_pdf_field() {
        let body: ConvertResponse =
            serde_json::from_str(r#"{"pdf_base64":"JVBERi0="}"#).unwrap();
        assert_eq!(body.pdf_base64.as_deref(), Some("JVBERi0="));
    }
}
