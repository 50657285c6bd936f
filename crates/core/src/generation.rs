//! Generation dispatch across interchangeable LLM backends.
//!
//! Two variants ship: a local Ollama-style server reached over a
//! local-only channel, and a remote OpenAI-compatible API reached with a
//! bearer credential. Both take one free-text prompt and are normalized to
//! one plain reply string. No retries, no cross-backend fallback; a failed
//! call fails the whole operation.

use crate::error::PipelineError;
use crate::models::{BackendKind, QuestionAnswer};
use crate::traits::GenerationBackend;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::collections::HashMap;
use url::Url;

#[derive(Debug, Clone)]
pub struct LocalBackendConfig {
    pub endpoint: String,
    pub model: String,
}

impl LocalBackendConfig {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, PipelineError> {
        let endpoint = endpoint.into();
        Url::parse(&endpoint)?;
        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct RemoteBackendConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
}

impl RemoteBackendConfig {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, PipelineError> {
        let endpoint = endpoint.into();
        Url::parse(&endpoint)?;
        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }
}

fn backend_failure(backend: &str, details: impl Into<String>) -> PipelineError {
    PipelineError::Backend {
        backend: backend.to_string(),
        details: details.into(),
    }
}

/// Ollama chat endpoint on the same host; no network egress.
pub struct OllamaBackend {
    config: LocalBackendConfig,
    client: Client,
}

impl OllamaBackend {
    pub fn new(config: LocalBackendConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl GenerationBackend for OllamaBackend {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn generate(&self, prompt: &str) -> Result<String, PipelineError> {
        let response = self
            .client
            .post(format!("{}/api/chat", self.config.endpoint))
            .json(&json!({
                "model": self.config.model,
                "messages": [{ "role": "user", "content": prompt }],
                "stream": false,
            }))
            .send()
            .await
            .map_err(|error| backend_failure(self.name(), error.to_string()))?;

        if !response.status().is_success() {
            return Err(backend_failure(
                self.name(),
                format!("returned {}", response.status()),
            ));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|error| backend_failure(self.name(), error.to_string()))?;
        body.pointer("/message/content")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| backend_failure(self.name(), "response had no message content"))
    }
}

/// Remote OpenAI-compatible chat-completions API with a bearer credential
/// and a fixed model identifier.
pub struct HostedBackend {
    config: RemoteBackendConfig,
    client: Client,
}

impl HostedBackend {
    pub fn new(config: RemoteBackendConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl GenerationBackend for HostedBackend {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn generate(&self, prompt: &str) -> Result<String, PipelineError> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.endpoint))
            .bearer_auth(&self.config.api_key)
            .json(&json!({
                "model": self.config.model,
                "messages": [{ "role": "user", "content": prompt }],
            }))
            .send()
            .await
            .map_err(|error| backend_failure(self.name(), error.to_string()))?;

        if !response.status().is_success() {
            return Err(backend_failure(
                self.name(),
                format!("returned {}", response.status()),
            ));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|error| backend_failure(self.name(), error.to_string()))?;
        body.pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| backend_failure(self.name(), "response had no completion text"))
    }
}

/// Maps a per-request selector to a registered backend. Adding a variant
/// means registering it here; call sites stay untouched.
#[derive(Default)]
pub struct GenerationRouter {
    backends: HashMap<BackendKind, Box<dyn GenerationBackend + Send + Sync>>,
}

impl GenerationRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backend(
        mut self,
        kind: BackendKind,
        backend: Box<dyn GenerationBackend + Send + Sync>,
    ) -> Self {
        self.backends.insert(kind, backend);
        self
    }

    pub async fn generate(
        &self,
        prompt: &str,
        kind: BackendKind,
    ) -> Result<String, PipelineError> {
        let backend = self.backends.get(&kind).ok_or_else(|| {
            backend_failure(kind.label(), "no backend registered for this selector")
        })?;
        backend.generate(prompt).await
    }
}

/// Best-effort parse of generator output expected to be a JSON array of
/// `{question, answer}` objects. Generators often wrap the array in prose
/// or a code fence, so a bracket-slice salvage runs before giving up.
/// Malformed output degrades to an empty list by contract.
pub fn parse_question_list(raw: &str) -> Vec<QuestionAnswer> {
    let trimmed = raw.trim();
    if let Ok(list) = serde_json::from_str::<Vec<QuestionAnswer>>(trimmed) {
        return list;
    }

    if let (Some(start), Some(end)) = (trimmed.find('['), trimmed.rfind(']')) {
        if start < end {
            if let Ok(list) = serde_json::from_str::<Vec<QuestionAnswer>>(&trimmed[start..=end]) {
                return list;
            }
        }
    }

    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::{parse_question_list, GenerationRouter};
    use crate::error::PipelineError;
    use crate::models::BackendKind;
    use crate::traits::GenerationBackend;
    use async_trait::async_trait;

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

    #[tokio::test]
    async fn router_passes_prompt_through_unchanged() {
        let router = GenerationRouter::new().with_backend(BackendKind::Local, Box::new(EchoBackend));
        let reply = router
            .generate("verbatim payload, no mutation", BackendKind::Local)
            .await
            .unwrap();
        assert_eq!(reply, "verbatim payload, no mutation");
    }

    #[tokio::test]
    async fn unregistered_selector_is_a_backend_error() {
        let router = GenerationRouter::new();
        let result = router.generate("hello", BackendKind::Remote).await;
        assert!(matches!(result, Err(PipelineError::Backend { .. })));
    }

    #[test]
    fn clean_json_array_parses() {
        let parsed = parse_question_list(
            r#"[{"question":"Q1?","answer":"A1"},{"question":"Q2?","answer":"A2"}]"#,
        );
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].question, "Q1?");
        assert_eq!(parsed[1].answer, "A2");
    }

    #[test]
    fn fenced_json_array_is_salvaged() {
        let parsed = parse_question_list(
            "Here you go:\n```json\n[{\"question\":\"Q?\",\"answer\":\"A\"}]\n```",
        );
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn non_json_output_degrades_to_empty_list() {
        assert!(parse_question_list("Sorry, I cannot help with that.").is_empty());
        assert!(parse_question_list("").is_empty());
        assert!(parse_question_list("[not valid json]").is_empty());
    }
}
