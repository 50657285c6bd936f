//! Chroma vector store over its HTTP API.
//!
//! Each reindex writes into a freshly named generation collection
//! (`{name}-gen-{marker}`, marker monotonic) and then repoints the
//! active-collection handle, so a query racing a reindex sees either the
//! previous document set or the new one, never a delete-then-insert window.
//! A fresh process recovers the active generation by listing collections
//! and picking the newest marker under the logical name, so the indexed
//! set survives across CLI invocations. Retired generations are dropped
//! afterwards on a best-effort basis; a leftover generation is older than
//! the active one and never resolved.

use crate::error::PipelineError;
use crate::models::{Chunk, ScoredChunk};
use crate::traits::VectorIndex;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use url::Url;

#[derive(Debug, Clone)]
pub struct ChromaConfig {
    pub endpoint: String,
    pub collection: String,
}

impl ChromaConfig {
    pub fn new(
        endpoint: impl Into<String>,
        collection: impl Into<String>,
    ) -> Result<Self, PipelineError> {
        let endpoint = endpoint.into();
        Url::parse(&endpoint)?;
        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            collection: collection.into(),
        })
    }
}

#[derive(Debug, Clone)]
struct ActiveCollection {
    name: String,
    id: String,
}

pub struct ChromaStore {
    config: ChromaConfig,
    client: Client,
    active: RwLock<Option<ActiveCollection>>,
}

/// The ordering marker embedded in a generation name, if the name belongs
/// to the given logical collection.
fn generation_ordinal(name: &str, prefix: &str) -> Option<i64> {
    name.strip_prefix(prefix)?.parse().ok()
}

impl ChromaStore {
    pub fn new(config: ChromaConfig) -> Self {
        Self {
            config,
            client: Client::new(),
            active: RwLock::new(None),
        }
    }

    fn collections_url(&self) -> String {
        format!("{}/api/v1/collections", self.config.endpoint)
    }

    fn generation_prefix(&self) -> String {
        format!("{}-gen-", self.config.collection)
    }

    async fn create_collection(&self, name: &str) -> Result<String, PipelineError> {
        let response = self
            .client
            .post(self.collections_url())
            .json(&json!({ "name": name, "get_or_create": true }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PipelineError::Storage(format!(
                "collection create returned {}",
                response.status()
            )));
        }

        let body: Value = response.json().await?;
        body.pointer("/id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                PipelineError::Storage("collection create response had no id".to_string())
            })
    }

    async fn drop_collection(&self, name: &str) -> Result<(), PipelineError> {
        let response = self
            .client
            .delete(format!("{}/{}", self.collections_url(), name))
            .send()
            .await?;

        if !response.status().is_success() && response.status().as_u16() != 404 {
            return Err(PipelineError::Storage(format!(
                "collection delete returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn list_collections(&self) -> Result<Vec<(String, String)>, PipelineError> {
        let response = self.client.get(self.collections_url()).send().await?;
        if !response.status().is_success() {
            return Err(PipelineError::Storage(format!(
                "collection list returned {}",
                response.status()
            )));
        }

        let body: Value = response.json().await?;
        let collections = body.as_array().cloned().unwrap_or_default();
        Ok(collections
            .iter()
            .filter_map(|collection| {
                let name = collection.pointer("/name").and_then(Value::as_str)?;
                let id = collection.pointer("/id").and_then(Value::as_str)?;
                Some((name.to_string(), id.to_string()))
            })
            .collect())
    }

    /// The newest generation under the logical collection name, written by
    /// this or any earlier process.
    async fn newest_generation(&self) -> Result<Option<ActiveCollection>, PipelineError> {
        let prefix = self.generation_prefix();
        let mut newest: Option<(i64, ActiveCollection)> = None;

        for (name, id) in self.list_collections().await? {
            if let Some(ordinal) = generation_ordinal(&name, &prefix) {
                if newest.as_ref().map_or(true, |(best, _)| ordinal > *best) {
                    newest = Some((ordinal, ActiveCollection { name, id }));
                }
            }
        }

        Ok(newest.map(|(_, active)| active))
    }

    /// The in-memory handle when set, otherwise the newest generation on
    /// the server (a fresh process recovering the previous ingest).
    async fn resolve_active(&self) -> Result<Option<ActiveCollection>, PipelineError> {
        if let Some(active) = self.active.read().await.clone() {
            return Ok(Some(active));
        }

        let recovered = self.newest_generation().await?;
        if let Some(recovered) = &recovered {
            let mut guard = self.active.write().await;
            if guard.is_none() {
                *guard = Some(recovered.clone());
            }
        }
        Ok(recovered)
    }
}

/// Flattens Chroma's parallel-array query response into scored hits.
/// Chroma reports distances (lower is closer); they are flipped into a
/// similarity so callers sort one way across stores.
fn hits_from_response(body: &Value) -> Vec<ScoredChunk> {
    let ids = body
        .pointer("/ids/0")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let documents = body
        .pointer("/documents/0")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let metadatas = body
        .pointer("/metadatas/0")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let distances = body
        .pointer("/distances/0")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut hits = Vec::new();
    for (position, id) in ids.iter().enumerate() {
        let id = id.as_str().unwrap_or_default().to_string();
        let text = documents
            .get(position)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let source = metadatas
            .get(position)
            .and_then(|metadata| metadata.pointer("/source"))
            .and_then(Value::as_str)
            .unwrap_or("Unknown")
            .to_string();
        let distance = distances
            .get(position)
            .and_then(Value::as_f64)
            .unwrap_or(0.0);

        hits.push(ScoredChunk {
            id,
            text,
            source,
            score: 1.0 - distance,
        });
    }

    hits
}

#[async_trait]
impl VectorIndex for ChromaStore {
    async fn reindex(
        &self,
        chunks: &[Chunk],
        embeddings: &[Vec<f32>],
    ) -> Result<(), PipelineError> {
        if chunks.len() != embeddings.len() {
            return Err(PipelineError::Storage(format!(
                "embedding count {} does not match chunk count {}",
                embeddings.len(),
                chunks.len()
            )));
        }

        // reindexes are externally serialized, so a microsecond marker is
        // enough to order generations across processes
        let ordinal = Utc::now().timestamp_micros();
        let generation = format!("{}{ordinal}", self.generation_prefix());
        let collection_id = self.create_collection(&generation).await?;

        if !chunks.is_empty() {
            let ids: Vec<&str> = chunks.iter().map(|chunk| chunk.id.as_str()).collect();
            let documents: Vec<&str> = chunks.iter().map(|chunk| chunk.text.as_str()).collect();
            let metadatas: Vec<Value> = chunks
                .iter()
                .map(|chunk| {
                    json!({
                        "source": chunk.source,
                        "start_offset": chunk.start_offset,
                    })
                })
                .collect();

            let response = self
                .client
                .post(format!("{}/{}/add", self.collections_url(), collection_id))
                .json(&json!({
                    "ids": ids,
                    "embeddings": embeddings,
                    "metadatas": metadatas,
                    "documents": documents,
                }))
                .send()
                .await?;

            if !response.status().is_success() {
                // the half-written generation was never repointed to; drop
                // it so recovery cannot resolve it
                let _ = self.drop_collection(&generation).await;
                return Err(PipelineError::Storage(format!(
                    "chunk insert returned {}",
                    response.status()
                )));
            }
        }

        let previous = self.active.write().await.replace(ActiveCollection {
            name: generation,
            id: collection_id,
        });

        if let Some(previous) = &previous {
            let _ = self.drop_collection(&previous.name).await;
        }

        // sweep generations older than the one just activated, including
        // ones left behind by earlier processes
        if let Ok(collections) = self.list_collections().await {
            let prefix = self.generation_prefix();
            for (name, _id) in collections {
                let already_dropped = previous
                    .as_ref()
                    .map_or(false, |previous| previous.name == name);
                let stale = generation_ordinal(&name, &prefix)
                    .map_or(false, |marker| marker < ordinal);
                if stale && !already_dropped {
                    let _ = self.drop_collection(&name).await;
                }
            }
        }

        Ok(())
    }

    async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, PipelineError> {
        let active = match self.resolve_active().await? {
            Some(active) => active,
            None => return Ok(Vec::new()),
        };

        let response = self
            .client
            .post(format!("{}/{}/query", self.collections_url(), active.id))
            .json(&json!({
                "query_embeddings": [embedding],
                "n_results": top_k,
                "include": ["documents", "metadatas", "distances"],
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PipelineError::Storage(format!(
                "query returned {}",
                response.status()
            )));
        }

        let body: Value = response.json().await?;
        Ok(hits_from_response(&body))
    }
}
