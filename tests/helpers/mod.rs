#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use penpal::config::RetrievalConfig;
use penpal::embedding::{EmbeddingProvider, EMBEDDING_DIM};
use penpal::error::{GenerationError, StoreError};
use penpal::journal::KeyScheme;
use penpal::llm::LanguageModel;
use penpal::pipeline::{Pipeline, REFUSAL};
use penpal::store::sqlite::SqliteStore;
use penpal::store::{CollectionSpec, DistanceMetric, SearchResult, VectorRecord, VectorStore};

pub const COLLECTION: &str = "journal-entries";

pub fn collection_spec() -> CollectionSpec {
    CollectionSpec {
        name: COLLECTION.to_string(),
        dimension: EMBEDDING_DIM,
        metric: DistanceMetric::Cosine,
        cloud: "aws".to_string(),
        region: "us-east-1".to_string(),
    }
}

/// A fresh in-memory sqlite store with the test collection created.
pub async fn sqlite_store() -> Arc<SqliteStore> {
    let conn = penpal::db::open_in_memory().unwrap();
    let store = SqliteStore::from_connection(conn, COLLECTION);
    store.ensure_collection(&collection_spec()).await.unwrap();
    Arc::new(store)
}

/// Bag-of-words embedder: every distinct lowercase word gets its own dimension.
///
/// Texts that share no words are orthogonal, so similarity scores in tests are
/// exact and predictable.
#[derive(Default)]
pub struct VocabularyEmbedder {
    vocabulary: Mutex<HashMap<String, usize>>,
}

impl VocabularyEmbedder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl EmbeddingProvider for VocabularyEmbedder {
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let mut vocabulary = self.vocabulary.lock().unwrap();
        let mut v = vec![0.0f32; EMBEDDING_DIM];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let next = vocabulary.len();
            let slot = *vocabulary.entry(word.to_lowercase()).or_insert(next);
            v[slot % EMBEDDING_DIM] += 1.0;
        }
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        Ok(v)
    }
}

/// Embedder that always fails.
pub struct BrokenEmbedder;

impl EmbeddingProvider for BrokenEmbedder {
    fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
        anyhow::bail!("model not loaded")
    }
}

/// Brute-force cosine store kept in memory.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<VectorRecord>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn ids(&self) -> Vec<String> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.id.clone())
            .collect()
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn ensure_collection(&self, _spec: &CollectionSpec) -> Result<(), StoreError> {
        Ok(())
    }

    async fn upsert(&self, record: VectorRecord) -> Result<(), StoreError> {
        let mut records = self.records.lock().unwrap();
        records.retain(|r| r.id != record.id);
        records.push(record);
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<SearchResult>, StoreError> {
        let records = self.records.lock().unwrap();
        let mut results: Vec<SearchResult> = records
            .iter()
            .map(|r| SearchResult {
                id: r.id.clone(),
                text: r.text.clone(),
                score: cosine(vector, &r.values),
            })
            .collect();
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(top_k);
        Ok(results)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

/// Store whose every call fails like an unreachable service.
pub struct FailingStore;

#[async_trait]
impl VectorStore for FailingStore {
    async fn ensure_collection(&self, _spec: &CollectionSpec) -> Result<(), StoreError> {
        Err(unavailable())
    }

    async fn upsert(&self, _record: VectorRecord) -> Result<(), StoreError> {
        Err(unavailable())
    }

    async fn query(&self, _vector: &[f32], _top_k: usize) -> Result<Vec<SearchResult>, StoreError> {
        Err(unavailable())
    }

    fn backend(&self) -> &'static str {
        "failing"
    }
}

fn unavailable() -> StoreError {
    StoreError::Api {
        status: 503,
        message: "service unavailable".to_string(),
    }
}

/// One recorded model call.
#[derive(Debug, Clone)]
pub struct ModelCall {
    pub prompt: String,
    pub started: Instant,
    pub finished: Instant,
}

impl ModelCall {
    pub fn is_summary(&self) -> bool {
        self.prompt.contains("pre-processor")
    }

    /// The text after the last `Context: ` marker, up to the question.
    pub fn context(&self) -> &str {
        prompt_context(&self.prompt)
    }
}

fn prompt_context(prompt: &str) -> &str {
    let after = prompt
        .rsplit_once("\n\nContext: ")
        .map(|(_, rest)| rest)
        .unwrap_or_default();
    after
        .split_once("\n\nQuestion: ")
        .map(|(context, _)| context)
        .unwrap_or(after)
}

/// Language model stand-in that follows the prompt instructions literally.
///
/// The summary pass echoes its context. The answer pass returns [`REFUSAL`] for
/// an empty context and otherwise quotes the context back.
#[derive(Default)]
pub struct ScriptedModel {
    latency: Duration,
    fail_summary: bool,
    fail_answer: bool,
    calls: Mutex<Vec<ModelCall>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn failing_summary(mut self) -> Self {
        self.fail_summary = true;
        self
    }

    pub fn failing_answer(mut self) -> Self {
        self.fail_answer = true;
        self
    }

    pub fn calls(&self) -> Vec<ModelCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let started = Instant::now();
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let call = ModelCall {
            prompt: prompt.to_string(),
            started,
            finished: Instant::now(),
        };
        let is_summary = call.is_summary();
        let context = call.context().trim().to_string();
        self.calls.lock().unwrap().push(call);

        let fail = if is_summary {
            self.fail_summary
        } else {
            self.fail_answer
        };
        if fail {
            return Err(GenerationError::Api {
                status: 500,
                message: "scripted failure".to_string(),
            });
        }

        Ok(if is_summary {
            context
        } else if context.is_empty() {
            REFUSAL.to_string()
        } else {
            format!("From your journal: {context}")
        })
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

pub fn pipeline(
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    llm: Arc<dyn LanguageModel>,
) -> Pipeline {
    Pipeline::new(
        embedder,
        store,
        llm,
        RetrievalConfig::default(),
        KeyScheme::Generated,
    )
}

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}
