//! Query and ingestion orchestration.
//!
//! A query runs strictly in order: embed, nearest-neighbour search, relevance
//! filter, join, summarize, answer. The rate-limit pause between the two model
//! calls is enforced by the throttled model client. Nothing is retried.
//!
//! [`Pipeline::answer`] and [`Pipeline::ingest`] return typed outcomes for
//! callers that need to see failures. [`Pipeline::handle_query`] and
//! [`Pipeline::add_journal_entry`] are the user-facing entry points: they always
//! return a string, rendering failures as fixed messages.

pub mod generator;
pub mod summarizer;

use std::sync::Arc;

use crate::config::{PenpalConfig, RetrievalConfig};
use crate::embedding::EmbeddingProvider;
use crate::error::{GenerationError, IngestError, StoreError};
use crate::journal::{JournalEntry, KeyScheme};
use crate::llm::LanguageModel;
use crate::retrieval::{filter_relevant, join_context};
use crate::store::{CollectionSpec, SearchResult, VectorRecord, VectorStore};

pub use generator::REFUSAL;

/// Shown when no answer could be generated.
pub const FALLBACK_ANSWER: &str = "I'm sorry, I couldn't generate a response at the moment.";
/// Returned after a successful ingestion.
pub const ENTRY_ADDED: &str = "Entry added to the journal!";
/// Returned when an entry could not be stored.
pub const ENTRY_FAILED: &str = "I'm sorry, I couldn't add that entry at the moment.";

/// Everything one query produced, including the failures that were absorbed.
#[derive(Debug)]
pub struct QueryOutcome {
    /// Matches as returned by the store, before filtering.
    pub retrieved: Vec<SearchResult>,
    /// Matches that passed the relevance filter.
    pub kept: Vec<SearchResult>,
    pub context: String,
    /// Set when retrieval failed and the query ran with empty context.
    pub retrieval_error: Option<StoreError>,
    pub summary: Result<String, GenerationError>,
    pub answer: Result<String, GenerationError>,
}

impl QueryOutcome {
    /// The text shown to the user.
    pub fn render(&self) -> String {
        match &self.answer {
            Ok(text) if !text.trim().is_empty() => text.clone(),
            _ => FALLBACK_ANSWER.to_string(),
        }
    }
}

pub struct Pipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    llm: Arc<dyn LanguageModel>,
    retrieval: RetrievalConfig,
    key_scheme: KeyScheme,
}

impl Pipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        llm: Arc<dyn LanguageModel>,
        retrieval: RetrievalConfig,
        key_scheme: KeyScheme,
    ) -> Self {
        Self {
            embedder,
            store,
            llm,
            retrieval,
            key_scheme,
        }
    }

    /// Build every service from config. Any failure here is fatal for the process.
    pub async fn from_config(config: &PenpalConfig) -> anyhow::Result<Self> {
        config.require_credentials()?;

        let embedder: Arc<dyn EmbeddingProvider> =
            Arc::from(crate::embedding::create_provider(&config.embedding)?);
        anyhow::ensure!(
            embedder.dimensions() == config.store.dimension,
            "embedding model produces {} dimensions but the store is configured for {}",
            embedder.dimensions(),
            config.store.dimension
        );
        tracing::info!("embedding provider ready");

        let store = crate::store::open_store(&config.store, &config.embedding.model)?;
        store
            .ensure_collection(&CollectionSpec::from_config(&config.store))
            .await
            .map_err(|e| anyhow::anyhow!("failed to prepare collection {}: {e}", config.store.collection))?;
        tracing::info!(backend = store.backend(), collection = %config.store.collection, "vector store ready");

        let llm = crate::llm::create_model(&config.llm)?;

        Ok(Self::new(
            embedder,
            store,
            llm,
            config.retrieval.clone(),
            config.store.key_scheme,
        ))
    }

    /// Answer `query`, always returning something to show the user.
    pub async fn handle_query(&self, query: &str) -> String {
        self.answer(query).await.render()
    }

    /// Run the full query sequence and report every intermediate result.
    pub async fn answer(&self, query: &str) -> QueryOutcome {
        tracing::info!(query_len = query.len(), "handling query");

        let (retrieved, retrieval_error) = match self.retrieve(query).await {
            Ok(results) => (results, None),
            Err(e) => {
                tracing::warn!(error = %e, "retrieval failed, continuing with empty context");
                (Vec::new(), Some(e))
            }
        };
        tracing::debug!(?retrieved, "raw matches");

        let kept = filter_relevant(retrieved.clone(), self.retrieval.similarity_threshold);
        tracing::info!(
            retrieved = retrieved.len(),
            kept = kept.len(),
            threshold = self.retrieval.similarity_threshold,
            "relevance filter applied"
        );
        let context = join_context(&kept, &self.retrieval.context_separator);

        let summary = summarizer::summarize(self.llm.as_ref(), query, &context).await;
        let summary_text = match &summary {
            Ok(text) => text.as_str(),
            Err(e) => {
                tracing::error!(error = %e, "summarization failed, answering without context");
                ""
            }
        };

        let answer = generator::generate_answer(self.llm.as_ref(), query, summary_text).await;
        if let Err(e) = &answer {
            tracing::error!(error = %e, "answer generation failed");
        }

        QueryOutcome {
            retrieved,
            kept,
            context,
            retrieval_error,
            summary,
            answer,
        }
    }

    async fn retrieve(&self, query: &str) -> Result<Vec<SearchResult>, StoreError> {
        let vector = self
            .embed(query)
            .await
            .map_err(StoreError::Embedding)?;
        self.store.query(&vector, self.retrieval.top_k).await
    }

    /// Add `text` to the journal, always returning a confirmation or apology.
    pub async fn add_journal_entry(&self, text: &str) -> String {
        match self.ingest(text).await {
            Ok(_) => ENTRY_ADDED.to_string(),
            Err(e) => {
                tracing::error!(error = %e, "failed to add journal entry");
                ENTRY_FAILED.to_string()
            }
        }
    }

    /// Embed `text` and upsert it under a key chosen by the key scheme.
    pub async fn ingest(&self, text: &str) -> Result<JournalEntry, IngestError> {
        let values = self.embed(text).await.map_err(IngestError::Embedding)?;
        let entry = JournalEntry::new(text, self.key_scheme);
        self.store
            .upsert(VectorRecord {
                id: entry.id.clone(),
                values,
                text: entry.text.clone(),
                created_at: entry.created_at.clone(),
            })
            .await?;
        tracing::info!(id = %entry.id, chars = text.len(), "journal entry stored");
        Ok(entry)
    }

    /// Embedding is CPU-bound, so it runs on the blocking pool.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, String> {
        let embedder = Arc::clone(&self.embedder);
        let text = text.to_string();
        tokio::task::spawn_blocking(move || embedder.embed(&text))
            .await
            .map_err(|e| format!("embedding task failed: {e}"))?
            .map_err(|e| format!("{e:#}"))
    }
}
