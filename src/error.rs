//! Error types for the vector store gateway, the language model and ingestion.
//!
//! None of these cross the user-facing entry points: `Pipeline::handle_query` and
//! `Pipeline::add_journal_entry` log them and render a fixed message instead.

/// Failure talking to the vector store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("vector store request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("vector store returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("sqlite error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("embedding has {actual} dimensions, collection expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("store is bound to collection {bound}, cannot prepare {requested}")]
    CollectionMismatch { bound: String, requested: String },

    #[error("collection uses the {existing} metric, {requested} was requested")]
    MetricMismatch { existing: String, requested: String },

    #[error("invalid collection name {0:?}: use 1-45 lowercase letters, digits or '-'")]
    InvalidName(String),

    #[error("distance metric {0} is not supported by this store")]
    UnsupportedMetric(String),

    #[error("collection {0} did not become ready in time")]
    CollectionNotReady(String),

    #[error("collection {0} does not exist")]
    UnknownCollection(String),

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("background task failed: {0}")]
    Task(String),
}

/// Failure producing text from the language model.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("language model request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("language model returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("prompt was blocked: {0}")]
    Blocked(String),

    #[error("language model returned no text")]
    EmptyResponse,
}

/// Failure adding a journal entry.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
