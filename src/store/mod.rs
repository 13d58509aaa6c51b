//! Vector store gateway.
//!
//! [`VectorStore`] is the seam between the pipeline and whatever holds the
//! vectors. Two backends exist: [`pinecone::PineconeStore`] talks to a hosted
//! Pinecone index over HTTP, [`sqlite::SqliteStore`] keeps a local collection in
//! a sqlite-vec virtual table. Both are bound to one collection at construction.

pub mod pinecone;
pub mod sqlite;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::StoreConfig;
use crate::error::StoreError;

/// Longest collection name Pinecone accepts.
const MAX_COLLECTION_NAME_LEN: usize = 45;

/// Similarity metric a collection is created with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    #[default]
    Cosine,
    Euclidean,
    Dotproduct,
}

impl DistanceMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::Euclidean => "euclidean",
            Self::Dotproduct => "dotproduct",
        }
    }
}

impl std::fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DistanceMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cosine" => Ok(Self::Cosine),
            "euclidean" => Ok(Self::Euclidean),
            "dotproduct" => Ok(Self::Dotproduct),
            _ => Err(format!("unknown distance metric: {s}")),
        }
    }
}

/// Everything needed to create a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSpec {
    pub name: String,
    pub dimension: usize,
    pub metric: DistanceMetric,
    /// Placement hints, only meaningful for hosted stores.
    pub cloud: String,
    pub region: String,
}

impl CollectionSpec {
    pub fn from_config(config: &StoreConfig) -> Self {
        Self {
            name: config.collection.clone(),
            dimension: config.dimension,
            metric: config.metric,
            cloud: config.cloud.clone(),
            region: config.region.clone(),
        }
    }
}

/// A vector plus the entry it represents.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub text: String,
    pub created_at: String,
}

/// One nearest-neighbour match.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub id: String,
    /// Entry text. Falls back to the key for records stored without text metadata.
    pub text: String,
    /// Cosine similarity in `[-1, 1]`.
    pub score: f32,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the collection unless it already exists. Safe to call on every startup.
    async fn ensure_collection(&self, spec: &CollectionSpec) -> Result<(), StoreError>;

    /// Insert or overwrite the record stored under `record.id`.
    async fn upsert(&self, record: VectorRecord) -> Result<(), StoreError>;

    /// Up to `top_k` nearest records, highest score first.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<SearchResult>, StoreError>;

    /// Short backend name for logs.
    fn backend(&self) -> &'static str;
}

/// Open the store selected by `config.provider`, bound to `config.collection`.
///
/// `embedding_model` is recorded by stores that keep vectors locally so a later
/// model change can be detected.
pub fn open_store(config: &StoreConfig, embedding_model: &str) -> anyhow::Result<Arc<dyn VectorStore>> {
    validate_collection_name(&config.collection)?;
    match config.provider.as_str() {
        "pinecone" => {
            let api_key = config
                .api_key
                .clone()
                .ok_or_else(|| anyhow::anyhow!("pinecone store requires an API key"))?;
            let store = pinecone::PineconeStore::new(
                &config.control_plane_url,
                &api_key,
                &config.collection,
                config.dimension,
            )?;
            Ok(Arc::new(store))
        }
        "sqlite" => {
            let path = crate::config::expand_tilde(&config.db_path);
            let store = sqlite::SqliteStore::open(&path, &config.collection, embedding_model)?;
            Ok(Arc::new(store))
        }
        other => anyhow::bail!("unknown store provider: {other}. Supported: pinecone, sqlite"),
    }
}

/// Collection names: 1-45 chars of lowercase ASCII letters, digits and `-`.
pub fn validate_collection_name(name: &str) -> Result<(), StoreError> {
    let valid = !name.is_empty()
        && name.len() <= MAX_COLLECTION_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !name.starts_with('-')
        && !name.ends_with('-');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidName(name.to_string()))
    }
}

/// A store only prepares the collection it reads and writes.
pub(crate) fn check_bound(bound: &str, spec: &CollectionSpec) -> Result<(), StoreError> {
    if spec.name == bound {
        Ok(())
    } else {
        Err(StoreError::CollectionMismatch {
            bound: bound.to_string(),
            requested: spec.name.clone(),
        })
    }
}

pub(crate) fn check_dimension(expected: usize, vector: &[f32]) -> Result<(), StoreError> {
    if vector.len() == expected {
        Ok(())
    } else {
        Err(StoreError::DimensionMismatch {
            expected,
            actual: vector.len(),
        })
    }
}
