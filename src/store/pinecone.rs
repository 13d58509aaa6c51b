//! Pinecone REST client.
//!
//! Index management goes to the control plane (`/indexes`); upserts and queries
//! go to the index's own data-plane host, which is resolved once via
//! describe-index and cached.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::OnceCell;

use super::{check_bound, check_dimension, CollectionSpec, SearchResult, VectorRecord, VectorStore};
use crate::error::StoreError;

const API_VERSION: &str = "2024-07";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const READY_POLL_INTERVAL: Duration = Duration::from_secs(1);
const READY_POLL_ATTEMPTS: u32 = 120;

pub struct PineconeStore {
    client: Client,
    control_plane_url: String,
    api_key: String,
    index: String,
    dimension: usize,
    host: OnceCell<String>,
}

// ── Wire types ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct IndexList {
    #[serde(default)]
    indexes: Vec<IndexModel>,
}

#[derive(Debug, Deserialize)]
struct IndexModel {
    name: String,
    dimension: Option<usize>,
    metric: Option<String>,
    #[serde(default)]
    host: String,
    #[serde(default)]
    status: IndexStatus,
}

#[derive(Debug, Default, Deserialize)]
struct IndexStatus {
    #[serde(default)]
    ready: bool,
    #[serde(default)]
    state: String,
}

#[derive(Debug, Serialize)]
struct CreateIndexRequest<'a> {
    name: &'a str,
    dimension: usize,
    metric: &'a str,
    spec: ServerlessSpec<'a>,
}

#[derive(Debug, Serialize)]
struct ServerlessSpec<'a> {
    serverless: CloudPlacement<'a>,
}

#[derive(Debug, Serialize)]
struct CloudPlacement<'a> {
    cloud: &'a str,
    region: &'a str,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: [UpsertVector<'a>; 1],
}

#[derive(Debug, Serialize)]
struct UpsertVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: EntryMetadata<'a>,
}

#[derive(Debug, Serialize)]
struct EntryMetadata<'a> {
    text: &'a str,
    created_at: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<Match>,
}

#[derive(Debug, Deserialize)]
struct Match {
    id: String,
    #[serde(default)]
    score: f32,
    metadata: Option<serde_json::Value>,
}

impl From<Match> for SearchResult {
    fn from(m: Match) -> Self {
        let text = m
            .metadata
            .as_ref()
            .and_then(|meta| meta.get("text"))
            .and_then(|t| t.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| m.id.clone());
        SearchResult {
            id: m.id,
            text,
            score: m.score,
        }
    }
}

// ── Client ────────────────────────────────────────────────────────────────────

impl PineconeStore {
    pub fn new(
        control_plane_url: &str,
        api_key: &str,
        index: &str,
        dimension: usize,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| anyhow::anyhow!("failed to create HTTP client: {e}"))?;
        Ok(Self {
            client,
            control_plane_url: control_plane_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            index: index.to_string(),
            dimension,
            host: OnceCell::new(),
        })
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
    }

    async fn list_indexes(&self) -> Result<Vec<IndexModel>, StoreError> {
        let request = self.client.get(format!("{}/indexes", self.control_plane_url));
        let response = check_status(self.authed(request).send().await?).await?;
        Ok(response.json::<IndexList>().await?.indexes)
    }

    async fn describe_index(&self) -> Result<IndexModel, StoreError> {
        let request = self
            .client
            .get(format!("{}/indexes/{}", self.control_plane_url, self.index));
        let response = self.authed(request).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::UnknownCollection(self.index.clone()));
        }
        Ok(check_status(response).await?.json::<IndexModel>().await?)
    }

    async fn create_index(&self, spec: &CollectionSpec) -> Result<(), StoreError> {
        let body = CreateIndexRequest {
            name: &spec.name,
            dimension: spec.dimension,
            metric: spec.metric.as_str(),
            spec: ServerlessSpec {
                serverless: CloudPlacement {
                    cloud: &spec.cloud,
                    region: &spec.region,
                },
            },
        };
        let request = self
            .client
            .post(format!("{}/indexes", self.control_plane_url))
            .json(&body);
        check_status(self.authed(request).send().await?).await?;
        tracing::info!(
            index = %spec.name,
            dimension = spec.dimension,
            metric = %spec.metric,
            cloud = %spec.cloud,
            region = %spec.region,
            "pinecone index created"
        );
        Ok(())
    }

    /// Poll describe-index until the index reports ready, then return its host.
    async fn wait_until_ready(&self) -> Result<String, StoreError> {
        for attempt in 0..READY_POLL_ATTEMPTS {
            let model = self.describe_index().await?;
            if model.status.ready && !model.host.is_empty() {
                return Ok(data_plane_url(&model.host));
            }
            tracing::debug!(
                index = %self.index,
                state = %model.status.state,
                attempt,
                "waiting for pinecone index"
            );
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
        Err(StoreError::CollectionNotReady(self.index.clone()))
    }

    async fn data_plane(&self) -> Result<&str, StoreError> {
        self.host
            .get_or_try_init(|| self.wait_until_ready())
            .await
            .map(String::as_str)
    }
}

/// Data-plane hosts come back without a scheme; default to https.
fn data_plane_url(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

async fn check_status(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "unknown error".to_string());
    Err(StoreError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl VectorStore for PineconeStore {
    async fn ensure_collection(&self, spec: &CollectionSpec) -> Result<(), StoreError> {
        super::validate_collection_name(&spec.name)?;
        check_bound(&self.index, spec)?;
        let existing = self.list_indexes().await?;
        match existing.iter().find(|idx| idx.name == spec.name) {
            Some(idx) => {
                if let Some(dimension) = idx.dimension {
                    if dimension != spec.dimension {
                        return Err(StoreError::DimensionMismatch {
                            expected: dimension,
                            actual: spec.dimension,
                        });
                    }
                }
                if let Some(metric) = &idx.metric {
                    if metric != spec.metric.as_str() {
                        return Err(StoreError::MetricMismatch {
                            existing: metric.clone(),
                            requested: spec.metric.to_string(),
                        });
                    }
                }
                tracing::debug!(index = %spec.name, "pinecone index already exists");
            }
            None => self.create_index(spec).await?,
        }
        self.data_plane().await?;
        Ok(())
    }

    async fn upsert(&self, record: VectorRecord) -> Result<(), StoreError> {
        check_dimension(self.dimension, &record.values)?;
        let host = self.data_plane().await?;
        let body = UpsertRequest {
            vectors: [UpsertVector {
                id: &record.id,
                values: &record.values,
                metadata: EntryMetadata {
                    text: &record.text,
                    created_at: &record.created_at,
                },
            }],
        };
        let request = self
            .client
            .post(format!("{host}/vectors/upsert"))
            .json(&body);
        check_status(self.authed(request).send().await?).await?;
        tracing::debug!(id = %record.id, "vector upserted");
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<SearchResult>, StoreError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        check_dimension(self.dimension, vector)?;
        let host = self.data_plane().await?;
        let body = QueryRequest {
            vector,
            top_k,
            include_metadata: true,
            include_values: false,
        };
        let request = self.client.post(format!("{host}/query")).json(&body);
        let response = check_status(self.authed(request).send().await?).await?;
        let parsed: QueryResponse = response.json().await?;
        Ok(parsed.matches.into_iter().map(SearchResult::from).collect())
    }

    fn backend(&self) -> &'static str {
        "pinecone"
    }
}
