//! HTTP surface over the pipeline.
//!
//! Two endpoints mirror the two entry points: `POST /entries` and `POST /query`.
//! Both always answer 200 with a message; failures are only visible in the logs.

use anyhow::Result;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::PenpalConfig;
use crate::pipeline::Pipeline;

#[derive(Debug, Deserialize)]
pub struct AddEntryRequest {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddEntryResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
}

/// Build the router around a shared pipeline.
pub fn router(pipeline: Arc<Pipeline>) -> Router {
    Router::new()
        .route("/entries", post(add_entry))
        .route("/query", post(query))
        .route("/health", get(health))
        .with_state(pipeline)
}

async fn add_entry(
    State(pipeline): State<Arc<Pipeline>>,
    Json(request): Json<AddEntryRequest>,
) -> Json<AddEntryResponse> {
    let message = pipeline.add_journal_entry(&request.text).await;
    Json(AddEntryResponse { message })
}

async fn query(
    State(pipeline): State<Arc<Pipeline>>,
    Json(request): Json<QueryRequest>,
) -> Json<QueryResponse> {
    let answer = pipeline.handle_query(&request.query).await;
    Json(QueryResponse { answer })
}

async fn health() -> &'static str {
    "ok"
}

/// Start the HTTP server and run until ctrl-c.
pub async fn serve(config: PenpalConfig) -> Result<()> {
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let pipeline = Arc::new(Pipeline::from_config(&config).await?);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "penpal listening at http://{bind_addr}");

    axum::serve(listener, router(pipeline))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
            tracing::info!("shutting down HTTP server");
        })
        .await?;

    Ok(())
}
