//! HTTP request handlers for the ingestion service.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::output::ChunkSink;
use crate::pipeline::IngestionPipeline;
use crate::types::{IngestConfig, RepositoryReference};

/// Application state shared across handlers.
pub struct AppState {
    pub pipeline: IngestionPipeline,
    pub sink: Arc<dyn ChunkSink>,
    pub config: IngestConfig,
    project_locks: ProjectLocks,
}

impl AppState {
    pub fn new(pipeline: IngestionPipeline, sink: Arc<dyn ChunkSink>, config: IngestConfig) -> Self {
        Self {
            pipeline,
            sink,
            config,
            project_locks: ProjectLocks::default(),
        }
    }
}

/// Per-project locks serializing runs. Entries live only while a run for
/// that project holds or waits on them.
#[derive(Default)]
struct ProjectLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ProjectLocks {
    async fn acquire(&self, project_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .await
            .entry(project_id.to_string())
            .or_default()
            .clone()
    }

    /// Hand back a lock from `acquire`, dropping the entry when no other run
    /// holds it.
    async fn release(&self, project_id: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        // One reference in the map, one held by the caller.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(project_id);
        }
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
}

/// Health check endpoint.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Ingest repository request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestRepositoryRequest {
    pub url: String,
    pub token: String,
    pub project_id: String,
    #[serde(default)]
    pub branch: Option<String>,
}

/// Ingest repository response.
#[derive(Debug, Serialize)]
pub struct IngestRepositoryResponse {
    status: &'static str,
}

/// Run one ingestion for the requested project.
pub async fn ingest_repository(
    State(state): State<Arc<AppState>>,
    Json(request): Json<IngestRepositoryRequest>,
) -> (StatusCode, Json<IngestRepositoryResponse>) {
    info!(project_id = %request.project_id, "Received ingestion request");

    let mut reference = match RepositoryReference::under(
        &state.config.clone_root,
        request.url,
        request.token,
        request.project_id,
    ) {
        Ok(reference) => reference,
        Err(e) => {
            warn!(error = %e, "Rejected ingestion request");
            return (
                StatusCode::BAD_REQUEST,
                Json(IngestRepositoryResponse { status: "failure" }),
            );
        }
    };
    if let Some(branch) = request.branch.filter(|b| !b.is_empty()) {
        reference = reference.with_branch(branch);
    }

    let lock = state.project_locks.acquire(reference.project_id()).await;
    let succeeded = {
        let _guard = lock.lock().await;
        state.pipeline.run(&reference, state.sink.as_ref()).await
    };
    state
        .project_locks
        .release(reference.project_id(), lock)
        .await;

    if succeeded {
        (StatusCode::OK, Json(IngestRepositoryResponse { status: "success" }))
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(IngestRepositoryResponse { status: "failure" }),
        )
    }
}
