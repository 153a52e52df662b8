//! HTTP trigger surface.

pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

pub use handlers::AppState;

/// Build the service routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/repository", post(handlers::ingest_repository))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::error::FetchError;
    use crate::output::MemorySink;
    use crate::pipeline::IngestionPipeline;
    use crate::repository::{CloneUrl, ProjectMetadata, SourceControl};
    use crate::types::{IngestConfig, RepositoryReference};

    struct StaticProvider;

    #[async_trait]
    impl SourceControl for StaticProvider {
        async fn project_metadata(
            &self,
            reference: &RepositoryReference,
        ) -> Result<ProjectMetadata, FetchError> {
            if reference.access_token() != "good" {
                return Err(FetchError::Auth("401 Unauthorized".to_string()));
            }
            Ok(ProjectMetadata {
                path: "app".to_string(),
                http_url_to_repo: "https://gitlab.example.com/team/app.git".to_string(),
            })
        }

        async fn clone_repository(
            &self,
            _url: &CloneUrl,
            _branch: Option<&str>,
            destination: &Path,
        ) -> Result<Option<git2::Repository>, FetchError> {
            std::fs::write(destination.join("a.py"), "def foo():\n    return 1").unwrap();
            Ok(None)
        }
    }

    fn app(clone_root: &Path) -> (Router, Arc<MemorySink>) {
        let config = IngestConfig {
            clone_root: clone_root.to_path_buf(),
            cleanup_settle_ms: 0,
            ..Default::default()
        };
        let sink = Arc::new(MemorySink::new());
        let pipeline = IngestionPipeline::new(Arc::new(StaticProvider), &config);
        let state = Arc::new(AppState::new(pipeline, sink.clone(), config));
        (router(state), sink)
    }

    fn ingest_request(body: Value) -> Request<Body> {
        Request::post("/repository")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app(dir.path());

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_ingest_success() {
        let dir = tempfile::tempdir().unwrap();
        let (app, sink) = app(dir.path());

        let response = app
            .oneshot(ingest_request(json!({
                "url": "https://gitlab.example.com",
                "token": "good",
                "projectId": "42"
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "status": "success" }));
        assert_eq!(sink.batches(), vec![("42".to_string(), vec!["def foo():\n    return 1".to_string()])]);
        assert!(!dir.path().join("42/app").exists());
    }

    #[tokio::test]
    async fn test_ingest_failure_is_500() {
        let dir = tempfile::tempdir().unwrap();
        let (app, sink) = app(dir.path());

        let response = app
            .oneshot(ingest_request(json!({
                "url": "https://gitlab.example.com",
                "token": "bad",
                "projectId": "42",
                "branch": "main"
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(sink.chunks().is_empty());
    }

    #[tokio::test]
    async fn test_project_id_outside_clone_root_is_rejected() {
        let clone_root = tempfile::tempdir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        let checkout = elsewhere.path().join("app");
        std::fs::create_dir_all(&checkout).unwrap();
        std::fs::write(checkout.join("secret.py"), "def secret():\n    return 'pw'\n").unwrap();
        let (app, sink) = app(clone_root.path());

        for project_id in [elsewhere.path().display().to_string(), "../outside".to_string()] {
            let response = app
                .clone()
                .oneshot(ingest_request(json!({
                    "url": "https://gitlab.example.com",
                    "token": "good",
                    "projectId": project_id
                })))
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }

        assert!(sink.chunks().is_empty());
        assert!(checkout.join("secret.py").is_file());
    }

    #[tokio::test]
    async fn test_malformed_request_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app(dir.path());

        let response = app
            .oneshot(ingest_request(json!({ "url": "https://gitlab.example.com" })))
            .await
            .unwrap();

        assert!(response.status().is_client_error());
    }
}
