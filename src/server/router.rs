use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::server::handlers::{config, documents, flags, health, jobs, search};
use crate::state::AppState;

/// Creates the application router with all routes and middleware.
///
/// Handlers stay thin: they parse input, call one core service and let
/// `ApiError` map core failures onto HTTP status codes.
pub fn router(state: Arc<AppState>) -> Router {
    let cors_layer = build_cors_layer(&state);
    Router::new()
        .route("/health", get(health::health))
        .route("/api/status", get(health::get_status))
        .route(
            "/api/config",
            get(config::get_config).patch(config::patch_config),
        )
        .route("/api/documents", post(documents::ingest_documents))
        .route("/api/documents/files", post(documents::ingest_files))
        .route(
            "/api/search",
            get(search::search_get).post(search::search_post),
        )
        .route("/api/ask", get(search::ask))
        .route("/api/flags", post(flags::check_flags))
        .route("/api/jobs", get(jobs::list_jobs))
        .route(
            "/api/jobs/:job_id",
            get(jobs::get_job).delete(jobs::delete_job),
        )
        .route("/api/jobs/:job_id/pause", post(jobs::pause_job))
        .route("/api/jobs/:job_id/resume", post(jobs::resume_job))
        .route("/api/scheduler/start", post(jobs::start_scheduler))
        .route("/api/scheduler/stop", post(jobs::stop_scheduler))
        .with_state(state)
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
}

fn build_cors_layer(state: &Arc<AppState>) -> CorsLayer {
    let allowed_origins = resolve_allowed_origins(&state.settings.server.cors_allowed_origins)
        .into_iter()
        .filter_map(|origin| HeaderValue::from_str(&origin).ok())
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE])
}

fn resolve_allowed_origins(configured: &[String]) -> Vec<String> {
    let origins = configured
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(|item| item.to_string())
        .collect::<Vec<_>>();

    if origins.is_empty() {
        return default_local_origins();
    }

    origins
}

fn default_local_origins() -> Vec<String> {
    vec![
        "http://localhost".to_string(),
        "http://localhost:3000".to_string(),
        "http://localhost:5173".to_string(),
        "http://127.0.0.1".to_string(),
        "http://127.0.0.1:3000".to_string(),
        "http://127.0.0.1:5173".to_string(),
        "http://127.0.0.1:8000".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::core::config::{AppConfig, AppPaths};

    async fn test_app(dir: &tempfile::TempDir) -> (Router, Arc<AppState>) {
        let paths = Arc::new(AppPaths::with_data_dir(
            dir.path().to_path_buf(),
            dir.path().join("data"),
        ));
        let state = AppState::build(paths, AppConfig::default()).await.unwrap();
        (router(state.clone()), state)
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = test_app(&dir).await;
        let (status, body) = send(&app, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn search_before_ingest_is_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = test_app(&dir).await;
        let (status, body) = send(&app, get("/api/search?query=hello")).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].as_str().unwrap().contains("not initialized"));
    }

    #[tokio::test]
    async fn ingest_then_search_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = test_app(&dir).await;

        let (status, body) = send(
            &app,
            post_json(
                "/api/documents",
                json!({ "documents": ["hello world"], "metadata": [{ "source": "test" }] }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "documents": 1, "chunks": 1 }));

        let (status, body) = send(
            &app,
            post_json("/api/search", json!({ "query": "hello", "k": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["metadata"], json!({ "source": "test" }));

        let (status, body) = send(&app, get("/api/ask?query=hello&k=1")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["prompt"].as_str().unwrap().contains("hello world"));
    }

    #[tokio::test]
    async fn validation_errors_are_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = test_app(&dir).await;

        let (status, _) = send(&app, post_json("/api/documents", json!({ "documents": [] }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            post_json(
                "/api/documents",
                json!({ "documents": ["a", "b"], "metadata": [{}] }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            post_json("/api/documents/files", json!({ "paths": ["notes.xlsx"] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn flags_endpoint_reports_keywords() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = test_app(&dir).await;
        let (status, body) = send(
            &app,
            post_json(
                "/api/flags",
                json!({ "text": "This is urgent and needs immediate attention" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["has_flags"], true);
        assert_eq!(body["flags"], json!(["urgent", "immediate attention"]));
    }

    #[tokio::test]
    async fn job_routes_treat_unknown_ids_benignly() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = test_app(&dir).await;

        let (status, body) = send(&app, get("/api/jobs/nonexistent")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "not_found" }));

        let request = Request::builder()
            .method("DELETE")
            .uri("/api/jobs/nonexistent")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["removed"], false);

        let (status, _) = send(&app, post_json("/api/jobs/nonexistent/pause", json!({}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn scheduler_lifecycle_conflicts_map_to_409() {
        let dir = tempfile::tempdir().unwrap();
        let (app, state) = test_app(&dir).await;

        let (status, _) = send(&app, post_json("/api/scheduler/stop", json!({}))).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = send(&app, post_json("/api/scheduler/start", json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert!(state.scheduler.is_running());

        let (status, _) = send(&app, post_json("/api/scheduler/start", json!({}))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        state.scheduler.stop().unwrap();
    }

    #[test]
    fn blank_cors_origins_fall_back_to_local_defaults() {
        assert_eq!(resolve_allowed_origins(&[" ".to_string()]), default_local_origins());
        assert_eq!(
            resolve_allowed_origins(&["https://inbox.example".to_string()]),
            vec!["https://inbox.example".to_string()]
        );
    }
}
