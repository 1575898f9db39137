//! Schema Draft API Server
//!
//! HTTP surface for the diagram editor: draft extraction, the save hook and
//! a health probe.

use crate::core::{AppConfig, Cortex, Extractor};
use crate::error::ExtractError;
use crate::schema::SchemaDraft;
use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

pub const SERVICE_NAME: &str = "OpenSPG Schema Backend";

/// Read-only per-process state shared by every request.
pub struct ApiState {
    pub extractor: Extractor,
}

impl ApiState {
    pub fn new(extractor: Extractor) -> Self {
        Self { extractor }
    }
}

pub type SharedState = Arc<ApiState>;

// --- Request/Response Types ---

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub status: String,
    pub message: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

// --- Errors ---

#[derive(Debug)]
pub enum ApiError {
    Extract(ExtractError),
    BadBody(JsonRejection),
}

impl From<ExtractError> for ApiError {
    fn from(err: ExtractError) -> Self {
        ApiError::Extract(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadBody(rejection)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::Extract(err) => (
                StatusCode::from_u16(err.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                err.to_string(),
            ),
            ApiError::BadBody(rejection) => (StatusCode::UNPROCESSABLE_ENTITY, rejection.body_text()),
        };

        if status.is_server_error() {
            warn!(%status, %detail, "request failed");
        }

        (status, Json(ErrorBody { detail })).into_response()
    }
}

// --- Handler Functions ---

async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Local::now().to_rfc3339(),
    })
}

async fn extract_schema(
    State(state): State<SharedState>,
    payload: Result<Json<ExtractRequest>, JsonRejection>,
) -> Result<Json<SchemaDraft>, ApiError> {
    let Json(request) = payload?;
    let span = info_span!("extract", request_id = %Uuid::new_v4());

    let draft = state.extractor.extract(&request.text).instrument(span).await?;
    Ok(Json(draft))
}

/// Acknowledges a draft without persisting it. Edges are not checked
/// against node ids.
async fn save_to_spg(
    payload: Result<Json<SchemaDraft>, JsonRejection>,
) -> Result<Json<SaveResponse>, ApiError> {
    let Json(draft) = payload?;
    info!(nodes = draft.nodes.len(), edges = draft.edges.len(), "saving draft to OpenSPG");

    Ok(Json(SaveResponse {
        status: "success".to_string(),
        message: "Schema synced to OpenSPG".to_string(),
        timestamp: Local::now().to_rfc3339(),
    }))
}

/// Build the API router
pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/extract", post(extract_schema))
        .route("/api/save_to_spg", post(save_to_spg))
        .route("/api/health", get(health_check))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Start the API server
pub async fn start_server(config: AppConfig) -> Result<()> {
    let cortex = Cortex::new(config.llm.clone()).context("Failed to init completion client")?;
    info!(model = cortex.model(), "completion client ready");
    let extractor = Extractor::new(Arc::new(cortex), config.draft.clone());
    let app = build_router(Arc::new(ApiState::new(extractor)));

    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::extract::tests::FakeCompletion;
    use crate::error::CompletionError;
    use crate::schema::DraftDefaults;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app_with(fake: &Arc<FakeCompletion>) -> Router {
        let extractor = Extractor::new(fake.clone(), DraftDefaults::default());
        build_router(Arc::new(ApiState::new(extractor)))
    }

    async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let fake = FakeCompletion::replying("");
        let (status, body) = send(app_with(&fake), "GET", "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], SERVICE_NAME);
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_extract_returns_draft() {
        let fake = FakeCompletion::replying(
            r#"```json
{"nodes": [{"id": "e1", "data": {"label": "Supplier", "category": "EntityType"}}, {}],
 "edges": [{"source": "e1", "target": "node_1", "label": "supplies"}]}
```"#,
        );
        let (status, body) = send(
            app_with(&fake),
            "POST",
            "/api/extract",
            Some(json!({ "text": "Suppliers supply parts." })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["nodes"].as_array().unwrap().len(), 2);
        assert_eq!(body["edges"].as_array().unwrap().len(), 1);
        assert_eq!(body["nodes"][1]["id"], "node_1");
        assert_eq!(body["nodes"][1]["type"], "defaultNodeKind");
        assert_eq!(body["nodes"][1]["position"], json!({ "x": 250, "y": 200 }));
        assert_eq!(body["edges"][0]["animated"], true);
    }

    #[tokio::test]
    async fn test_extract_blank_text_is_400() {
        let fake = FakeCompletion::replying("{}");
        let (status, body) = send(app_with(&fake), "POST", "/api/extract", Some(json!({ "text": "  " }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Input text must not be empty");
        assert_eq!(fake.call_count(), 0);
    }

    #[tokio::test]
    async fn test_extract_failures_are_500_with_detail() {
        let fake = FakeCompletion::replying("Sorry, I cannot help with that.");
        let (status, body) = send(app_with(&fake), "POST", "/api/extract", Some(json!({ "text": "x" }))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["detail"].as_str().unwrap().contains("no JSON object found"));

        let fake = FakeCompletion::failing(CompletionError::Upstream("502 Bad Gateway - ".into()));
        let (status, body) = send(app_with(&fake), "POST", "/api/extract", Some(json!({ "text": "x" }))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "LLM service call failed: 502 Bad Gateway - ");
    }

    #[tokio::test]
    async fn test_extract_missing_text_is_422() {
        let fake = FakeCompletion::replying("{}");
        let (status, body) = send(app_with(&fake), "POST", "/api/extract", Some(json!({ "content": "x" }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].is_string());
        assert_eq!(fake.call_count(), 0);
    }

    #[tokio::test]
    async fn test_save_accepts_dangling_edges() {
        let fake = FakeCompletion::replying("");
        let draft = json!({
            "nodes": [{
                "id": "e1",
                "type": "cyberNode",
                "data": { "label": "Supplier", "category": "EntityType", "props": ["name"] },
                "position": { "x": 100, "y": 100 }
            }],
            "edges": [{ "id": "l1", "source": "e1", "target": "missing", "label": "rates" }]
        });

        let (status, body) = send(app_with(&fake), "POST", "/api/save_to_spg", Some(draft)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert!(body["message"].is_string());
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_save_rejects_incomplete_node_with_422() {
        let fake = FakeCompletion::replying("");
        let (status, body) = send(
            app_with(&fake),
            "POST",
            "/api/save_to_spg",
            Some(json!({ "nodes": [{ "id": "x" }], "edges": [] })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].as_str().unwrap().contains("data"));
    }

    #[tokio::test]
    async fn test_save_accepts_empty_draft() {
        let fake = FakeCompletion::replying("");
        let (status, body) = send(
            app_with(&fake),
            "POST",
            "/api/save_to_spg",
            Some(json!({ "nodes": [], "edges": [] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
    }
}
