//! Scry Web Server
//!
//! Axum-based REST API exposing the root-cause summarization engine over a
//! loaded aggregate source:
//! - `GET /api/cube/summary` - run a summarization
//! - `GET /api/source` - describe the loaded source
//! - `GET /api/health` - liveness

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use scry_core::{EngineConfig, MemorySource, SummaryEngine};

mod handlers;


/// Shared application state
pub struct AppState {
    pub engine: SummaryEngine<MemorySource>,
    pub source: Arc<MemorySource>,
}

/// Create the application router with default engine configuration
pub fn create_router(source: Arc<MemorySource>) -> Router {
    create_router_with_config(source, EngineConfig::default())
}

/// Create the application router with a custom engine configuration
pub fn create_router_with_config(source: Arc<MemorySource>, config: EngineConfig) -> Router {
    info!(
        dataset = source.dataset(),
        metric = source.metric(),
        rows = source.len(),
        "Serving aggregate source"
    );

    let state = Arc::new(AppState {
        engine: SummaryEngine::with_config(Arc::clone(&source), config),
        source,
    });

    let api_routes = Router::new()
        .route("/cube/summary", get(handlers::get_summary))
        .route("/source", get(handlers::get_source_info))
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Start the server
pub async fn serve(source: Arc<MemorySource>, host: &str, port: u16) -> anyhow::Result<()> {
    serve_with_config(source, host, port, EngineConfig::default()).await
}

/// Start the server with custom engine configuration
pub async fn serve_with_config(
    source: Arc<MemorySource>,
    host: &str,
    port: u16,
    config: EngineConfig,
) -> anyhow::Result<()> {
    let app = create_router_with_config(source, config);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn internal(msg: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.to_string(),
            internal: None,
        }
    }

    /// Map a core engine error to its HTTP status
    pub fn from_core(err: scry_core::Error) -> Self {
        let status = match &err {
            scry_core::Error::InvalidConfiguration(_) => StatusCode::BAD_REQUEST,
            scry_core::Error::CubeOverflow { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            scry_core::Error::DataUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
            internal: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            internal: Some(err),
        }
    }
}
