//! Axum-based HTTP server for the cover API.
//!
//! Provides REST endpoints for:
//! - GET `/api/covers` - State of every cover
//! - GET `/api/covers/:id` - State of one cover
//! - POST `/api/covers/:id/open` - Open fully
//! - POST `/api/covers/:id/close` - Close fully
//! - POST `/api/covers/:id/stop` - Stop
//! - POST `/api/covers/:id/position` - Move to `{"position": n}` (debounced)
//!
//! Errors come back as an [`ApiResponse`] with `success: false`: unknown
//! cover is 404, an unreadable body 400, and a transmitter failure 502.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::commands::CoverCommand;
use crate::config::WebConfig;
use crate::error::CoverError;
use crate::parsing::parse_position;
use crate::traits::CommandSink;

use super::api::{ApiResponse, CommandResponse, CoverStateResponse};
use super::registry::CoverRegistry;

// ============================================================================
// Errors
// ============================================================================

/// An error response: status code plus message.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<CoverError> for ApiError {
    fn from(err: CoverError) -> Self {
        let status = match &err {
            CoverError::UnknownCover(_) => StatusCode::NOT_FOUND,
            CoverError::Dispatch(_) => StatusCode::BAD_GATEWAY,
            CoverError::MissingCommand { .. } | CoverError::InvalidConfig(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiResponse::<()>::err(self.message))).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

// ============================================================================
// Route Handlers
// ============================================================================

/// GET /api/covers
async fn list_covers<S: CommandSink>(
    State(registry): State<Arc<CoverRegistry<S>>>,
) -> Json<ApiResponse<Vec<CoverStateResponse>>> {
    let covers = registry
        .iter()
        .map(|cover| CoverStateResponse::from(cover.as_ref()))
        .collect();
    Json(ApiResponse::ok(covers))
}

/// GET /api/covers/:id
async fn get_cover<S: CommandSink>(
    State(registry): State<Arc<CoverRegistry<S>>>,
    Path(id): Path<String>,
) -> ApiResult<CoverStateResponse> {
    let cover = registry.get(&id)?;
    Ok(Json(ApiResponse::ok(CoverStateResponse::from(cover.as_ref()))))
}

async fn run_command<S: CommandSink>(
    registry: &CoverRegistry<S>,
    id: &str,
    command: CoverCommand,
) -> ApiResult<CommandResponse> {
    match registry.apply(id, command).await {
        Ok(outcome) => Ok(Json(ApiResponse::ok(CommandResponse::from(&outcome)))),
        Err(e) => {
            warn!(cover = id, %command, error = %e, "web command failed");
            Err(e.into())
        }
    }
}

/// POST /api/covers/:id/open
async fn open_cover<S: CommandSink>(
    State(registry): State<Arc<CoverRegistry<S>>>,
    Path(id): Path<String>,
) -> ApiResult<CommandResponse> {
    run_command(&registry, &id, CoverCommand::Open).await
}

/// POST /api/covers/:id/close
async fn close_cover<S: CommandSink>(
    State(registry): State<Arc<CoverRegistry<S>>>,
    Path(id): Path<String>,
) -> ApiResult<CommandResponse> {
    run_command(&registry, &id, CoverCommand::Close).await
}

/// POST /api/covers/:id/stop
async fn stop_cover<S: CommandSink>(
    State(registry): State<Arc<CoverRegistry<S>>>,
    Path(id): Path<String>,
) -> ApiResult<CommandResponse> {
    run_command(&registry, &id, CoverCommand::Stop).await
}

/// POST /api/covers/:id/position
///
/// Accepts `{"position": 40}` or a bare number.
async fn set_position<S: CommandSink>(
    State(registry): State<Arc<CoverRegistry<S>>>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<CommandResponse> {
    registry.get(&id)?;
    let body_str = std::str::from_utf8(&body).unwrap_or("");
    let Some(position) = parse_position(body_str) else {
        return Err(ApiError::bad_request(
            "Position must be a number between 0 and 100",
        ));
    };
    run_command(&registry, &id, CoverCommand::SetPosition(position)).await
}

/// Fallback handler for 404
async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::<()>::err("Not found")),
    )
}

// ============================================================================
// Server Builder
// ============================================================================

/// Configuration for the web server
#[derive(Debug, Clone)]
pub struct WebServerConfig {
    /// Address to bind to
    pub addr: SocketAddr,
    /// Whether to enable CORS for all origins
    pub cors_permissive: bool,
}

impl Default for WebServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            cors_permissive: true,
        }
    }
}

impl WebServerConfig {
    /// Create a new config with the given address
    pub fn new(addr: impl Into<SocketAddr>) -> Self {
        Self {
            addr: addr.into(),
            ..Default::default()
        }
    }

    /// Set whether CORS should be permissive
    pub fn cors(mut self, permissive: bool) -> Self {
        self.cors_permissive = permissive;
        self
    }

    /// Create from the file configuration
    pub fn from_config(config: &WebConfig) -> Self {
        Self {
            addr: ([0, 0, 0, 0], config.port).into(),
            cors_permissive: config.cors_permissive,
        }
    }
}

/// Build the Axum router with all routes
pub fn build_router<S: CommandSink>(
    registry: Arc<CoverRegistry<S>>,
    config: &WebServerConfig,
) -> Router {
    let mut router = Router::new()
        .route("/api/covers", get(list_covers::<S>))
        .route("/api/covers/:id", get(get_cover::<S>))
        .route("/api/covers/:id/open", post(open_cover::<S>))
        .route("/api/covers/:id/close", post(close_cover::<S>))
        .route("/api/covers/:id/stop", post(stop_cover::<S>))
        .route("/api/covers/:id/position", post(set_position::<S>))
        .fallback(not_found)
        .with_state(registry);

    if config.cors_permissive {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    router
}

/// Serve the API until the listener fails.
pub async fn run_server<S: CommandSink>(
    registry: Arc<CoverRegistry<S>>,
    config: WebServerConfig,
) -> Result<(), std::io::Error> {
    let router = build_router(registry, &config);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!(addr = %config.addr, "web server listening");

    axum::serve(listener, router).await
}
