// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Application state, route handlers, and router construction.
//!
//! This module is `pub` so that integration tests can build a test router directly
//! without starting the full binary.

use crate::models::product::Product;
use crate::models::scrape::{ErrorResponse, HealthResponse, ScrapeResponse, Username};
use crate::models::version::VersionResponse;
use crate::services::scrape::{ScrapeError, ScrapeService};
use crate::services::scraper::{ImageMode, InvocationError};
use axum::{
    extract::{rejection::PathRejection, Path, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Application version extracted from `Cargo.toml` at compile time.
/// The patch segment can be overridden via `VINTED_PATCH_VERSION` (see `build.rs`).
pub const VERSION: &str = env!("VINTED_AGENT_VERSION");

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// Shared application state injected into every route handler via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub scrape_service: Arc<ScrapeService>,
    /// Comma-separated CORS allowlist; `None` allows any origin.
    pub cors_allowed_origins: Option<String>,
}

// ---------------------------------------------------------------------------
// Error responses
// ---------------------------------------------------------------------------

impl ScrapeError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ScrapeError::InvalidUsername(_) => StatusCode::BAD_REQUEST,
            ScrapeError::ImagesNotImplemented => StatusCode::NOT_IMPLEMENTED,
            ScrapeError::Invocation(InvocationError::Timeout { .. }) => {
                StatusCode::REQUEST_TIMEOUT
            }
            ScrapeError::Invocation(_) | ScrapeError::Workspace(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ScrapeError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "scrape request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "scrape request rejected");
        }
        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        message: "Vinted Scraper API is running".to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/version",
    responses((status = 200, description = "Agent version", body = VersionResponse))
)]
pub async fn version_handler() -> Json<VersionResponse> {
    Json(VersionResponse {
        agent: "vinted-agent".to_string(),
        version: VERSION.to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/scrape/{username}",
    params(("username" = String, Path, description = "Marketplace login to scrape")),
    responses(
        (status = 200, description = "Scraped products", body = ScrapeResponse),
        (status = 400, description = "Invalid username", body = ErrorResponse),
        (status = 408, description = "Scraper timed out", body = ErrorResponse),
        (status = 500, description = "Scraper or server failure", body = ErrorResponse)
    )
)]
pub async fn scrape_handler(
    State(state): State<AppState>,
    username: Result<Path<String>, PathRejection>,
) -> Result<Json<ScrapeResponse>, ScrapeError> {
    scrape(&state, username, ImageMode::Skip).await
}

#[utoipa::path(
    get,
    path = "/scrape-with-images/{username}",
    params(("username" = String, Path, description = "Marketplace login to scrape")),
    responses((status = 501, description = "Not implemented yet", body = ErrorResponse))
)]
pub async fn scrape_with_images_handler(
    State(state): State<AppState>,
    username: Result<Path<String>, PathRejection>,
) -> Result<Json<ScrapeResponse>, ScrapeError> {
    scrape(&state, username, ImageMode::IncludeImages).await
}

async fn scrape(
    state: &AppState,
    raw_username: Result<Path<String>, PathRejection>,
    images: ImageMode,
) -> Result<Json<ScrapeResponse>, ScrapeError> {
    // Undecodable segments still get the JSON error envelope
    let Path(raw_username) =
        raw_username.map_err(|rejection| ScrapeError::InvalidUsername(rejection.body_text()))?;
    let username = Username::parse(&raw_username).map_err(ScrapeError::InvalidUsername)?;
    let products = state.scrape_service.scrape(&username, images).await?;
    Ok(Json(ScrapeResponse::new(&username, products)))
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        version_handler,
        scrape_handler,
        scrape_with_images_handler
    ),
    components(schemas(
        Product,
        ScrapeResponse,
        ErrorResponse,
        HealthResponse,
        VersionResponse
    )),
    info(title = "Vinted Agent API", description = "Scrape marketplace listings on demand")
)]
pub struct ApiDoc;

/// CORS layer: restricted to `allowed_origins` when it lists at least one
/// valid origin, otherwise any origin.
pub fn cors_layer(allowed_origins: Option<&str>) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect();

    let cors = CorsLayer::new().allow_headers(Any).allow_methods(Any);
    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(origins)
    }
}

/// Build the Axum application router.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(state.cors_allowed_origins.as_deref());

    Router::new()
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .route("/scrape/{username}", get(scrape_handler))
        .route(
            "/scrape-with-images/{username}",
            get(scrape_with_images_handler),
        )
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
