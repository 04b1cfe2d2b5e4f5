//! REST API server for okd-deployer
//!
//! Provides HTTP endpoints for manifest generation, deployment and cluster
//! discovery. Responses follow `{ "status": "success" | "error", ... }`.

use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use okd_deployer_manifest::{render, DeploymentRequest, ManifestError};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tracing::{info, warn};

use crate::auth;
use crate::cluster::{ClusterError, ClusterSession};

// Shared state
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<ClusterSession>,
    /// Bearer token required on protected routes
    pub api_token: Option<Arc<str>>,
}

impl AppState {
    pub fn new(session: Arc<ClusterSession>, api_token: Option<String>) -> Self {
        Self {
            session,
            api_token: api_token.map(Arc::from),
        }
    }
}

/// Failure of an API handler
#[derive(Debug)]
pub enum ApiError {
    /// Body missing or not a valid deployment request
    Request(JsonRejection),
    Manifest(ManifestError),
    Cluster(ClusterError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Request(rejection)
    }
}

impl From<ManifestError> for ApiError {
    fn from(err: ManifestError) -> Self {
        Self::Manifest(err)
    }
}

impl From<ClusterError> for ApiError {
    fn from(err: ClusterError) -> Self {
        Self::Cluster(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Request(rejection) => rejection.status(),
            Self::Manifest(ManifestError::Validation(_)) => StatusCode::BAD_REQUEST,
            Self::Manifest(ManifestError::Serialize(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Cluster(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            Self::Request(rejection) => rejection.body_text(),
            Self::Manifest(e) => e.to_string(),
            Self::Cluster(e) => e.to_string(),
        };
        (
            self.status(),
            Json(json!({ "status": "error", "message": message })),
        )
            .into_response()
    }
}

type ApiResult = Result<Json<Value>, ApiError>;

#[derive(Debug, Default, Deserialize)]
pub struct DiscoveryQuery {
    /// Bypass the discovery cache
    #[serde(default)]
    pub refresh: bool,
}

// Routes
pub fn api_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/generate", post(generate))
        .route("/deploy", post(deploy))
        .route("/namespaces", get(namespaces))
        .route("/storage-classes", get(storage_classes))
        .route("/auth/status", get(auth_status))
        .route("/auth/login", post(login))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_token,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(protected)
        .with_state(state)
}

/// Full application: API under `/api`, optional frontend at `/`
pub fn app(state: AppState, static_dir: Option<&Path>) -> Router {
    let mut router = Router::new().nest("/api", api_router(state));
    if let Some(dir) = static_dir {
        let index = ServeFile::new(dir.join("index.html"));
        router = router.fallback_service(ServeDir::new(dir).fallback(index));
    }
    router.layer(CorsLayer::permissive())
}

// Handlers

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

async fn generate(payload: Result<Json<DeploymentRequest>, JsonRejection>) -> ApiResult {
    let Json(request) = payload?;
    let yaml = render(&request).inspect_err(|e| {
        warn!(namespace = %request.namespace, error = %e, "Rejected deployment request");
    })?;
    Ok(Json(json!({ "status": "success", "yaml": yaml })))
}

async fn deploy(
    State(state): State<AppState>,
    payload: Result<Json<DeploymentRequest>, JsonRejection>,
) -> ApiResult {
    let Json(request) = payload?;
    let yaml = render(&request).inspect_err(|e| {
        warn!(namespace = %request.namespace, error = %e, "Rejected deployment request");
    })?;
    let output = state.session.apply_yaml(&yaml).await?;
    info!(namespace = %request.namespace, image = %request.container_image, "Deployment applied");
    Ok(Json(json!({
        "status": "success",
        "yaml": yaml,
        "output": output,
    })))
}

async fn namespaces(
    State(state): State<AppState>,
    Query(query): Query<DiscoveryQuery>,
) -> ApiResult {
    let namespaces = state.session.namespaces(!query.refresh).await?;
    Ok(Json(json!({ "status": "success", "namespaces": *namespaces })))
}

async fn storage_classes(
    State(state): State<AppState>,
    Query(query): Query<DiscoveryQuery>,
) -> ApiResult {
    let classes = state.session.storage_classes(!query.refresh).await?;
    Ok(Json(json!({ "status": "success", "storageClasses": *classes })))
}

async fn auth_status(State(state): State<AppState>) -> Json<Value> {
    let status = state.session.auth_status().await;
    Json(json!({
        "status": "success",
        "authenticated": status.authenticated,
        "authenticatedAt": status.authenticated_at,
    }))
}

async fn login(State(state): State<AppState>) -> ApiResult {
    state.session.authenticate().await?;
    Ok(Json(json!({ "status": "success", "authenticated": true })))
}
