use std::sync::Arc;
use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use crate::discoverer::Discoverer;
use shared::types::{Deployment, Service};

#[derive(Clone)]
pub struct AppState {
    pub discoverer: Arc<Discoverer>,
    pub hash_rx: watch::Receiver<String>,
}

#[derive(Serialize)]
pub struct SpecsResponse {
    pub fingerprint: String,
    pub generated_at: Option<DateTime<Utc>>,
    pub paths: Vec<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/catalog/services", get(get_services))
        .route("/v1/catalog/deployments", get(get_deployments))
        .route("/v1/catalog/hash", get(get_hash))
        .route("/v1/specs", get(get_specs))
        .with_state(state)
}

async fn get_services(State(state): State<AppState>) -> Result<Json<Vec<Service>>, StatusCode> {
    state
        .discoverer
        .catalog()
        .list_services()
        .await
        .map(|mut services| {
            services.sort_by(|a, b| a.hostname.cmp(&b.hostname));
            Json(services)
        })
        .map_err(|e| {
            tracing::error!("Failed to query services: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

async fn get_deployments(
    State(state): State<AppState>,
) -> Result<Json<Vec<Deployment>>, StatusCode> {
    state
        .discoverer
        .catalog()
        .list_deployments()
        .await
        .map(|mut deployments| {
            deployments.sort_by(|a, b| (&a.namespace, &a.name).cmp(&(&b.namespace, &b.name)));
            Json(deployments)
        })
        .map_err(|e| {
            tracing::error!("Failed to query deployments: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

async fn get_hash(State(state): State<AppState>) -> String {
    state.hash_rx.borrow().clone()
}

async fn get_specs(State(state): State<AppState>) -> Json<SpecsResponse> {
    let specs = state.discoverer.specs();
    Json(SpecsResponse {
        fingerprint: specs.fingerprint().to_string(),
        generated_at: specs.generated_at(),
        paths: specs.paths(),
    })
}
