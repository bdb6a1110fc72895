//! HTTP API for the operator plane

pub mod error;
pub mod handlers;

use axum::{extract::State, middleware, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use operator_core::Role;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::attestation::{require_attestation, AttestationGuard};
use crate::auth::authenticate_operator;
use handlers::AppState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Readiness check response
#[derive(Serialize)]
pub struct ReadyResponse {
    /// True once a key pair snapshot has been published
    pub ready: bool,
    pub generation: u64,
    pub keypair_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loaded_at: Option<DateTime<Utc>>,
}

/// Health check endpoint
///
/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

/// Readiness check endpoint
///
/// GET /ready
pub async fn ready(State(state): State<Arc<AppState>>) -> Json<ReadyResponse> {
    let snapshot = state.store.snapshot();

    Json(ReadyResponse {
        ready: snapshot.generation() > 0,
        generation: snapshot.generation(),
        keypair_count: snapshot.len(),
        loaded_at: snapshot.loaded_at(),
    })
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let guard = AttestationGuard::new(state.attestation.clone(), [Role::Operator]);

    // route_layer runs the last-added layer first: authenticate, then attest
    let operator_routes = Router::new()
        .route("/v1/operator/keypairs", get(handlers::list_enabled_keypairs))
        .route("/v1/operator/keypairs/{subscription_id}", get(handlers::get_keypair))
        .route("/v1/operator/sites/{site_id}/keypairs", get(handlers::list_site_keypairs))
        .route_layer(middleware::from_fn_with_state(guard, require_attestation))
        .route_layer(middleware::from_fn_with_state(
            state.operators.clone(),
            authenticate_operator,
        ));

    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .merge(operator_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
