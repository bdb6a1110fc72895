//! Client-side key pair endpoints
//!
//! Served to attested operators only; see [`crate::attestation`].

use axum::{
    extract::{Path, State},
    Json,
};
use operator_core::{ClientSideKeypair, KeyCodec, KeypairRecord};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use super::AppState;
use crate::api::error::ApiError;

/// A list of key pairs from one snapshot generation
#[derive(Debug, Serialize)]
pub struct KeypairListResponse {
    pub generation: u64,
    pub keypairs: Vec<KeypairRecord>,
}

fn encode(keypairs: &[Arc<ClientSideKeypair>], codec: &dyn KeyCodec) -> Vec<KeypairRecord> {
    keypairs
        .iter()
        .map(|keypair| KeypairRecord::from_keypair(keypair, codec))
        .collect()
}

/// GET /v1/operator/keypairs
///
/// Every enabled key pair.
pub async fn list_enabled_keypairs(State(state): State<Arc<AppState>>) -> Json<KeypairListResponse> {
    let snapshot = state.store.snapshot();
    Json(KeypairListResponse {
        generation: snapshot.generation(),
        keypairs: encode(snapshot.enabled_keypairs(), state.codec()),
    })
}

/// GET /v1/operator/keypairs/{subscription_id}
pub async fn get_keypair(
    State(state): State<Arc<AppState>>,
    Path(subscription_id): Path<String>,
) -> Result<Json<KeypairRecord>, ApiError> {
    let keypair = state.store.keypair(&subscription_id).ok_or_else(|| {
        debug!(subscription_id = %subscription_id, "Key pair lookup missed");
        ApiError::NotFound(format!("Key pair '{}' not found", subscription_id))
    })?;

    Ok(Json(KeypairRecord::from_keypair(&keypair, state.codec())))
}

/// GET /v1/operator/sites/{site_id}/keypairs
///
/// All key pairs of a site, disabled ones included; empty for unknown sites.
pub async fn list_site_keypairs(
    State(state): State<Arc<AppState>>,
    Path(site_id): Path<i32>,
) -> Json<KeypairListResponse> {
    let snapshot = state.store.snapshot();
    Json(KeypairListResponse {
        generation: snapshot.generation(),
        keypairs: encode(snapshot.site_keypairs(site_id), state.codec()),
    })
}
