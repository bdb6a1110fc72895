//! API handlers

pub mod keypairs;

pub use keypairs::*;

use operator_core::KeyCodec;
use std::sync::Arc;

use crate::attestation::AttestationPipeline;
use crate::auth::OperatorKeyProvider;
use crate::store::RotatingKeypairStore;

/// Shared application state
pub struct AppState {
    pub store: Arc<RotatingKeypairStore>,
    pub operators: Arc<dyn OperatorKeyProvider>,
    pub attestation: Arc<AttestationPipeline>,
}

impl AppState {
    pub fn codec(&self) -> &dyn KeyCodec {
        self.store.codec().as_ref()
    }
}
