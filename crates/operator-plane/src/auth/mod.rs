//! Operator authentication
//!
//! Resolves the bearer token of a request to an [`OperatorKey`] and attaches
//! it as an [`AuthenticatedOperator`] extension. This layer never rejects a
//! request; the attestation middleware denies requests without an identity.

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use operator_core::OperatorKey;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

use crate::store::StoreError;

/// Operator identity attached to an authenticated request
#[derive(Debug, Clone)]
pub struct AuthenticatedOperator(pub Arc<OperatorKey>);

/// Lookup of operator keys by their secret key string
#[async_trait]
pub trait OperatorKeyProvider: Send + Sync {
    async fn find(&self, key: &str) -> Option<Arc<OperatorKey>>;

    /// Get a description of this provider (for logging)
    fn description(&self) -> &str {
        "operator key provider"
    }
}

/// In-memory operator keys
#[derive(Debug, Default)]
pub struct InMemoryOperatorKeys {
    keys: RwLock<HashMap<String, Arc<OperatorKey>>>,
}

impl InMemoryOperatorKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_keys<I>(keys: I) -> Self
    where
        I: IntoIterator<Item = OperatorKey>,
    {
        let provider = Self::new();
        for key in keys {
            provider.insert(key);
        }
        provider
    }

    /// Parse a JSON array of operator keys
    ///
    /// Role sets are validated while parsing; one bad entry fails the load.
    pub fn from_json(raw: &[u8]) -> Result<Self, StoreError> {
        let keys: Vec<OperatorKey> = serde_json::from_slice(raw)?;
        Ok(Self::from_keys(keys))
    }

    pub async fn load_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let raw = tokio::fs::read(path).await?;
        let provider = Self::from_json(&raw)?;
        info!(path = %path.display(), operators = provider.len(), "Loaded operator keys");
        Ok(provider)
    }

    pub fn insert(&self, key: OperatorKey) {
        debug!(name = %key.name(), site_id = ?key.site_id(), "Registering operator key");
        self.keys
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.key().to_string(), Arc::new(key));
    }

    pub fn remove(&self, key: &str) -> bool {
        self.keys
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(key)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.keys
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl OperatorKeyProvider for InMemoryOperatorKeys {
    async fn find(&self, key: &str) -> Option<Arc<OperatorKey>> {
        self.keys
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(key)
            .cloned()
    }

    fn description(&self) -> &str {
        "in-memory operator keys"
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header
///
/// The scheme is matched case-insensitively; a blank token counts as absent.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Attach the operator identity named by the bearer token, if any
pub async fn authenticate_operator(
    State(provider): State<Arc<dyn OperatorKeyProvider>>,
    mut request: Request,
    next: Next,
) -> Response {
    let operator = match bearer_token(request.headers()) {
        Some(token) => provider.find(token).await,
        None => None,
    };

    match operator {
        Some(operator) if operator.is_disabled() => {
            info!(name = %operator.name(), site_id = ?operator.site_id(), "Disabled operator key presented");
        }
        Some(operator) => {
            debug!(name = %operator.name(), "Operator authenticated");
            request.extensions_mut().insert(AuthenticatedOperator(operator));
        }
        None => debug!("Request carries no known operator key"),
    }

    next.run(request).await
}
