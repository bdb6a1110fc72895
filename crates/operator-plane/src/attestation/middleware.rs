//! Attestation middleware for axum routers

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use operator_bridge::RoleBasedJwtClaimValidator;
use operator_core::Role;
use std::sync::Arc;

use super::pipeline::{AttestationPipeline, AttestationRequest};
use crate::api::error::ApiError;
use crate::auth::{bearer_token, AuthenticatedOperator};

pub const ATTESTATION_TOKEN_HEADER: &str = "Attestation-Token";
pub const ATTESTATION_JWT_HEADER: &str = "Attestation-JWT";

/// Middleware state: the shared pipeline plus the roles one route group needs
#[derive(Clone)]
pub struct AttestationGuard {
    pipeline: Arc<AttestationPipeline>,
    claims: Arc<RoleBasedJwtClaimValidator>,
}

impl AttestationGuard {
    pub fn new<I>(pipeline: Arc<AttestationPipeline>, required_roles: I) -> Self
    where
        I: IntoIterator<Item = Role>,
    {
        Self {
            pipeline,
            claims: Arc::new(RoleBasedJwtClaimValidator::new(required_roles)),
        }
    }

    pub fn required_roles(&self) -> &RoleBasedJwtClaimValidator {
        &self.claims
    }
}

/// Header value as text; only a missing header is `None`
///
/// Bytes outside visible ASCII are replaced, never dropped.
fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
}

/// Let the request through only when the attestation pipeline authorizes it
///
/// Use with `axum::middleware::from_fn_with_state`, layered inside
/// [`crate::auth::authenticate_operator`].
pub async fn require_attestation(
    State(guard): State<AttestationGuard>,
    request: Request,
    next: Next,
) -> Response {
    let operator = request
        .extensions()
        .get::<AuthenticatedOperator>()
        .map(|authenticated| Arc::clone(&authenticated.0));
    let headers = request.headers();
    let user_token = bearer_token(headers).map(str::to_owned);
    let attestation_token = header(headers, ATTESTATION_TOKEN_HEADER);
    let jwt = header(headers, ATTESTATION_JWT_HEADER);

    let attestation_request = AttestationRequest {
        operator: operator.as_deref(),
        user_token: user_token.as_deref(),
        attestation_token: attestation_token.as_deref(),
        jwt: jwt.as_deref(),
    };
    let outcome = guard
        .pipeline
        .evaluate(&attestation_request, &guard.claims)
        .await;

    if outcome.is_authorized() {
        next.run(request).await
    } else {
        ApiError::Unauthorized("Unauthorized".into()).into_response()
    }
}
