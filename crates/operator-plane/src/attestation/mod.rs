//! Operator attestation
//!
//! [`AttestationPipeline`] makes the allow/deny decision;
//! [`require_attestation`] is the only place that decision becomes an HTTP
//! response.

pub mod middleware;
pub mod pipeline;
pub mod validators;

pub use middleware::{
    require_attestation, AttestationGuard, ATTESTATION_JWT_HEADER, ATTESTATION_TOKEN_HEADER,
};
pub use pipeline::{
    AttestationOutcome, AttestationPipeline, AttestationRequest, AttestationSettings,
    AttestationState, DenialReason,
};
pub use validators::{select_validators, Validators};
