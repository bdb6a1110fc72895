//! Validator Bridge
//!
//! The bridge holds the seams between the attestation pipeline and the
//! services that vouch for an operator:
//!
//! - **Attestation token**: an opaque token minted for the operator enclave,
//!   checked by an [`AttestationTokenValidator`]
//! - **Attestation JWT**: a signed token asserting the operator's roles,
//!   checked by a [`JwtValidator`] and then by a [`RoleBasedJwtClaimValidator`]
//!
//! ## Usage
//!
//! ```ignore
//! use operator_bridge::{handlers::JwksJwtValidator, JwtValidator, RoleBasedJwtClaimValidator};
//! use operator_core::Role;
//!
//! let validator = JwksJwtValidator::new("https://attest.example.com/.well-known/jwks.json");
//! let response = validator.validate_jwt(jwt, "operator-plane", "attest.example.com").await?;
//!
//! let claims = RoleBasedJwtClaimValidator::new([Role::Operator]);
//! assert!(response.is_valid && claims.has_required_roles(&response));
//! ```

pub mod claims;
pub mod error;
pub mod handlers;
pub mod types;
pub mod validator;

pub use claims::RoleBasedJwtClaimValidator;
pub use error::{BridgeError, Result};
pub use types::JwtValidationResponse;
pub use validator::{AttestationTokenValidator, JwtValidator};
