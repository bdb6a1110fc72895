//! Operator Plane
//!
//! Serves client-side key pairs to attested operators:
//!
//! - Operators authenticate with their operator key as a bearer token
//! - Protected routes run the attestation pipeline: attestation token
//!   (skipped for the `trusted` protocol), then the attestation JWT and its
//!   roles
//! - Key pairs are served from an immutable snapshot that a background task
//!   refreshes and swaps in atomically
//!
//! ## API Endpoints
//!
//! - `GET /health` - Liveness check
//! - `GET /ready` - Readiness check with snapshot generation
//! - `GET /v1/operator/keypairs` - Enabled key pairs
//! - `GET /v1/operator/keypairs/{subscription_id}` - One key pair
//! - `GET /v1/operator/sites/{site_id}/keypairs` - Key pairs of a site

pub mod api;
pub mod attestation;
pub mod auth;
pub mod config;
pub mod store;

pub use api::create_router;
pub use api::handlers::AppState;
pub use attestation::{AttestationPipeline, AttestationSettings};
pub use auth::{InMemoryOperatorKeys, OperatorKeyProvider};
pub use config::{ConfigError, PlaneConfig};
pub use store::{spawn_refresh_task, ContentSource, LocalDirSource, RotatingKeypairStore};
