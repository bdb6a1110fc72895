//! Client-side key pair store
//!
//! Key pairs are served from an immutable [`KeypairSnapshot`]. The
//! [`RotatingKeypairStore`] rebuilds a snapshot from downloaded content and
//! publishes it with a single pointer swap, so readers always see one
//! complete generation.

pub mod rotating;
pub mod snapshot;
pub mod source;

pub use rotating::{spawn_refresh_task, RotatingKeypairStore, KEYPAIRS_METADATA_FIELD};
pub use snapshot::KeypairSnapshot;
pub use source::{ContentSource, InMemorySource, LocalDirSource};

use operator_core::CoreError;
use thiserror::Error;

/// Error type for store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Content not found: {0}")]
    NotFound(String),

    #[error("Invalid content location: {0}")]
    InvalidLocation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed content: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Metadata has no location for '{0}'")]
    MissingLocation(String),

    #[error("Invalid key pair: {0}")]
    Decode(#[from] CoreError),
}

pub type Result<T> = std::result::Result<T, StoreError>;
