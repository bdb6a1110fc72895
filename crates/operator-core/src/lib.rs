//! # Operator Core
//!
//! Model types for operator attestation and client-side key distribution.
//!
//! ## Key Concepts
//!
//! - **Role**: a capability tag. Operator keys carry a normalized [`RoleSet`]
//!   restricted to a closed set of [`RoleProfile`] combinations.
//! - **Operator key**: the identity of an operator enclave ([`OperatorKey`]).
//! - **Client-side key pair**: key material owned by a site and handed to
//!   operators ([`ClientSideKeypair`]).
//! - **Key codec**: the string encoding of key material ([`KeyCodec`]).

pub mod codec;
pub mod error;
pub mod keypair;
pub mod operator;
pub mod role;

pub use codec::{KeyCodec, PrefixedBase64Codec, PrivateKeyMaterial, PublicKeyMaterial};
pub use error::{CoreError, Result};
pub use keypair::{ClientSideKeypair, KeypairRecord};
pub use operator::{OperatorKey, OperatorKeyBuilder, OperatorKeyRecord, OperatorType, TRUSTED_PROTOCOL};
pub use role::{Role, RoleProfile, RoleSet};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
