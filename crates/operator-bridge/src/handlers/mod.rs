//! Validator implementations

pub mod jwt;
pub mod mock;
pub mod reject;

pub use jwt::{Jwk, Jwks, JwksJwtValidator, StaticKeyJwtValidator};
pub use mock::{MockAttestationValidator, MockJwtValidator};
pub use reject::RejectingValidator;
