//! Token lifecycle
//!
//! Signing/verification, refresh token registry, issuance, validation and
//! password hashing.

mod claims;
mod codec;
mod issuer;
mod password;
mod registry;
mod validator;

pub use claims::{Claims, TokenKind};
pub use codec::TokenCodec;
pub use issuer::{TokenIssuer, TokenPair};
pub use password::{hash_password, verify_password};
pub use registry::{spawn_sweeper, InMemoryRefreshTokenRegistry, RefreshTokenRegistry, RegistryError};
pub use validator::TokenValidator;
