//! `mercato-auth`: bearer-token validation (zero-trust boundary).
//!
//! This crate verifies tokens issued elsewhere and turns them into a caller
//! identity. Token issuance and login flows are not handled here. It is
//! decoupled from HTTP and storage.

pub mod claims;
pub mod jwt;
pub mod principal;

pub use claims::{validate_claims, JwtClaims, TokenValidationError};
pub use jwt::{Hs256JwtValidator, JwtValidator};
pub use principal::Principal;
