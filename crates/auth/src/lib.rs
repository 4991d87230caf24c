//! `stockflow-auth` — pure authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage. The
//! capability check happens once at the boundary, producing a typed result;
//! the workflow core never reads ambient role state.

pub mod authorize;
pub mod claims;
pub mod identity;
pub mod jwt;
pub mod permissions;
pub mod roles;
pub mod user;

pub use authorize::{authorize, AuthzError};
pub use claims::{validate_claims, JwtClaims, TokenValidationError};
pub use identity::Identity;
pub use jwt::{Hs256JwtValidator, JwtValidator};
pub use permissions::Permission;
pub use roles::{capabilities, Role};
pub use user::UserAccount;
