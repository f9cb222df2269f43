//! Account authentication: bcrypt password hashing, HS256 bearer tokens and the
//! axum extractors that guard provider-only routes.

pub mod extract;
pub mod jwt;
pub mod password;

pub use extract::{AuthenticatedProvider, BearerClaims};
pub use jwt::{AccountKind, Claims, TokenKeys};
pub use password::{hash_password, verify_password};
