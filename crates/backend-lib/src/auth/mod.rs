// ============================
// crates/backend-lib/src/auth/mod.rs
// ============================
//! Authentication and authorization.

pub mod gate;
pub mod lockout;
pub mod password;
pub mod token;
pub mod token_generator;
mod service;
mod service_impl;

pub use gate::{authorize, bearer_token, parse_bearer, role_satisfies, Gate, Principal};
pub use lockout::{LockState, LockoutPolicy, LoginContext};
pub use password::{hasher_for, Argon2Hasher, PasswordHasher, ScryptHasher};
pub use service::AuthService;
pub use service_impl::DefaultAuth;
pub use token::{Claims, TokenIssuer, DEFAULT_TOKEN_TTL};
pub use token_generator::generate_signing_secret;
