// ============================
// gymtrack-backend/src/auth/password.rs
// ============================
//! Password hashing and verification.
//!
//! The hasher is a capability injected into the auth service so tests can swap
//! in a deterministic stub. Both implementations emit PHC strings.
use std::sync::Arc;

use argon2::Argon2;
use scrypt::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as PhcHasher, PasswordVerifier, SaltString,
    },
    Params, Scrypt,
};
use zeroize::Zeroize;

use crate::config::PasswordAlgorithm;
use crate::error::AppError;

/// One-way salted hash + verify
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, secret: &str) -> Result<String, AppError>;
    fn verify(&self, secret: &str, digest: &str) -> bool;
}

/// scrypt with configurable cost
#[derive(Debug, Clone)]
pub struct ScryptHasher {
    params: Params,
}

impl Default for ScryptHasher {
    fn default() -> Self {
        Self {
            params: Params::recommended(),
        }
    }
}

impl ScryptHasher {
    /// Build a hasher with explicit cost parameters (`log_n`, `r`, `p`)
    pub fn with_params(log_n: u8, r: u32, p: u32) -> Result<Self, AppError> {
        let params = Params::new(log_n, r, p, Params::RECOMMENDED_LEN)
            .map_err(|err| AppError::InvalidInput(format!("scrypt params: {err}")))?;
        Ok(Self { params })
    }
}

impl PasswordHasher for ScryptHasher {
    fn hash(&self, secret: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Scrypt
            .hash_password_customized(secret.as_bytes(), None, None, self.params, &salt)
            .map_err(|err| AppError::Internal(format!("scrypt hashing failed: {err}")))?
            .to_string();
        Ok(hash)
    }

    fn verify(&self, secret: &str, digest: &str) -> bool {
        let parsed_hash = match PasswordHash::new(digest) {
            Ok(h) => h,
            Err(_) => return false,
        };
        Scrypt.verify_password(secret.as_bytes(), &parsed_hash).is_ok()
    }
}

/// Argon2id with the crate defaults
#[derive(Debug, Clone, Default)]
pub struct Argon2Hasher;

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, secret: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|err| AppError::Internal(format!("argon2 hashing failed: {err}")))?
            .to_string();
        Ok(hash)
    }

    fn verify(&self, secret: &str, digest: &str) -> bool {
        let parsed_hash = match PasswordHash::new(digest) {
            Ok(h) => h,
            Err(_) => return false,
        };
        Argon2::default()
            .verify_password(secret.as_bytes(), &parsed_hash)
            .is_ok()
    }
}

/// The hasher configured for this process
pub fn hasher_for(algorithm: PasswordAlgorithm) -> Arc<dyn PasswordHasher> {
    match algorithm {
        PasswordAlgorithm::Scrypt => Arc::new(ScryptHasher::default()),
        PasswordAlgorithm::Argon2 => Arc::new(Argon2Hasher),
    }
}

/// Hash a password and zeroize the original
pub fn hash_password_secure(
    hasher: &dyn PasswordHasher,
    plain: &mut String,
) -> Result<String, AppError> {
    let hash = hasher.hash(plain);
    plain.zeroize();
    hash
}
