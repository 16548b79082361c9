// ============================
// crates/backend-lib/src/auth/token.rs
// ============================
//! Signed, time-bounded bearer tokens.
//!
//! Tokens are HS256 JWTs carrying `sub`, `role`, `iat` and `exp`. They are not
//! stored anywhere; validity depends only on the signature and the expiry
//! claim, which is checked against the caller's clock rather than the host's.
use chrono::{DateTime, Duration, TimeZone, Utc};
use gymtrack_common::{AccountId, Role};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

use crate::config::{AuthSettings, MAX_TOKEN_TTL_SECS, MIN_SECRET_BYTES};
use crate::error::AppError;

/// Default token lifetime (24 hours)
pub const DEFAULT_TOKEN_TTL: Duration = Duration::hours(24);

/// Claims carried by every token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account the token was minted for
    pub sub: AccountId,
    pub role: Role,
    /// Issue time, Unix seconds
    pub iat: i64,
    /// Expiry, Unix seconds
    pub exp: i64,
}

impl Claims {
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.iat, 0).single()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0).single()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}

/// Mints and checks tokens with a process-wide secret and TTL
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("key", &"[redacted]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenIssuer {
    /// Create an issuer. The secret must be at least 32 bytes and the TTL positive.
    pub fn new(secret: &[u8], ttl: Duration) -> Result<Self, AppError> {
        if secret.len() < MIN_SECRET_BYTES {
            return Err(AppError::InvalidInput(format!(
                "token secret must be at least {MIN_SECRET_BYTES} bytes"
            )));
        }
        if ttl <= Duration::zero() {
            return Err(AppError::InvalidInput("token ttl must be positive".to_string()));
        }

        // Expiry is compared against the injected clock in `verify`
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        })
    }

    pub fn from_settings(settings: &AuthSettings) -> Result<Self, AppError> {
        if settings.token_ttl_secs > MAX_TOKEN_TTL_SECS {
            return Err(AppError::InvalidInput(format!(
                "token ttl must be at most {MAX_TOKEN_TTL_SECS} seconds"
            )));
        }
        let ttl = i64::try_from(settings.token_ttl_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .ok_or_else(|| AppError::InvalidInput("token ttl out of range".to_string()))?;
        Self::new(settings.token_secret.as_bytes(), ttl)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Mint a token for `subject` valid from `now` until `now + ttl`
    pub fn issue(
        &self,
        subject: AccountId,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<String, AppError> {
        let expires = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| AppError::Internal("token expiry out of range".to_string()))?;
        let claims = Claims {
            sub: subject,
            role,
            iat: now.timestamp(),
            exp: expires.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|err| AppError::Internal(format!("token encoding failed: {err}")))
    }

    /// Check signature and expiry. Pure: no state is read or written.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, AppError> {
        let claims = decode::<Claims>(token.trim(), &self.decoding, &self.validation)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => AppError::TokenExpired,
                _ => AppError::TokenMalformed,
            })?
            .claims;

        if claims.is_expired(now) {
            return Err(AppError::TokenExpired);
        }
        Ok(claims)
    }
}
