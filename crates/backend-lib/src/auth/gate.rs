// ============================
// crates/backend-lib/src/auth/gate.rs
// ============================
//! Authorization gate: bearer token -> principal -> role decision.
use std::sync::Arc;

use axum::http::{header::AUTHORIZATION, HeaderMap};
use gymtrack_common::{AccountId, Role};
use tracing::debug;

use super::token::TokenIssuer;
use crate::clock::Clock;
use crate::error::AppError;

/// Identity proven by a verified token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub account_id: AccountId,
    pub role: Role,
}

/// Whether `verified` meets a `required` role.
///
/// Only the pairs below are granted; the hierarchy is not transitive:
/// * `user` - any authenticated role
/// * `trainer` - `trainer` or `admin`
/// * `admin` - `admin` or `super_admin`
/// * `super_admin` - `super_admin` only
pub fn role_satisfies(verified: Role, required: Role) -> bool {
    match required {
        Role::User => true,
        Role::Trainer => matches!(verified, Role::Trainer | Role::Admin),
        Role::Admin => matches!(verified, Role::Admin | Role::SuperAdmin),
        Role::SuperAdmin => verified == Role::SuperAdmin,
    }
}

/// Allow or deny with an explicit reason
pub fn authorize(verified: Role, required: Role) -> Result<(), AppError> {
    if role_satisfies(verified, required) {
        Ok(())
    } else {
        Err(AppError::InsufficientRole { required })
    }
}

/// Extract the token from an `Authorization: Bearer <token>` value
pub fn parse_bearer(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Extract the bearer token from request headers
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_bearer)
}

/// Verifies tokens and applies role requirements
#[derive(Clone)]
pub struct Gate {
    tokens: Arc<TokenIssuer>,
    clock: Arc<dyn Clock>,
}

impl Gate {
    pub fn new(tokens: Arc<TokenIssuer>, clock: Arc<dyn Clock>) -> Self {
        Self { tokens, clock }
    }

    /// Resolve a raw `Authorization` header value to a principal
    pub fn authenticate(&self, authorization: Option<&str>) -> Result<Principal, AppError> {
        let token = authorization
            .and_then(parse_bearer)
            .ok_or(AppError::Unauthenticated)?;
        let claims = self.tokens.verify(token, self.clock.now()).map_err(|err| {
            debug!(reason = err.error_code(), "bearer token rejected");
            err
        })?;
        Ok(Principal {
            account_id: claims.sub,
            role: claims.role,
        })
    }

    /// Authenticate, then require `required`
    pub fn require(
        &self,
        authorization: Option<&str>,
        required: Role,
    ) -> Result<Principal, AppError> {
        let principal = self.authenticate(authorization)?;
        authorize(principal.role, required).map_err(|err| {
            debug!(
                account_id = %principal.account_id,
                role = %principal.role,
                required = %required,
                "role requirement not met"
            );
            err
        })?;
        Ok(principal)
    }

    /// Same as [`Gate::require`], reading the header map directly
    pub fn require_headers(&self, headers: &HeaderMap, required: Role) -> Result<Principal, AppError> {
        let value = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        self.require(value, required)
    }
}
