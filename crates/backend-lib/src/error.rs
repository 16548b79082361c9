// crates/backend-lib/src/error.rs

//! Central error type + Axum integration.
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use gymtrack_common::Role;
use thiserror::Error;

/// Application error types with stable reason codes
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account locked, retry in {retry_after_secs}s")]
    AccountLocked { retry_after_secs: u64 },

    #[error("Token expired")]
    TokenExpired,

    #[error("Token malformed")]
    TokenMalformed,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Insufficient role: {required} required")]
    InsufficientRole { required: Role },

    #[error("Class not found")]
    ClassNotFound,

    #[error("Already registered for this class")]
    AlreadyRegistered,

    #[error("Class is full")]
    ClassFull,

    #[error("Conflicting concurrent update, retry the operation")]
    StoreConflict,

    #[error("An account with this username or email already exists")]
    AccountExists,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidCredentials
            | AppError::TokenExpired
            | AppError::TokenMalformed
            | AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::AccountLocked { .. } => StatusCode::LOCKED,
            AppError::InsufficientRole { .. } => StatusCode::FORBIDDEN,
            AppError::ClassNotFound => StatusCode::NOT_FOUND,
            AppError::AlreadyRegistered
            | AppError::ClassFull
            | AppError::StoreConflict
            | AppError::AccountExists => StatusCode::CONFLICT,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable reason code surfaced to callers
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::AccountLocked { .. } => "ACCOUNT_LOCKED",
            AppError::TokenExpired => "TOKEN_EXPIRED",
            AppError::TokenMalformed => "TOKEN_MALFORMED",
            AppError::Unauthenticated => "UNAUTHENTICATED",
            AppError::InsufficientRole { .. } => "INSUFFICIENT_ROLE",
            AppError::ClassNotFound => "CLASS_NOT_FOUND",
            AppError::AlreadyRegistered => "ALREADY_REGISTERED",
            AppError::ClassFull => "CLASS_FULL",
            AppError::StoreConflict => "STORE_CONFLICT",
            AppError::AccountExists => "ACCOUNT_EXISTS",
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::Internal(_) => "INTERNAL",
        }
    }

    /// Get a sanitized message suitable for production use
    pub fn sanitized_message(&self) -> String {
        match self {
            AppError::InvalidCredentials => "Invalid credentials".to_string(),
            AppError::AccountLocked { .. } => {
                "Too many failed login attempts, please try again later".to_string()
            },
            AppError::TokenExpired => "Session expired, please log in again".to_string(),
            AppError::TokenMalformed | AppError::Unauthenticated => {
                "Authentication required".to_string()
            },
            AppError::InsufficientRole { .. } => "Insufficient role".to_string(),
            AppError::ClassNotFound => "Resource not found".to_string(),
            AppError::AlreadyRegistered => "Already registered for this class".to_string(),
            AppError::ClassFull => "Class is full".to_string(),
            AppError::StoreConflict => "Please retry the request".to_string(),
            AppError::AccountExists => "Account already exists".to_string(),
            AppError::InvalidInput(_) => "Invalid input provided".to_string(),
            AppError::Internal(_) => "An internal server error occurred".to_string(),
        }
    }

    /// True for failures where repeating the whole operation may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::StoreConflict)
    }

    /// True when the caller presented no usable credential
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            AppError::Unauthenticated | AppError::TokenExpired | AppError::TokenMalformed
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        // Use detailed messages in development, sanitized in production
        let message = if cfg!(debug_assertions) {
            self.to_string()
        } else {
            self.sanitized_message()
        };

        let body = serde_json::json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        });

        let mut response = (status, axum::Json(body)).into_response();
        if let AppError::AccountLocked { retry_after_secs } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Internal(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Internal(msg.to_string())
    }
}
