// ============================
// crates/backend-lib/src/auth/service.rs
// ============================
use async_trait::async_trait;
use gymtrack_common::{AccountSummary, LoginRequest, LoginResponse, Role, SignupRequest};

use super::{LoginContext, Principal};
use crate::error::AppError;

/// Account lifecycle and credential checks
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Create a `user` account and log it in
    async fn signup(&self, request: SignupRequest) -> Result<LoginResponse, AppError>;

    /// Create an account with an explicit role, without logging in
    async fn provision(&self, request: SignupRequest, role: Role)
        -> Result<AccountSummary, AppError>;

    /// Check credentials under the lockout policy and mint a token
    async fn login(
        &self,
        request: LoginRequest,
        context: LoginContext,
    ) -> Result<LoginResponse, AppError>;

    /// Resolve the account a verified token was minted for
    async fn current_account(&self, principal: &Principal) -> Result<AccountSummary, AppError>;
}
