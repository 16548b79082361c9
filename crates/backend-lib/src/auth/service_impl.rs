// ============================
// crates/backend-lib/src/auth/service_impl.rs
// ============================
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gymtrack_common::{
    AccountId, AccountSummary, LoginRequest, LoginResponse, Role, SignupRequest,
};
use metrics::counter;
use tracing::{debug, info, warn};
use zeroize::Zeroize;

use super::password::{hash_password_secure, PasswordHasher};
use super::{AuthService, LockState, LockoutPolicy, LoginContext, Principal, TokenIssuer};
use crate::clock::Clock;
use crate::config::DEFAULT_MAX_CONFLICT_RETRIES;
use crate::error::AppError;
use crate::keyed_lock::KeyedLocks;
use crate::metrics::{
    ACCOUNT_CREATED, ACCOUNT_LOCKED, LOGIN_FAILED, LOGIN_REJECTED_LOCKED, LOGIN_SUCCEEDED,
    STORE_CONFLICT_RETRY,
};
use crate::models::Account;
use crate::storage::{AccountStore, StoreError};

/// Store-backed [`AuthService`]
pub struct DefaultAuth {
    accounts: Arc<dyn AccountStore>,
    hasher: Arc<dyn PasswordHasher>,
    tokens: Arc<TokenIssuer>,
    lockout: LockoutPolicy,
    clock: Arc<dyn Clock>,
    /// Serializes lockout transitions per account
    locks: KeyedLocks<AccountId>,
    max_conflict_retries: u32,
}

impl DefaultAuth {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        hasher: Arc<dyn PasswordHasher>,
        tokens: Arc<TokenIssuer>,
        lockout: LockoutPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            accounts,
            hasher,
            tokens,
            lockout,
            clock,
            locks: KeyedLocks::new(),
            max_conflict_retries: DEFAULT_MAX_CONFLICT_RETRIES,
        }
    }

    pub fn with_max_conflict_retries(mut self, retries: u32) -> Self {
        self.max_conflict_retries = retries;
        self
    }

    async fn hash_secret(&self, mut secret: String) -> Result<String, AppError> {
        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || hash_password_secure(hasher.as_ref(), &mut secret))
            .await
            .map_err(|err| AppError::Internal(format!("hashing task failed: {err}")))?
    }

    async fn verify_secret(&self, mut secret: String, digest: String) -> Result<bool, AppError> {
        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || {
            let matched = hasher.verify(&secret, &digest);
            secret.zeroize();
            matched
        })
        .await
        .map_err(|err| AppError::Internal(format!("verification task failed: {err}")))
    }

    /// Apply `transition` to the freshest copy of an account and save it
    /// conditionally, re-reading on conflict. A transition error aborts
    /// without writing.
    async fn update_account<T, F>(
        &self,
        id: AccountId,
        mut transition: F,
    ) -> Result<(T, Account), AppError>
    where
        F: FnMut(&mut Account, DateTime<Utc>) -> Result<T, AppError> + Send,
        T: Send,
    {
        let _guard = self.locks.lock(id).await;
        let mut attempt = 0;
        loop {
            let mut account = self
                .accounts
                .find_by_id(id)
                .await?
                .ok_or(AppError::InvalidCredentials)?;
            let outcome = transition(&mut account, self.clock.now())?;

            match self.accounts.save(account).await {
                Ok(saved) => return Ok((outcome, saved)),
                Err(StoreError::Conflict) if attempt < self.max_conflict_retries => {
                    attempt += 1;
                    counter!(STORE_CONFLICT_RETRY).increment(1);
                    debug!(account_id = %id, attempt, "account save conflicted, re-reading");
                },
                Err(err) => return Err(err.into()),
            }
        }
    }

    async fn create_account(&self, request: SignupRequest, role: Role) -> Result<Account, AppError> {
        let SignupRequest {
            username,
            email,
            secret,
        } = request;

        let username = username.trim().to_string();
        let email = email.trim().to_string();
        if username.is_empty() {
            return Err(AppError::InvalidInput("username must not be empty".to_string()));
        }
        if email.is_empty() {
            return Err(AppError::InvalidInput("email must not be empty".to_string()));
        }
        if secret.is_empty() {
            return Err(AppError::InvalidInput("password must not be empty".to_string()));
        }

        // Skip the hashing cost for obvious duplicates; insert re-checks atomically
        for identity in [&username, &email] {
            if self.accounts.find_by_identity(identity).await?.is_some() {
                return Err(AppError::AccountExists);
            }
        }

        let password_hash = self.hash_secret(secret).await?;
        let account = Account::new(&username, &email, password_hash, role, self.clock.now());
        let account = self.accounts.insert(account).await?;

        counter!(ACCOUNT_CREATED).increment(1);
        info!(account_id = %account.id, role = %account.role, "account created");
        Ok(account)
    }

    fn login_response(&self, account: &Account) -> Result<LoginResponse, AppError> {
        let token = self
            .tokens
            .issue(account.id, account.role, self.clock.now())?;
        Ok(LoginResponse {
            token,
            account: account.summary(),
        })
    }
}

#[async_trait]
impl AuthService for DefaultAuth {
    async fn signup(&self, request: SignupRequest) -> Result<LoginResponse, AppError> {
        let account = self.create_account(request, Role::User).await?;
        self.login_response(&account)
    }

    async fn provision(
        &self,
        request: SignupRequest,
        role: Role,
    ) -> Result<AccountSummary, AppError> {
        let account = self.create_account(request, role).await?;
        Ok(account.summary())
    }

    async fn login(
        &self,
        request: LoginRequest,
        context: LoginContext,
    ) -> Result<LoginResponse, AppError> {
        let LoginRequest { identity, secret } = request;

        let Some(account) = self.accounts.find_by_identity(&identity).await? else {
            counter!(LOGIN_FAILED).increment(1);
            debug!("login for unknown identity");
            return Err(AppError::InvalidCredentials);
        };

        // Locked accounts never reach the hasher
        let now = self.clock.now();
        if self.lockout.is_locked(&account, now) {
            let retry_after_secs = self.lockout.retry_after_secs(&account, now);
            counter!(LOGIN_REJECTED_LOCKED).increment(1);
            warn!(account_id = %account.id, retry_after_secs, "login rejected, account locked");
            return Err(AppError::AccountLocked { retry_after_secs });
        }

        let matched = self
            .verify_secret(secret, account.password_hash.clone())
            .await?;

        if !matched {
            let lockout = &self.lockout;
            let (state, saved) = self
                .update_account(account.id, |acct, now| {
                    // A concurrent failure may have locked the account since the first read
                    lockout.ensure_open(acct, now)?;
                    Ok(lockout.record_failure(acct, now))
                })
                .await
                .inspect_err(|err| {
                    if matches!(err, AppError::AccountLocked { .. }) {
                        counter!(LOGIN_REJECTED_LOCKED).increment(1);
                    }
                })?;

            counter!(LOGIN_FAILED).increment(1);
            warn!(
                account_id = %saved.id,
                failed_attempts = saved.failed_attempts,
                ip = context.ip.as_deref().unwrap_or("-"),
                "failed login"
            );
            // The transition only runs on an open account, so a lock here is new
            if matches!(state, LockState::Locked { .. }) {
                counter!(ACCOUNT_LOCKED).increment(1);
            }
            return Err(AppError::InvalidCredentials);
        }

        let lockout = &self.lockout;
        let context_ref = &context;
        let ((), saved) = self
            .update_account(account.id, |acct, now| {
                lockout.ensure_open(acct, now)?;
                lockout.record_success(acct, now, context_ref);
                Ok(())
            })
            .await?;

        counter!(LOGIN_SUCCEEDED).increment(1);
        info!(account_id = %saved.id, role = %saved.role, "login succeeded");
        self.login_response(&saved)
    }

    async fn current_account(&self, principal: &Principal) -> Result<AccountSummary, AppError> {
        self.accounts
            .find_by_id(principal.account_id)
            .await?
            .map(|account| account.summary())
            .ok_or(AppError::Unauthenticated)
    }
}
