// ============================
// crates/backend-lib/src/lib.rs
// ============================
//! Core of the GymTrack backend: bearer tokens, role checks, admin lockout and
//! capacity-bounded class registration.

pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod keyed_lock;
pub mod metrics;
pub mod models;
pub mod registration;
pub mod storage;

use std::sync::Arc;

use gymtrack_common::{AccountSummary, ClassId, RegistrationReceipt, Role};

use crate::auth::{hasher_for, AuthService, DefaultAuth, Gate, LockoutPolicy, PasswordHasher, TokenIssuer};
use crate::clock::{Clock, SystemClock};
use crate::config::Settings;
use crate::error::AppError;
use crate::registration::Registrar;
use crate::storage::{AccountStore, ClassStore, InMemoryAccountStore, InMemoryClassStore};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Authentication service
    pub auth: Arc<dyn AuthService>,
    /// Token verification and role checks
    pub gate: Arc<Gate>,
    /// Class seat reservations
    pub registrar: Arc<Registrar>,
    /// Settings the state was built from
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Create a new application state using the configured password algorithm
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        classes: Arc<dyn ClassStore>,
        clock: Arc<dyn Clock>,
        settings: Settings,
    ) -> Result<Self, AppError> {
        let hasher = hasher_for(settings.password.algorithm);
        Self::with_hasher(accounts, classes, clock, hasher, settings)
    }

    /// Create a new application state with an explicit password hasher
    pub fn with_hasher(
        accounts: Arc<dyn AccountStore>,
        classes: Arc<dyn ClassStore>,
        clock: Arc<dyn Clock>,
        hasher: Arc<dyn PasswordHasher>,
        settings: Settings,
    ) -> Result<Self, AppError> {
        // Secret and TTL are read once here and fixed for the life of the state
        let tokens = Arc::new(TokenIssuer::from_settings(&settings.auth)?);
        let retries = settings.registration.max_conflict_retries;

        let auth = DefaultAuth::new(
            accounts,
            hasher,
            Arc::clone(&tokens),
            LockoutPolicy::from_settings(&settings.lockout)?,
            Arc::clone(&clock),
        )
        .with_max_conflict_retries(retries);
        let gate = Gate::new(tokens, clock);
        let registrar = Registrar::new(classes).with_max_conflict_retries(retries);

        Ok(Self {
            auth: Arc::new(auth),
            gate: Arc::new(gate),
            registrar: Arc::new(registrar),
            settings: Arc::new(settings),
        })
    }

    /// In-memory stores and the system clock
    pub fn in_memory(settings: Settings) -> Result<Self, AppError> {
        Self::new(
            Arc::new(InMemoryAccountStore::new()),
            Arc::new(InMemoryClassStore::new()),
            Arc::new(SystemClock),
            settings,
        )
    }

    /// Account behind the bearer token in `authorization`
    pub async fn current_account(
        &self,
        authorization: Option<&str>,
    ) -> Result<AccountSummary, AppError> {
        let principal = self.gate.require(authorization, Role::User)?;
        self.auth.current_account(&principal).await
    }

    /// Reserve a seat for the account behind the bearer token in `authorization`
    pub async fn register_for_class(
        &self,
        authorization: Option<&str>,
        class_id: ClassId,
    ) -> Result<RegistrationReceipt, AppError> {
        let principal = self.gate.require(authorization, Role::User)?;
        // A valid signature is not enough; the account must still exist
        let account = self.auth.current_account(&principal).await?;
        self.registrar.register(class_id, account.id).await
    }
}
