// ============================
// gymtrack-backend/src/storage.rs
// ============================
//! Store abstractions with in-memory implementations.
//!
//! Both stores expose conditional writes: an account save succeeds only if the
//! stored `version` still matches, and a seat reservation succeeds only if the
//! class's `seats_taken` still matches what the caller read.
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use gymtrack_common::{AccountId, ClassId};
use parking_lot::Mutex;
use thiserror::Error;

use crate::error::AppError;
use crate::models::{normalize_identity, Account, ClassSession};

/// Failures reported by a store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("conditional write lost to a concurrent update")]
    Conflict,

    #[error("duplicate key: {0}")]
    Duplicate(String),

    #[error("record not found")]
    NotFound,

    #[error("store backend failure: {0}")]
    Backend(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict => AppError::StoreConflict,
            StoreError::Duplicate(_) => AppError::AccountExists,
            StoreError::NotFound => AppError::Internal("record vanished during update".to_string()),
            StoreError::Backend(msg) => AppError::Internal(msg),
        }
    }
}

/// Trait for account stores
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Look up an account by username or e-mail
    async fn find_by_identity(&self, identity: &str) -> Result<Option<Account>, StoreError>;

    /// Look up an account by id
    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Insert a new account. Fails with `Duplicate` if the username or e-mail is taken.
    async fn insert(&self, account: Account) -> Result<Account, StoreError>;

    /// Conditionally replace an account. Succeeds only if the stored version equals
    /// `account.version`; returns the record with its version bumped.
    async fn save(&self, account: Account) -> Result<Account, StoreError>;
}

/// Trait for class stores
#[async_trait]
pub trait ClassStore: Send + Sync {
    async fn find_by_id(&self, id: ClassId) -> Result<Option<ClassSession>, StoreError>;

    /// Insert a new class. Fails with `Duplicate` if the id is taken.
    async fn insert(&self, session: ClassSession) -> Result<ClassSession, StoreError>;

    /// Add `account_id` to the class only if `seats_taken` still equals
    /// `expected_seats_taken` and the seat can be granted; otherwise `Conflict`.
    async fn conditional_reserve(
        &self,
        id: ClassId,
        expected_seats_taken: u32,
        account_id: AccountId,
    ) -> Result<ClassSession, StoreError>;
}

/// In-memory account store
#[derive(Clone, Default)]
pub struct InMemoryAccountStore {
    accounts: Arc<DashMap<AccountId, Account>>,
    /// Normalized username and e-mail -> id
    identities: Arc<DashMap<String, AccountId>>,
    /// Serializes inserts so both identity keys are claimed together
    insert_lock: Arc<Mutex<()>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn find_by_identity(&self, identity: &str) -> Result<Option<Account>, StoreError> {
        let key = normalize_identity(identity);
        let Some(id) = self.identities.get(&key).map(|entry| *entry.value()) else {
            return Ok(None);
        };
        Ok(self
            .accounts
            .get(&id)
            .map(|entry| entry.value().clone())
            .filter(|account| account.matches_identity(identity)))
    }

    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.get(&id).map(|entry| entry.value().clone()))
    }

    async fn insert(&self, account: Account) -> Result<Account, StoreError> {
        let username = normalize_identity(&account.username);
        let email = normalize_identity(&account.email);

        let _guard = self.insert_lock.lock();
        for key in [&username, &email] {
            if self.identities.contains_key(key) {
                return Err(StoreError::Duplicate(key.clone()));
            }
        }
        if self.accounts.contains_key(&account.id) {
            return Err(StoreError::Duplicate(account.id.to_string()));
        }

        self.identities.insert(username, account.id);
        self.identities.insert(email, account.id);
        self.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn save(&self, mut account: Account) -> Result<Account, StoreError> {
        let mut current = self.accounts.get_mut(&account.id).ok_or(StoreError::NotFound)?;
        if current.version != account.version {
            return Err(StoreError::Conflict);
        }
        account.version += 1;
        *current = account.clone();
        Ok(account)
    }
}

/// In-memory class store
#[derive(Clone, Default)]
pub struct InMemoryClassStore {
    classes: Arc<DashMap<ClassId, ClassSession>>,
}

impl InMemoryClassStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClassStore for InMemoryClassStore {
    async fn find_by_id(&self, id: ClassId) -> Result<Option<ClassSession>, StoreError> {
        Ok(self.classes.get(&id).map(|entry| entry.value().clone()))
    }

    async fn insert(&self, session: ClassSession) -> Result<ClassSession, StoreError> {
        match self.classes.entry(session.id()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(StoreError::Duplicate(session.id().to_string()))
            },
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(session.clone());
                Ok(session)
            },
        }
    }

    async fn conditional_reserve(
        &self,
        id: ClassId,
        expected_seats_taken: u32,
        account_id: AccountId,
    ) -> Result<ClassSession, StoreError> {
        // The shard write lock is held for the whole check-and-increment
        let mut session = self.classes.get_mut(&id).ok_or(StoreError::NotFound)?;
        if session.seats_taken() != expected_seats_taken {
            return Err(StoreError::Conflict);
        }
        if !session.admit(account_id) {
            return Err(StoreError::Conflict);
        }
        Ok(session.clone())
    }
}
