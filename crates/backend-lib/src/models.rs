// ============================
// gymtrack-backend/src/models.rs
// ============================
//! Records held by the account and class stores.
use std::collections::{BTreeSet, VecDeque};

use chrono::{DateTime, Utc};
use gymtrack_common::{AccountId, AccountSummary, Availability, ClassId, Role};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// One successful login, kept in the bounded history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRecord {
    pub timestamp: DateTime<Utc>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

/// A member, trainer or admin account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    /// Stored lowercased
    pub email: String,
    /// PHC-formatted password hash
    pub password_hash: String,
    pub role: Role,
    /// Consecutive failed logins since the last success or lock
    pub failed_attempts: u32,
    pub locked_until: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub last_login_ip: Option<String>,
    /// Most recent successful logins, oldest first
    pub login_history: VecDeque<LoginRecord>,
    pub created_at: DateTime<Utc>,
    /// Bumped by the store on every successful save; used for conditional writes
    pub version: u64,
}

impl Account {
    pub fn new(
        username: &str,
        email: &str,
        password_hash: String,
        role: Role,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.trim().to_string(),
            email: normalize_identity(email),
            password_hash,
            role,
            failed_attempts: 0,
            locked_until: None,
            last_login_at: None,
            last_login_ip: None,
            login_history: VecDeque::new(),
            created_at: now,
            version: 0,
        }
    }

    /// Whether `identity` names this account, by username or e-mail
    pub fn matches_identity(&self, identity: &str) -> bool {
        let identity = normalize_identity(identity);
        self.email == identity || self.username.to_lowercase() == identity
    }

    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role,
            last_login_at: self.last_login_at,
        }
    }
}

/// Identities are compared trimmed and case-insensitively
pub fn normalize_identity(identity: &str) -> String {
    identity.trim().to_lowercase()
}

/// A scheduled class with a fixed number of seats.
///
/// `seats_taken` always equals the number of registered accounts and never
/// exceeds `capacity`; the fields are private so only [`ClassSession::admit`]
/// can change them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSession {
    id: ClassId,
    name: String,
    capacity: u32,
    seats_taken: u32,
    registered: BTreeSet<AccountId>,
}

impl ClassSession {
    /// Create an empty class. Capacity must be positive.
    pub fn new(id: ClassId, name: &str, capacity: u32) -> Result<Self, AppError> {
        if capacity == 0 {
            return Err(AppError::InvalidInput(
                "class capacity must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            id,
            name: name.trim().to_string(),
            capacity,
            seats_taken: 0,
            registered: BTreeSet::new(),
        })
    }

    pub fn id(&self) -> ClassId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn seats_taken(&self) -> u32 {
        self.seats_taken
    }

    pub fn is_registered(&self, account_id: AccountId) -> bool {
        self.registered.contains(&account_id)
    }

    pub fn registered(&self) -> impl Iterator<Item = &AccountId> {
        self.registered.iter()
    }

    pub fn is_full(&self) -> bool {
        self.seats_taken >= self.capacity
    }

    pub fn availability(&self) -> Availability {
        if self.is_full() {
            Availability::Full
        } else {
            Availability::Available
        }
    }

    /// Occupancy rounded to the nearest percent
    pub fn capacity_percentage(&self) -> u8 {
        let pct = (u64::from(self.seats_taken) * 100 + u64::from(self.capacity) / 2)
            / u64::from(self.capacity);
        u8::try_from(pct.min(100)).unwrap_or(100)
    }

    /// Take one seat for `account_id`. Returns false, leaving the session
    /// untouched, if the account already holds a seat or the class is full.
    pub fn admit(&mut self, account_id: AccountId) -> bool {
        if self.is_full() || self.registered.contains(&account_id) {
            return false;
        }
        self.registered.insert(account_id);
        self.seats_taken += 1;
        true
    }
}
