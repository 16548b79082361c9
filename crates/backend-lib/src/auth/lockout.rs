// ============================
// crates/backend-lib/src/auth/lockout.rs
// ============================
//! Per-account brute-force lockout.
//!
//! An account is either open or locked until a point in time. Failed logins
//! count up to a threshold; reaching it sets the lock and resets the counter.
//! A successful login clears both. The policy only mutates an [`Account`];
//! persisting it is the caller's job.

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use crate::config::{LockoutSettings, MAX_LOCK_DURATION_SECS};
use crate::error::AppError;
use crate::models::{Account, LoginRecord};

/// Default number of failed attempts before lockout
pub const DEFAULT_MAX_FAILED_ATTEMPTS: u32 = 5;

/// Default lockout duration (15 minutes)
pub const DEFAULT_LOCK_DURATION: Duration = Duration::minutes(15);

/// Default number of login records kept per account
pub const DEFAULT_LOGIN_HISTORY_LEN: usize = 10;

/// Lock state of an account at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Open,
    Locked { until: DateTime<Utc> },
}

/// Where a login came from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginContext {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

/// Lockout policy
#[derive(Debug, Clone)]
pub struct LockoutPolicy {
    /// Failures that trigger a lock
    max_failed_attempts: u32,
    /// Duration of a lock
    lock_duration: Duration,
    /// Login records kept per account
    history_len: usize,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_FAILED_ATTEMPTS,
            DEFAULT_LOCK_DURATION,
            DEFAULT_LOGIN_HISTORY_LEN,
        )
    }
}

impl LockoutPolicy {
    pub fn new(max_failed_attempts: u32, lock_duration: Duration, history_len: usize) -> Self {
        Self {
            max_failed_attempts: max_failed_attempts.max(1),
            lock_duration,
            history_len: history_len.max(1),
        }
    }

    pub fn from_settings(settings: &LockoutSettings) -> Result<Self, AppError> {
        if settings.lock_duration_secs > MAX_LOCK_DURATION_SECS {
            return Err(AppError::InvalidInput(format!(
                "lock duration must be at most {MAX_LOCK_DURATION_SECS} seconds"
            )));
        }
        let lock_duration = i64::try_from(settings.lock_duration_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .ok_or_else(|| AppError::InvalidInput("lock duration out of range".to_string()))?;
        Ok(Self::new(
            settings.max_failed_attempts,
            lock_duration,
            settings.login_history_len,
        ))
    }

    pub fn max_failed_attempts(&self) -> u32 {
        self.max_failed_attempts
    }

    pub fn lock_duration(&self) -> Duration {
        self.lock_duration
    }

    /// True iff the account has a lock that ends strictly after `now`
    pub fn is_locked(&self, account: &Account, now: DateTime<Utc>) -> bool {
        matches!(self.state(account, now), LockState::Locked { .. })
    }

    pub fn state(&self, account: &Account, now: DateTime<Utc>) -> LockState {
        match account.locked_until {
            Some(until) if until > now => LockState::Locked { until },
            _ => LockState::Open,
        }
    }

    /// `AccountLocked` with the remaining wait if the account is locked at `now`
    pub fn ensure_open(&self, account: &Account, now: DateTime<Utc>) -> Result<(), AppError> {
        match self.state(account, now) {
            LockState::Locked { .. } => Err(AppError::AccountLocked {
                retry_after_secs: self.retry_after_secs(account, now),
            }),
            LockState::Open => Ok(()),
        }
    }

    /// Record a failed login and return the resulting state
    pub fn record_failure(&self, account: &mut Account, now: DateTime<Utc>) -> LockState {
        // Check if a previous lock has expired
        if matches!(account.locked_until, Some(until) if until <= now) {
            account.failed_attempts = 1;
            account.locked_until = None;
        } else {
            account.failed_attempts = account.failed_attempts.saturating_add(1);
        }

        // Check if we need to lock out
        if account.failed_attempts >= self.max_failed_attempts && !self.is_locked(account, now) {
            // Saturates at the end of representable time
            let until = now
                .checked_add_signed(self.lock_duration)
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
            account.locked_until = Some(until);
            account.failed_attempts = 0;
            warn!(
                account_id = %account.id,
                locked_until = %until,
                "account locked after repeated failed logins"
            );
        }

        self.state(account, now)
    }

    /// Record a successful login: clear counters and lock, append to history
    pub fn record_success(&self, account: &mut Account, now: DateTime<Utc>, context: &LoginContext) {
        account.failed_attempts = 0;
        account.locked_until = None;
        account.last_login_at = Some(now);
        account.last_login_ip = context.ip.clone();

        account.login_history.push_back(LoginRecord {
            timestamp: now,
            ip: context.ip.clone(),
            user_agent: context.user_agent.clone(),
        });
        while account.login_history.len() > self.history_len {
            account.login_history.pop_front();
        }
    }

    /// Seconds until the lock ends, rounded up; zero when open
    pub fn retry_after_secs(&self, account: &Account, now: DateTime<Utc>) -> u64 {
        match self.state(account, now) {
            LockState::Locked { until } => {
                let remaining = until - now;
                let secs = remaining.num_seconds()
                    + i64::from(remaining.subsec_nanos() > 0);
                u64::try_from(secs).unwrap_or(0)
            },
            LockState::Open => 0,
        }
    }
}
