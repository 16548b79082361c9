// ============================
// gymtrack-backend/src/config.rs
// ============================
//! Configuration management.
//!
//! Settings are layered: built-in defaults, then `config.toml` (or an explicit
//! file), then `GYMTRACK_`-prefixed environment variables. Nested keys use a
//! double underscore, e.g. `GYMTRACK_AUTH__TOKEN_SECRET`.
use std::fmt;
use std::path::Path;

use anyhow::{bail, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "GYMTRACK_";

/// Shortest accepted token signing secret
pub const MIN_SECRET_BYTES: usize = 32;

/// Longest accepted token lifetime (one year)
pub const MAX_TOKEN_TTL_SECS: u64 = 366 * 24 * 60 * 60;

/// Longest accepted lockout (30 days)
pub const MAX_LOCK_DURATION_SECS: u64 = 30 * 24 * 60 * 60;

/// Default re-read budget after a lost conditional write
pub const DEFAULT_MAX_CONFLICT_RETRIES: u32 = 3;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Log level used when `RUST_LOG` is not set
    pub log_level: String,
    /// Bearer token issuance
    pub auth: AuthSettings,
    /// Brute-force lockout policy
    pub lockout: LockoutSettings,
    /// Class registration
    pub registration: RegistrationSettings,
    /// Password hashing
    pub password: PasswordSettings,
}

/// Token signing settings. The secret is fixed for the life of the process.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AuthSettings {
    /// HMAC signing secret
    pub token_secret: String,
    /// Token lifetime in seconds
    pub token_ttl_secs: u64,
}

impl fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSettings")
            .field("token_secret", &"[redacted]")
            .field("token_ttl_secs", &self.token_ttl_secs)
            .finish()
    }
}

/// Lockout policy settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LockoutSettings {
    /// Consecutive failures that lock the account
    pub max_failed_attempts: u32,
    /// How long a lock lasts, in seconds
    pub lock_duration_secs: u64,
    /// Number of successful logins kept per account
    pub login_history_len: usize,
}

/// Class registration settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegistrationSettings {
    /// Re-read and re-attempt budget after a conditional write conflict
    pub max_conflict_retries: u32,
}

/// Supported password hashing algorithms
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PasswordAlgorithm {
    #[default]
    Scrypt,
    Argon2,
}

/// Password hashing settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PasswordSettings {
    pub algorithm: PasswordAlgorithm,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            auth: AuthSettings::default(),
            lockout: LockoutSettings::default(),
            registration: RegistrationSettings::default(),
            password: PasswordSettings::default(),
        }
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            token_secret: String::new(),
            token_ttl_secs: 60 * 60 * 24, // 24 hours
        }
    }
}

impl Default for LockoutSettings {
    fn default() -> Self {
        Self {
            max_failed_attempts: 5,
            lock_duration_secs: 15 * 60,
            login_history_len: 10,
        }
    }
}

impl Default for RegistrationSettings {
    fn default() -> Self {
        Self {
            max_conflict_retries: DEFAULT_MAX_CONFLICT_RETRIES,
        }
    }
}

impl Settings {
    /// Load settings from `config.toml` in the working directory (if present)
    /// and the environment
    pub fn load() -> Result<Self> {
        Self::extract(Self::defaults().merge(Toml::file("config.toml")))
    }

    /// Load settings from an explicit TOML file and the environment
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            bail!("config file {} not found", path.display());
        }
        Self::extract(Self::defaults().merge(Toml::file(path)))
    }

    fn defaults() -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
    }

    fn extract(figment: Figment) -> Result<Self> {
        let settings: Settings = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check that the settings describe a usable process
    pub fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            bail!("invalid log level `{}`", self.log_level);
        }
        if self.auth.token_secret.len() < MIN_SECRET_BYTES {
            bail!("auth.token_secret must be at least {MIN_SECRET_BYTES} bytes");
        }
        if self.auth.token_ttl_secs == 0 {
            bail!("auth.token_ttl_secs must be greater than zero");
        }
        if self.auth.token_ttl_secs > MAX_TOKEN_TTL_SECS {
            bail!("auth.token_ttl_secs must be at most {MAX_TOKEN_TTL_SECS}");
        }
        if self.lockout.max_failed_attempts == 0 {
            bail!("lockout.max_failed_attempts must be greater than zero");
        }
        if self.lockout.lock_duration_secs == 0 {
            bail!("lockout.lock_duration_secs must be greater than zero");
        }
        if self.lockout.lock_duration_secs > MAX_LOCK_DURATION_SECS {
            bail!("lockout.lock_duration_secs must be at most {MAX_LOCK_DURATION_SECS}");
        }
        if self.lockout.login_history_len == 0 {
            bail!("lockout.login_history_len must be greater than zero");
        }
        Ok(())
    }
}
