// ================
// common/src/lib.rs
// ================
//! Common types and structures
//! used for communication between the gym client, the admin surface and the server.
//! This module defines the request/response shapes and supporting identifiers.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a member, trainer or admin account
pub type AccountId = Uuid;

/// Identifier of a scheduled class
pub type ClassId = Uuid;

/// Role carried by an account and by every token minted for it
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Trainer,
    Admin,
    SuperAdmin,
}

impl Role {
    /// Wire name of the role
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Trainer => "trainer",
            Role::Admin => "admin",
            Role::SuperAdmin => "super_admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a role name is not one of the four known roles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role `{}`", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "trainer" => Ok(Role::Trainer),
            "admin" => Ok(Role::Admin),
            "super_admin" | "superadmin" => Ok(Role::SuperAdmin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Login request sent by the member app and the admin surface
/// # Fields
/// * `identity` - Username or e-mail address
/// * `secret` - Plain-text password
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoginRequest {
    pub identity: String,
    pub secret: String,
}

/// Account creation request
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub secret: String,
}

/// Public view of an account, never carries the password hash or lockout counters
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub id: AccountId,
    pub username: String,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Response to a successful login or signup
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoginResponse {
    /// Bearer token to present as `Authorization: Bearer <token>`
    pub token: String,
    /// The authenticated account
    pub account: AccountSummary,
}

/// Whether a class still has free seats
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Available,
    Full,
}

/// Confirmation of a reserved seat
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationReceipt {
    pub class_id: ClassId,
    pub account_id: AccountId,
    /// Seats taken after this reservation
    pub seats_taken: u32,
    pub capacity: u32,
    /// Occupancy rounded to the nearest percent
    pub capacity_percentage: u8,
    pub status: Availability,
}
