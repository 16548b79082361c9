// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for metric keys
pub const LOGIN_SUCCEEDED: &str = "auth.login.succeeded";
pub const LOGIN_FAILED: &str = "auth.login.failed";
pub const LOGIN_REJECTED_LOCKED: &str = "auth.login.rejected_locked";
pub const ACCOUNT_LOCKED: &str = "auth.account.locked";
pub const ACCOUNT_CREATED: &str = "auth.account.created";
pub const SEAT_RESERVED: &str = "class.seat.reserved";
pub const SEAT_REJECTED: &str = "class.seat.rejected";
pub const STORE_CONFLICT_RETRY: &str = "store.conflict.retry";
