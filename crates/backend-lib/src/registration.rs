// ============================
// crates/backend-lib/src/registration.rs
// ============================
//! Capacity-bounded class registration.
//!
//! Seats for one class are granted one request at a time: the registrar holds
//! a per-class lock while it reads the session and asks the store for a
//! conditional reservation. The store refuses the write if `seats_taken`
//! moved since the read, which also covers writers in other processes.
use std::sync::Arc;

use gymtrack_common::{AccountId, ClassId, RegistrationReceipt};
use metrics::counter;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::DEFAULT_MAX_CONFLICT_RETRIES;
use crate::error::AppError;
use crate::keyed_lock::KeyedLocks;
use crate::metrics::{SEAT_REJECTED, SEAT_RESERVED, STORE_CONFLICT_RETRY};
use crate::models::ClassSession;
use crate::storage::{ClassStore, StoreError};

/// Grants class seats without ever exceeding capacity
pub struct Registrar {
    classes: Arc<dyn ClassStore>,
    locks: KeyedLocks<ClassId>,
    max_conflict_retries: u32,
}

impl Registrar {
    pub fn new(classes: Arc<dyn ClassStore>) -> Self {
        Self {
            classes,
            locks: KeyedLocks::new(),
            max_conflict_retries: DEFAULT_MAX_CONFLICT_RETRIES,
        }
    }

    pub fn with_max_conflict_retries(mut self, retries: u32) -> Self {
        self.max_conflict_retries = retries;
        self
    }

    /// Create and store an empty class
    pub async fn open_class(&self, name: &str, capacity: u32) -> Result<ClassSession, AppError> {
        let session = ClassSession::new(Uuid::new_v4(), name, capacity)?;
        let session = self.classes.insert(session).await?;
        info!(class_id = %session.id(), capacity, "class opened");
        Ok(session)
    }

    pub async fn class(&self, class_id: ClassId) -> Result<ClassSession, AppError> {
        self.classes
            .find_by_id(class_id)
            .await?
            .ok_or(AppError::ClassNotFound)
    }

    /// Reserve a seat in `class_id` for `account_id`.
    ///
    /// Fails with `ClassNotFound`, `AlreadyRegistered` (seat count untouched)
    /// or `ClassFull`. `StoreConflict` is returned only once the retry budget
    /// is spent and the class still has room.
    pub async fn register(
        &self,
        class_id: ClassId,
        account_id: AccountId,
    ) -> Result<RegistrationReceipt, AppError> {
        let _guard = self.locks.lock(class_id).await;

        let mut attempt = 0;
        loop {
            let session = self.class(class_id).await?;
            Self::check_admissible(&session, account_id)?;

            match self
                .classes
                .conditional_reserve(class_id, session.seats_taken(), account_id)
                .await
            {
                Ok(updated) => {
                    counter!(SEAT_RESERVED).increment(1);
                    info!(
                        class_id = %class_id,
                        account_id = %account_id,
                        seats_taken = updated.seats_taken(),
                        capacity = updated.capacity(),
                        "seat reserved"
                    );
                    return Ok(receipt(&updated, account_id));
                },
                Err(StoreError::NotFound) => return Err(AppError::ClassNotFound),
                Err(StoreError::Conflict) if attempt < self.max_conflict_retries => {
                    attempt += 1;
                    counter!(STORE_CONFLICT_RETRY).increment(1);
                    debug!(class_id = %class_id, attempt, "seat reservation conflicted, re-reading");
                },
                Err(StoreError::Conflict) => {
                    // Budget spent: report the terminal outcome if there is one
                    let session = self.class(class_id).await?;
                    Self::check_admissible(&session, account_id)?;
                    return Err(AppError::StoreConflict);
                },
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn check_admissible(session: &ClassSession, account_id: AccountId) -> Result<(), AppError> {
        if session.is_registered(account_id) {
            counter!(SEAT_REJECTED).increment(1);
            debug!(class_id = %session.id(), account_id = %account_id, "already registered");
            return Err(AppError::AlreadyRegistered);
        }
        if session.is_full() {
            counter!(SEAT_REJECTED).increment(1);
            debug!(class_id = %session.id(), account_id = %account_id, "class full");
            return Err(AppError::ClassFull);
        }
        Ok(())
    }
}

fn receipt(session: &ClassSession, account_id: AccountId) -> RegistrationReceipt {
    RegistrationReceipt {
        class_id: session.id(),
        account_id,
        seats_taken: session.seats_taken(),
        capacity: session.capacity(),
        capacity_percentage: session.capacity_percentage(),
        status: session.availability(),
    }
}
