//! Auto-lock session guard: a one-way `Unlocked -> Locked` gate driven by a
//! last-activity timestamp, cleared only by password verification or an
//! explicit reset. Callers poll it on a fixed interval; activity updates are
//! event-driven.

use chrono::{DateTime, Duration, Utc};
use log::warn;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::models::LockConfig;
use crate::storage::{Storage, StorageError};

/// Suggested wall-clock spacing between `poll` calls.
pub const POLL_INTERVAL_SECS: u64 = 30;

pub const MIN_TIMEOUT_MINUTES: u32 = 1;
pub const MAX_TIMEOUT_MINUTES: u32 = 60;

#[derive(Debug, Error)]
pub enum GuardError {
    #[error(
        "Auto-lock timeout must be between {MIN_TIMEOUT_MINUTES} and {MAX_TIMEOUT_MINUTES} minutes, got {0}"
    )]
    InvalidTimeout(u32),
    #[error("No password has been configured")]
    NoPassword,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Unlocked,
    Locked,
}

pub struct SessionGuard<S: Storage> {
    storage: S,
    config: LockConfig,
    password_hash: Option<String>,
    state: LockState,
}

pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

impl<S: Storage> SessionGuard<S> {
    /// Load guard state from storage. A guard that is enabled and has a
    /// password starts locked; everything else starts unlocked.
    pub fn load(storage: S) -> Result<Self, GuardError> {
        let config = storage.load_lock_config()?;
        let password_hash = storage.load_password_hash()?;
        let state = if config.is_enabled && password_hash.is_some() {
            LockState::Locked
        } else {
            LockState::Unlocked
        };
        Ok(Self {
            storage,
            config,
            password_hash,
            state,
        })
    }

    pub fn state(&self) -> LockState {
        self.state
    }

    pub fn is_locked(&self) -> bool {
        self.state == LockState::Locked
    }

    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }

    /// Any tracked activity resets the inactivity window.
    pub fn record_activity(&mut self, now: DateTime<Utc>) {
        self.config.last_activity = now.timestamp_millis();
        self.persist_config();
    }

    /// Interval check: locks when the guard is enabled, a password exists,
    /// and the inactivity window has elapsed. Never unlocks.
    pub fn poll(&mut self, now: DateTime<Utc>) -> LockState {
        if self.state == LockState::Locked {
            return self.state;
        }
        if !self.config.is_enabled || self.password_hash.is_none() {
            return self.state;
        }
        let last = DateTime::from_timestamp_millis(self.config.last_activity)
            .unwrap_or_else(|| now - Duration::minutes(i64::from(self.config.auto_lock_timeout)));
        let idle = now - last;
        if idle >= Duration::minutes(i64::from(self.config.auto_lock_timeout)) {
            self.state = LockState::Locked;
        }
        self.state
    }

    pub fn lock(&mut self) {
        self.state = LockState::Locked;
    }

    /// Verify the password. Success unlocks, resets the failed-attempt
    /// counter and the activity window; failure increments the counter.
    pub fn unlock(&mut self, password: &str, now: DateTime<Utc>) -> Result<bool, GuardError> {
        let Some(stored) = &self.password_hash else {
            return Err(GuardError::NoPassword);
        };
        if hash_password(password) == *stored {
            self.state = LockState::Unlocked;
            self.config.failed_attempts = 0;
            self.config.last_activity = now.timestamp_millis();
            self.persist_config();
            Ok(true)
        } else {
            self.config.failed_attempts += 1;
            self.persist_config();
            Ok(false)
        }
    }

    /// Store a new password hash and enable the guard.
    pub fn set_password(&mut self, password: &str, now: DateTime<Utc>) -> Result<(), GuardError> {
        let hash = hash_password(password);
        self.storage.save_password_hash(&hash)?;
        self.password_hash = Some(hash);
        self.config.is_enabled = true;
        self.config.failed_attempts = 0;
        self.config.last_activity = now.timestamp_millis();
        self.storage.save_lock_config(&self.config)?;
        Ok(())
    }

    /// Enable or disable auto-locking. Disabling never unlocks an already
    /// locked session; that requires the password.
    pub fn set_enabled(&mut self, enabled: bool) -> Result<(), GuardError> {
        self.config.is_enabled = enabled;
        self.storage.save_lock_config(&self.config)?;
        Ok(())
    }

    /// Remove the password entirely: unlocks, disables auto-locking and
    /// clears the failed-attempt counter. The explicit reset path.
    pub fn reset(&mut self) -> Result<(), GuardError> {
        self.storage.save_password_hash("")?;
        self.password_hash = None;
        self.state = LockState::Unlocked;
        self.config.is_enabled = false;
        self.config.failed_attempts = 0;
        self.storage.save_lock_config(&self.config)?;
        Ok(())
    }

    /// Set the inactivity timeout in minutes. Out-of-range values are
    /// rejected without touching state.
    pub fn set_timeout(&mut self, minutes: u32) -> Result<(), GuardError> {
        if !(MIN_TIMEOUT_MINUTES..=MAX_TIMEOUT_MINUTES).contains(&minutes) {
            return Err(GuardError::InvalidTimeout(minutes));
        }
        self.config.auto_lock_timeout = minutes;
        self.storage.save_lock_config(&self.config)?;
        Ok(())
    }

    fn persist_config(&mut self) {
        if let Err(e) = self.storage.save_lock_config(&self.config) {
            warn!("failed to persist lock config: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn t0() -> DateTime<Utc> {
        "2025-06-01T12:00:00Z".parse().unwrap()
    }

    fn armed_guard(timeout_minutes: u32) -> SessionGuard<MemoryStorage> {
        let mut guard = SessionGuard::load(MemoryStorage::new()).unwrap();
        guard.set_password("hunter2", t0()).unwrap();
        guard.set_timeout(timeout_minutes).unwrap();
        guard.state = LockState::Unlocked;
        guard
    }

    #[test]
    fn locks_after_the_inactivity_window() {
        let mut guard = armed_guard(1);
        assert_eq!(guard.poll(t0() + Duration::seconds(59)), LockState::Unlocked);
        assert_eq!(guard.poll(t0() + Duration::seconds(61)), LockState::Locked);
    }

    #[test]
    fn activity_resets_the_window() {
        let mut guard = armed_guard(1);
        guard.record_activity(t0() + Duration::seconds(45));
        assert_eq!(guard.poll(t0() + Duration::seconds(61)), LockState::Unlocked);
        assert_eq!(guard.poll(t0() + Duration::seconds(106)), LockState::Locked);
    }

    #[test]
    fn disabling_does_not_unlock() {
        let mut guard = armed_guard(1);
        guard.poll(t0() + Duration::minutes(5));
        assert!(guard.is_locked());
        guard.set_enabled(false).unwrap();
        assert!(guard.is_locked());
        assert!(guard.unlock("hunter2", t0() + Duration::minutes(6)).unwrap());
        assert!(!guard.is_locked());
    }

    #[test]
    fn wrong_password_counts_failed_attempts() {
        let mut guard = armed_guard(1);
        guard.lock();
        assert!(!guard.unlock("nope", t0()).unwrap());
        assert!(!guard.unlock("still nope", t0()).unwrap());
        assert_eq!(guard.config().failed_attempts, 2);
        assert!(guard.is_locked());
        assert!(guard.unlock("hunter2", t0()).unwrap());
        assert_eq!(guard.config().failed_attempts, 0);
    }

    #[test]
    fn timeout_range_is_validated_without_mutating() {
        let mut guard = armed_guard(10);
        assert!(matches!(
            guard.set_timeout(0),
            Err(GuardError::InvalidTimeout(0))
        ));
        assert!(matches!(
            guard.set_timeout(61),
            Err(GuardError::InvalidTimeout(61))
        ));
        assert_eq!(guard.config().auto_lock_timeout, 10);
    }

    #[test]
    fn reset_removes_the_password_and_unlocks() {
        let mut guard = armed_guard(1);
        guard.lock();
        guard.reset().unwrap();
        assert!(!guard.is_locked());
        assert!(!guard.has_password());
        assert!(!guard.config().is_enabled);
        assert_eq!(guard.poll(t0() + Duration::hours(1)), LockState::Unlocked);
    }

    #[test]
    fn guard_without_password_never_locks() {
        let mut guard = SessionGuard::load(MemoryStorage::new()).unwrap();
        guard.set_enabled(true).unwrap();
        assert_eq!(guard.poll(t0() + Duration::hours(5)), LockState::Unlocked);
        assert!(matches!(guard.unlock("x", t0()), Err(GuardError::NoPassword)));
    }

    #[test]
    fn enabled_guard_with_password_starts_locked() {
        let mut storage = MemoryStorage::new();
        storage.save_password_hash(&hash_password("pw")).unwrap();
        let mut config = LockConfig::default();
        config.is_enabled = true;
        storage.save_lock_config(&config).unwrap();

        let guard = SessionGuard::load(storage).unwrap();
        assert!(guard.is_locked());
    }
}
