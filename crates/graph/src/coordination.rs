//! Coordination-service seam for the distributed identifier allocator.
//!
//! The contract is deliberately small: a linearizable counter (`get`/`set`/
//! `increment`) plus mutual exclusion with bounded-wait acquisition. The
//! in-memory implementation exists so the allocator's locking and failure
//! behavior is testable without a real coordination service: tests can hold
//! the lock, inject latency, or flip the backend to unavailable.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoordinationError {
    /// The coordination service is unreachable.
    #[error("coordination service unavailable: {0}")]
    Unavailable(String),

    /// The lock was not acquired within the bounded wait.
    #[error("lock '{key}' not acquired within {timeout:?}")]
    LockTimeout { key: String, timeout: Duration },

    /// A lease was presented that the service no longer recognizes.
    #[error("stale lock lease for '{key}'")]
    StaleLease { key: String },
}

/// Proof of a held lock, returned by [`CoordinationClient::acquire`] and
/// consumed by [`CoordinationClient::release`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockLease {
    pub key: String,
    pub token: u64,
}

/// Linearizable counter plus mutual exclusion, as provided by an external
/// coordination service.
pub trait CoordinationClient: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<u64>, CoordinationError>;

    fn set(&self, key: &str, value: u64) -> Result<(), CoordinationError>;

    /// Atomically add `delta` and return the new value. A missing key counts
    /// from zero.
    fn increment(&self, key: &str, delta: u64) -> Result<u64, CoordinationError>;

    /// Acquire the named lock, waiting at most `timeout`.
    fn acquire(&self, key: &str, timeout: Duration) -> Result<LockLease, CoordinationError>;

    fn release(&self, lease: LockLease) -> Result<(), CoordinationError>;
}

impl<C> CoordinationClient for Arc<C>
where
    C: CoordinationClient + ?Sized,
{
    fn get(&self, key: &str) -> Result<Option<u64>, CoordinationError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: u64) -> Result<(), CoordinationError> {
        (**self).set(key, value)
    }

    fn increment(&self, key: &str, delta: u64) -> Result<u64, CoordinationError> {
        (**self).increment(key, delta)
    }

    fn acquire(&self, key: &str, timeout: Duration) -> Result<LockLease, CoordinationError> {
        (**self).acquire(key, timeout)
    }

    fn release(&self, lease: LockLease) -> Result<(), CoordinationError> {
        (**self).release(lease)
    }
}

/// In-process fake of a coordination service.
///
/// Linearizability comes from a single mutex over the value table; locks are
/// leases in a held-set with a condvar for bounded waiting. `set_latency`
/// delays counter operations and `set_unavailable` fails every call, so the
/// allocator's bounded-wait and fail-fast paths can be driven from tests.
#[derive(Debug, Default)]
pub struct InMemoryCoordination {
    values: Mutex<HashMap<String, u64>>,
    held: Mutex<HashSet<String>>,
    released: Condvar,
    lease_tokens: AtomicU64,
    unavailable: AtomicBool,
    latency_ms: AtomicU64,
}

impl InMemoryCoordination {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every subsequent call with `Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Delay counter operations by the given amount.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), CoordinationError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CoordinationError::Unavailable(
                "backend marked unavailable".to_string(),
            ));
        }
        Ok(())
    }

    fn simulate_latency(&self) {
        let ms = self.latency_ms.load(Ordering::SeqCst);
        if ms > 0 {
            std::thread::sleep(Duration::from_millis(ms));
        }
    }
}

impl CoordinationClient for InMemoryCoordination {
    fn get(&self, key: &str) -> Result<Option<u64>, CoordinationError> {
        self.check_available()?;
        self.simulate_latency();
        Ok(self.values.lock().expect("value table poisoned").get(key).copied())
    }

    fn set(&self, key: &str, value: u64) -> Result<(), CoordinationError> {
        self.check_available()?;
        self.simulate_latency();
        self.values
            .lock()
            .expect("value table poisoned")
            .insert(key.to_string(), value);
        Ok(())
    }

    fn increment(&self, key: &str, delta: u64) -> Result<u64, CoordinationError> {
        self.check_available()?;
        self.simulate_latency();
        let mut values = self.values.lock().expect("value table poisoned");
        let slot = values.entry(key.to_string()).or_insert(0);
        *slot += delta;
        Ok(*slot)
    }

    fn acquire(&self, key: &str, timeout: Duration) -> Result<LockLease, CoordinationError> {
        self.check_available()?;
        let deadline = Instant::now() + timeout;
        let mut held = self.held.lock().expect("lock table poisoned");
        while held.contains(key) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(CoordinationError::LockTimeout {
                    key: key.to_string(),
                    timeout,
                });
            }
            let (guard, wait) = self
                .released
                .wait_timeout(held, remaining)
                .expect("lock table poisoned");
            held = guard;
            if wait.timed_out() && held.contains(key) {
                return Err(CoordinationError::LockTimeout {
                    key: key.to_string(),
                    timeout,
                });
            }
        }
        held.insert(key.to_string());
        Ok(LockLease {
            key: key.to_string(),
            token: self.lease_tokens.fetch_add(1, Ordering::SeqCst),
        })
    }

    fn release(&self, lease: LockLease) -> Result<(), CoordinationError> {
        let mut held = self.held.lock().expect("lock table poisoned");
        if !held.remove(&lease.key) {
            return Err(CoordinationError::StaleLease { key: lease.key });
        }
        self.released.notify_all();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn counter_increments_from_zero() {
        let coord = InMemoryCoordination::new();
        assert_eq!(coord.get("n").unwrap(), None);
        assert_eq!(coord.increment("n", 1).unwrap(), 1);
        assert_eq!(coord.increment("n", 2).unwrap(), 3);
        assert_eq!(coord.get("n").unwrap(), Some(3));
    }

    #[test]
    fn held_lock_times_out_other_acquirers() {
        let coord = InMemoryCoordination::new();
        let lease = coord.acquire("lock", Duration::from_millis(50)).unwrap();

        let err = coord
            .acquire("lock", Duration::from_millis(20))
            .unwrap_err();
        assert!(matches!(err, CoordinationError::LockTimeout { .. }));

        coord.release(lease).unwrap();
        let lease = coord.acquire("lock", Duration::from_millis(20)).unwrap();
        coord.release(lease).unwrap();
    }

    #[test]
    fn release_unblocks_waiters() {
        let coord = Arc::new(InMemoryCoordination::new());
        let lease = coord.acquire("lock", Duration::from_millis(50)).unwrap();

        let waiter = {
            let coord = Arc::clone(&coord);
            std::thread::spawn(move || coord.acquire("lock", Duration::from_secs(2)))
        };

        std::thread::sleep(Duration::from_millis(20));
        coord.release(lease).unwrap();
        let lease = waiter.join().unwrap().unwrap();
        coord.release(lease).unwrap();
    }

    #[test]
    fn double_release_reports_stale_lease() {
        let coord = InMemoryCoordination::new();
        let lease = coord.acquire("lock", Duration::from_millis(50)).unwrap();
        coord.release(lease.clone()).unwrap();
        assert!(matches!(
            coord.release(lease),
            Err(CoordinationError::StaleLease { .. })
        ));
    }

    #[test]
    fn unavailable_backend_fails_every_call() {
        let coord = InMemoryCoordination::new();
        coord.set_unavailable(true);
        assert!(coord.get("n").is_err());
        assert!(coord.increment("n", 1).is_err());
        assert!(coord.acquire("lock", Duration::from_millis(10)).is_err());
    }
}
