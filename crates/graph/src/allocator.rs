//! Unique, strictly increasing vertex index allocation.
//!
//! Every vertex index is issued exactly once. The in-process allocator is an
//! atomic counter, suitable for a single process or tests; the coordinated
//! allocator serializes increments of a counter held by an external
//! coordination service through a bounded-wait lock, so concurrent callers
//! across process instances observe a globally unique, strictly increasing
//! sequence.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error};

use crate::coordination::{CoordinationClient, CoordinationError, LockLease};

/// Default bound on waiting for the coordination lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(250);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AllocatorError {
    /// The backing counter cannot be reached or committed to. There is no
    /// "allocate later" path; the caller must retry the whole create
    /// operation.
    #[error("allocator backend unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Coordination(#[from] CoordinationError),
}

/// Issues unique, strictly increasing 64-bit vertex indices.
pub trait IdAllocator: Send + Sync {
    /// Return a value strictly greater than every previously returned value
    /// across all concurrent callers sharing the backing counter. Never
    /// returns the same value twice.
    fn next(&self) -> Result<u64, AllocatorError>;

    /// The most recently issued value.
    fn current(&self) -> Result<u64, AllocatorError>;

    /// Reset the counter; the following `next` returns `value + 1`.
    fn set_current(&self, value: u64) -> Result<(), AllocatorError>;
}

impl<A> IdAllocator for Arc<A>
where
    A: IdAllocator + ?Sized,
{
    fn next(&self) -> Result<u64, AllocatorError> {
        (**self).next()
    }

    fn current(&self) -> Result<u64, AllocatorError> {
        (**self).current()
    }

    fn set_current(&self, value: u64) -> Result<(), AllocatorError> {
        (**self).set_current(value)
    }
}

/// Atomically incremented in-memory counter seeded at 0; the first `next`
/// returns 1. Suitable only for a single-process deployment or tests.
#[derive(Debug, Default)]
pub struct InProcessAllocator {
    counter: AtomicU64,
}

impl InProcessAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(value: u64) -> Self {
        Self {
            counter: AtomicU64::new(value),
        }
    }
}

impl IdAllocator for InProcessAllocator {
    fn next(&self) -> Result<u64, AllocatorError> {
        Ok(self.counter.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn current(&self) -> Result<u64, AllocatorError> {
        Ok(self.counter.load(Ordering::SeqCst))
    }

    fn set_current(&self, value: u64) -> Result<(), AllocatorError> {
        self.counter.store(value, Ordering::SeqCst);
        Ok(())
    }
}

/// Seed source consulted the first time the shared counter is found unseeded
/// (e.g. the highest index already present in a durable store).
pub trait CurrentIdSource: Send + Sync {
    fn current_id(&self) -> u64;
}

/// Seeds an unseeded counter at zero.
#[derive(Debug, Default)]
pub struct ZeroIdSource;

impl CurrentIdSource for ZeroIdSource {
    fn current_id(&self) -> u64 {
        0
    }
}

/// Phase of a single coordinated-counter operation.
///
/// Kept explicit so the bounded-wait behavior is observable and testable:
/// every operation is Idle → AcquiringLock → Incrementing →
/// Committed/Failed, and a lock that cannot be acquired within the bound
/// fails the operation rather than silently retrying.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Phase {
    Idle,
    AcquiringLock,
    Incrementing,
    Committed,
    Failed,
}

/// Counter held by an external linearizable coordination service, guarded by
/// a mutual-exclusion lock with bounded wait.
pub struct CoordinatedAllocator<C> {
    client: C,
    counter_key: String,
    seeded_key: String,
    lock_key: String,
    lock_timeout: Duration,
    seed_source: Arc<dyn CurrentIdSource>,
}

impl<C: CoordinationClient> CoordinatedAllocator<C> {
    /// `prefix` namespaces the counter, seed flag and lock within the
    /// coordination service, so independent deployments can share one
    /// service.
    pub fn new(client: C, prefix: &str) -> Self {
        Self {
            client,
            counter_key: format!("{prefix}/index"),
            seeded_key: format!("{prefix}/index-seeded"),
            lock_key: format!("{prefix}/index-lock"),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            seed_source: Arc::new(ZeroIdSource),
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn with_seed_source(mut self, source: Arc<dyn CurrentIdSource>) -> Self {
        self.seed_source = source;
        self
    }

    /// Run `op` while holding the counter lock, releasing it on every exit
    /// path and tracking the operation's phase.
    fn locked<T>(
        &self,
        op: impl FnOnce(&C) -> Result<T, CoordinationError>,
    ) -> Result<T, AllocatorError> {
        let mut phase = Phase::Idle;
        debug!(phase = ?phase, key = %self.counter_key, "coordinated counter operation");

        phase = Phase::AcquiringLock;
        debug!(phase = ?phase, key = %self.lock_key, "acquiring counter lock");
        let lease: LockLease = match self.client.acquire(&self.lock_key, self.lock_timeout) {
            Ok(lease) => lease,
            Err(err) => {
                phase = Phase::Failed;
                error!(phase = ?phase, %err, "failed to acquire counter lock");
                return Err(err.into());
            }
        };

        phase = Phase::Incrementing;
        debug!(phase = ?phase, "counter lock held");
        let result = op(&self.client);

        if let Err(release_err) = self.client.release(lease) {
            // The operation result still stands; a failed release only
            // matters for subsequent acquirers, who will time out.
            error!(%release_err, "failed to release counter lock");
        }

        match result {
            Ok(value) => {
                phase = Phase::Committed;
                debug!(phase = ?phase, "coordinated counter operation committed");
                Ok(value)
            }
            Err(err) => {
                phase = Phase::Failed;
                error!(phase = ?phase, %err, "coordinated counter operation failed");
                Err(err.into())
            }
        }
    }

    /// Seed the counter from the configured source if it has never been
    /// seeded. Callers must hold the lock.
    fn ensure_seeded(&self, client: &C) -> Result<(), CoordinationError> {
        if client.get(&self.seeded_key)? == Some(1) {
            return Ok(());
        }
        let seed = self.seed_source.current_id();
        debug!(seed, key = %self.counter_key, "seeding coordinated counter");
        client.set(&self.counter_key, seed)?;
        client.set(&self.seeded_key, 1)?;
        Ok(())
    }
}

impl<C: CoordinationClient> IdAllocator for CoordinatedAllocator<C> {
    fn next(&self) -> Result<u64, AllocatorError> {
        self.locked(|client| {
            self.ensure_seeded(client)?;
            client.increment(&self.counter_key, 1)
        })
    }

    fn current(&self) -> Result<u64, AllocatorError> {
        self.locked(|client| {
            self.ensure_seeded(client)?;
            client.get(&self.counter_key).map(|v| v.unwrap_or(0))
        })
    }

    fn set_current(&self, value: u64) -> Result<(), AllocatorError> {
        self.locked(|client| {
            client.set(&self.counter_key, value)?;
            client.set(&self.seeded_key, 1)
        })
    }
}
