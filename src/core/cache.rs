//! Per-user transaction history cache
//!
//! Keeps each user's decoded history for a configurable time-to-live so that
//! repeated reads (budget panel refreshes, chart redraws) do not rescan the
//! ledger. The clock is injected, which keeps expiry deterministic in tests.
//!
//! # Consistency
//!
//! Writers must call [`TransactionCache::invalidate`] (or `clear`) after every
//! successful mutation of the ledger, before returning to their caller. Reads
//! issued afterwards always observe the write.
//!
//! # Thread Safety
//!
//! Entries live in a `DashMap`, so a shared cache can be read and invalidated
//! from several threads. A shard guard is never held while loading or inserting.

use crate::core::traits::Clock;
use crate::types::{user_key, LedgerError, Transaction};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Wall-clock time source
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced time source
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset_nanos: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        ManualClock {
            origin: Instant::now(),
            offset_nanos: AtomicU64::new(0),
        }
    }

    /// Move the clock forward by `by`
    pub fn advance(&self, by: Duration) {
        let nanos = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        self.offset_nanos.fetch_add(nanos, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + Duration::from_nanos(self.offset_nanos.load(Ordering::SeqCst))
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    history: Arc<Vec<Transaction>>,
    loaded_at: Instant,
}

/// TTL cache of user histories keyed by [`user_key`]
#[derive(Debug)]
pub struct TransactionCache<C: Clock = SystemClock> {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
    clock: C,
}

impl TransactionCache<SystemClock> {
    /// Create a cache on the system clock
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, SystemClock)
    }
}

impl<C: Clock> TransactionCache<C> {
    /// Create a cache on an injected clock
    pub fn with_clock(ttl: Duration, clock: C) -> Self {
        TransactionCache {
            entries: DashMap::new(),
            ttl,
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached history of `username`, loading it on a miss or expiry
    ///
    /// # Arguments
    ///
    /// * `username` - The user whose history is requested
    /// * `load` - Called to read the history when no fresh entry exists
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `load`; nothing is cached in that case.
    pub fn get_or_load<F>(&self, username: &str, load: F) -> Result<Arc<Vec<Transaction>>, LedgerError>
    where
        F: FnOnce() -> Result<Vec<Transaction>, LedgerError>,
    {
        let key = user_key(username);
        let now = self.clock.now();

        let fresh = self
            .entries
            .get(&key)
            .filter(|entry| now.saturating_duration_since(entry.loaded_at) < self.ttl)
            .map(|entry| Arc::clone(&entry.history));
        if let Some(history) = fresh {
            tracing::trace!(username = %key, "History cache hit");
            return Ok(history);
        }

        tracing::debug!(username = %key, "History cache miss");
        let history = Arc::new(load()?);
        self.entries.insert(
            key,
            CacheEntry {
                history: Arc::clone(&history),
                loaded_at: now,
            },
        );
        Ok(history)
    }

    /// Drop the cached history of `username`
    pub fn invalidate(&self, username: &str) {
        self.entries.remove(&user_key(username));
    }

    /// Drop every cached history
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of cached users, fresh or stale
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
