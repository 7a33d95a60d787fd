// libs/booking-cell/src/services/lock.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::BookingError;

/// Deterministic lock key built from typed parts, so the same logical
/// resource always maps to the same string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LockKey(String);

impl LockKey {
    /// Key guarding one (provider, slot start) combination. Distinct slots
    /// of the same provider get distinct keys and never contend.
    pub fn slot(provider_id: Uuid, start_time: DateTime<Utc>) -> Self {
        Self(format!("slot:{}:{}", provider_id, start_time.timestamp()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// TTL-bounded, non-blocking mutual exclusion over string keys.
#[async_trait]
pub trait LockManager: Send + Sync {
    /// Record `key` as held until now + ttl iff no unexpired record exists.
    /// Never blocks; a contended key fails immediately.
    async fn acquire(&self, key: &LockKey, ttl: Duration) -> bool;

    /// Drop the record for `key`. Releasing an absent key is a no-op.
    async fn release(&self, key: &LockKey);
}

/// Acquire `key`, run `operation`, and release on every path. An error from
/// the operation propagates unchanged after the release.
pub async fn run_exclusive<T, F, Fut>(
    locks: &dyn LockManager,
    key: LockKey,
    ttl: Duration,
    operation: F,
) -> Result<T, BookingError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, BookingError>>,
{
    if !locks.acquire(&key, ttl).await {
        debug!("Lock {} is contended", key);
        return Err(BookingError::LockUnavailable);
    }

    let result = operation().await;
    locks.release(&key).await;
    result
}

/// Single-process lock table. Expiry is checked at acquire time; the reaper
/// only bounds the table's memory and is never load-bearing for correctness.
#[derive(Default)]
pub struct InMemoryLockManager {
    held: Mutex<HashMap<LockKey, Instant>>,
}

impl InMemoryLockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every expired record. Returns how many were removed.
    pub async fn sweep_expired(&self) -> usize {
        let mut held = self.held.lock().await;
        let before = held.len();
        let now = Instant::now();
        held.retain(|_, deadline| *deadline > now);
        let removed = before - held.len();
        if removed > 0 {
            debug!("Lock reaper removed {} expired records", removed);
        }
        removed
    }

    /// Spawn the background reaper. The handle can be aborted on shutdown;
    /// correctness does not depend on the reaper running at all.
    pub fn spawn_reaper(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                manager.sweep_expired().await;
            }
        })
    }

    #[cfg(test)]
    pub async fn held_count(&self) -> usize {
        self.held.lock().await.len()
    }
}

#[async_trait]
impl LockManager for InMemoryLockManager {
    async fn acquire(&self, key: &LockKey, ttl: Duration) -> bool {
        let mut held = self.held.lock().await;
        let now = Instant::now();

        if let Some(deadline) = held.get(key) {
            if *deadline > now {
                return false;
            }
            warn!("Lock {} had expired without release, reclaiming", key);
        }

        held.insert(key.clone(), now + ttl);
        true
    }

    async fn release(&self, key: &LockKey) {
        self.held.lock().await.remove(key);
    }
}
