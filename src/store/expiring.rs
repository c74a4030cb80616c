//! In-memory key/value store with a sliding per-entry expiry.
//!
//! Expiry is lazy: a dead entry behaves as absent the moment its deadline
//! passes, whether or not it has been physically removed yet. A passive
//! sweeper can be spawned for memory hygiene but is never required for
//! correctness.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Idle lifetime applied to every entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// Entries never expire; the store is a plain map.
    Never,
    /// Entries expire this long after their last `set` or `get`.
    After(Duration),
}

impl Ttl {
    /// `None` and `Some(0)` both mean "never expire".
    pub fn from_secs(secs: Option<u64>) -> Self {
        match secs {
            Some(secs) if secs > 0 => Self::After(Duration::from_secs(secs)),
            _ => Self::Never,
        }
    }

    /// A lifetime too long to represent as an `Instant` never expires.
    fn deadline(self, now: Instant) -> Option<Instant> {
        match self {
            Self::Never => None,
            Self::After(ttl) => now.checked_add(ttl),
        }
    }
}

struct Entry<V> {
    value: V,
    expires_at: Option<Instant>,
}

impl<V> Entry<V> {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|deadline| now < deadline)
    }
}

/// Thread-safe map whose entries disappear after a period of inactivity.
///
/// Every mutation, including the expiry refresh performed by [`get`](Self::get),
/// happens under a single lock, so a sweep can never drop an entry that was
/// refreshed concurrently.
pub struct ExpiringStore<K, V> {
    entries: Mutex<HashMap<K, Entry<V>>>,
    ttl: Ttl,
}

impl<K, V> ExpiringStore<K, V>
where
    K: Eq + Hash,
{
    pub fn new(ttl: Ttl) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Ttl {
        self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, Entry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or overwrite `key`, resetting its expiry to `now + ttl`.
    pub fn set(&self, key: K, value: V) {
        let expires_at = self.ttl.deadline(Instant::now());
        self.lock().insert(key, Entry { value, expires_at });
    }

    /// Return the live value for `key` and push its expiry out to `now + ttl`.
    ///
    /// A dead entry found here is reclaimed on the spot.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        let now = Instant::now();
        let mut entries = self.lock();
        let live = entries.get(key).map(|entry| entry.is_live(now))?;
        if !live {
            entries.remove(key);
            return None;
        }
        let entry = entries.get_mut(key)?;
        entry.expires_at = self.ttl.deadline(now);
        Some(entry.value.clone())
    }

    /// Liveness check that leaves the expiry untouched.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = Instant::now();
        self.lock()
            .get(key)
            .is_some_and(|entry| entry.is_live(now))
    }

    /// Delete `key` unconditionally, returning its value if it was still live.
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = Instant::now();
        self.lock()
            .remove(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of live entries. Expired-but-unswept entries are not counted.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.lock()
            .values()
            .filter(|entry| entry.is_live(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Physically drop every dead entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        if self.ttl == Ttl::Never {
            return 0;
        }
        let now = Instant::now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }
}

impl<K, V> ExpiringStore<K, V>
where
    K: Eq + Hash + Send + 'static,
    V: Send + 'static,
{
    /// Spawn a background task that purges dead entries every `every`
    /// until `shutdown` is cancelled.
    pub fn spawn_sweeper(
        self: Arc<Self>,
        every: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let purged = self.purge_expired();
                        if purged > 0 {
                            tracing::debug!(purged, "Swept expired entries");
                        }
                    }
                }
            }
            tracing::debug!("Expiry sweeper stopped");
        })
    }
}

impl<K, V> std::fmt::Debug for ExpiringStore<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpiringStore")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
