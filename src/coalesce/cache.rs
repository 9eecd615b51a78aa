//! Result cache collaborator and a TTL-based implementation

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::debug;

/// Settled-result store consulted by a [`Coalescer`](super::Coalescer)
/// before invoking its producer. The expiry policy is entirely the
/// implementation's concern.
pub trait ResultCache<R>: Send + Sync {
    /// The present entry for `key`, if any.
    ///
    /// Presence, not truthiness: a cached zero, empty string, or `false`
    /// is a hit.
    fn get_if_present(&self, key: &str) -> Option<R>;

    /// Store a successful result under `key`.
    fn set(&self, key: &str, value: R);
}

struct TtlEntry<R> {
    written_at: Instant,
    value: R,
}

/// [`ResultCache`] whose entries expire a fixed duration after write.
///
/// Expired entries are dropped lazily on read.
pub struct TtlCache<R> {
    ttl: Duration,
    entries: Mutex<HashMap<String, TtlEntry<R>>>,
}

impl<R> TtlCache<R> {
    /// Create a cache whose entries expire `ttl` after they are written.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Number of stored entries, expired ones included until they are
    /// read again.
    pub fn len(&self) -> usize {
        self.entries.lock().expect("ttl cache lock poisoned").len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<R: Clone + Send> ResultCache<R> for TtlCache<R> {
    fn get_if_present(&self, key: &str) -> Option<R> {
        let mut entries = self.entries.lock().expect("ttl cache lock poisoned");
        match entries.get(key) {
            Some(entry) if entry.written_at.elapsed() < self.ttl => Some(entry.value.clone()),
            Some(_) => {
                debug!(%key, "entry expired");
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn set(&self, key: &str, value: R) {
        let mut entries = self.entries.lock().expect("ttl cache lock poisoned");
        entries.insert(
            key.to_string(),
            TtlEntry {
                written_at: Instant::now(),
                value,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_if_present_within_ttl() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.set("k", 7);

        assert_eq!(cache.get_if_present("k"), Some(7));
        assert_eq!(cache.get_if_present("other"), None);
    }

    #[test]
    fn test_expired_entry_is_dropped() {
        let cache = TtlCache::new(Duration::from_millis(20));
        cache.set("k", 7);
        assert_eq!(cache.len(), 1);

        std::thread::sleep(Duration::from_millis(40));

        assert_eq!(cache.get_if_present("k"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_value_is_present() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.set("k", 0);

        // Falsy values are valid hits.
        assert_eq!(cache.get_if_present("k"), Some(0));
    }

    #[test]
    fn test_rewrite_refreshes_expiry() {
        let cache = TtlCache::new(Duration::from_millis(50));
        cache.set("k", 1);

        std::thread::sleep(Duration::from_millis(30));
        cache.set("k", 2);
        std::thread::sleep(Duration::from_millis(30));

        // 60 ms after the first write but only 30 ms after the second.
        assert_eq!(cache.get_if_present("k"), Some(2));
    }
}
