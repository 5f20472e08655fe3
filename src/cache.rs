//! A generic in-memory TTL cache (spec §5), used for the schedule (300s),
//! assignment list (600s), and per-lesson detail (300s) caches the domain API
//! keeps. The clock is injectable so expiry tests don't sleep.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(derive_new::new)]
struct Entry<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: Mutex<HashMap<K, Entry<V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        TtlCache { ttl, entries: Mutex::new(HashMap::new()) }
    }

    pub async fn get(&self, key: &K, clock: &dyn Clock) -> Option<V> {
        let entries = self.entries.lock().await;
        let entry = entries.get(key)?;
        if entry.expires_at > clock.now() { Some(entry.value.clone()) } else { None }
    }

    pub async fn put(&self, key: K, value: V, clock: &dyn Clock) {
        let expires_at = clock.now() + chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::zero());
        self.entries.lock().await.insert(key, Entry::new(value, expires_at));
    }

    pub async fn invalidate(&self, key: &K) {
        self.entries.lock().await.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct FakeClock(Cell<DateTime<Utc>>);

    impl Clock for FakeClock {
        fn now(&self) -> DateTime<Utc> {
            self.0.get()
        }
    }

    fn epoch() -> DateTime<Utc> {
        DateTime::from_timestamp(0, 0).unwrap()
    }

    #[tokio::test]
    async fn entry_is_visible_before_expiry() {
        let cache: TtlCache<&str, i32> = TtlCache::new(Duration::from_secs(300));
        let clock = FakeClock(Cell::new(epoch()));
        cache.put("schedule", 7, &clock).await;
        clock.0.set(epoch() + chrono::Duration::seconds(299));
        assert_eq!(cache.get(&"schedule", &clock).await, Some(7));
    }

    #[tokio::test]
    async fn entry_expires_after_ttl() {
        let cache: TtlCache<&str, i32> = TtlCache::new(Duration::from_secs(300));
        let clock = FakeClock(Cell::new(epoch()));
        cache.put("schedule", 7, &clock).await;
        clock.0.set(epoch() + chrono::Duration::seconds(301));
        assert_eq!(cache.get(&"schedule", &clock).await, None);
    }
}
