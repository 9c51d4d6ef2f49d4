use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use snip_core::error::Result;
use snip_core::{
    Clock, MappingStore, MappingUpdate, ShortCode, StorageError, SystemClock, UrlMapping,
};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

/// Number of creates between full sweeps of expired entries.
pub const SWEEP_INTERVAL: u64 = 1024;

/// In-memory implementation of [`MappingStore`] using DashMap.
///
/// Conditional create and atomic update both run while holding the
/// key's shard lock, so racing writers on one code serialize without any
/// lock in the caller. Mappings whose `expires_at` has passed are treated
/// as evicted: reads skip them and a new create may take over the code.
/// Every [`SWEEP_INTERVAL`] creates the whole map is swept, so mappings that
/// are never touched again do not accumulate.
#[derive(Debug)]
pub struct InMemoryStore<C = SystemClock> {
    storage: DashMap<String, UrlMapping>,
    clock: C,
    creates: AtomicU64,
}

impl InMemoryStore {
    /// Creates a new in-memory store.
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    /// Creates a new in-memory store with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            storage: DashMap::with_capacity(capacity),
            clock: SystemClock,
            creates: AtomicU64::new(0),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> InMemoryStore<C> {
    /// Creates a store that judges expiry against `clock`.
    pub fn with_clock(clock: C) -> Self {
        Self {
            storage: DashMap::new(),
            clock,
            creates: AtomicU64::new(0),
        }
    }

    /// Number of entries held, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.now();
        let before = self.storage.len();
        self.storage.retain(|_, mapping| !mapping.is_expired_at(now));
        let purged = before.saturating_sub(self.storage.len());
        if purged > 0 {
            debug!(purged, "purged expired mappings");
        }
        purged
    }

    fn now(&self) -> i64 {
        self.clock.now().as_second()
    }

    fn evict_if_expired(&self, key: &str, now: i64) {
        if self
            .storage
            .remove_if(key, |_, mapping| mapping.is_expired_at(now))
            .is_some()
        {
            trace!(code = %key, "evicted expired mapping");
        }
    }
}

#[async_trait]
impl<C: Clock> MappingStore for InMemoryStore<C> {
    async fn create(&self, mapping: UrlMapping) -> Result<()> {
        let now = self.now();

        match self.storage.entry(mapping.short_code.as_str().to_owned()) {
            Entry::Occupied(mut occupied) => {
                if !occupied.get().is_expired_at(now) {
                    return Err(StorageError::Conflict(mapping.short_code.to_string()));
                }
                trace!(code = %mapping.short_code, "replacing expired mapping");
                occupied.insert(mapping);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(mapping);
            }
        }

        // The entry guard is released above; retain needs every shard lock.
        if (self.creates.fetch_add(1, Ordering::Relaxed) + 1) % SWEEP_INTERVAL == 0 {
            self.purge_expired();
        }

        Ok(())
    }

    async fn get(&self, code: &ShortCode) -> Result<Option<UrlMapping>> {
        let key = code.as_str();
        let now = self.now();

        let Some(entry) = self.storage.get(key) else {
            return Ok(None);
        };

        if entry.is_expired_at(now) {
            drop(entry);
            self.evict_if_expired(key, now);
            return Ok(None);
        }

        Ok(Some(entry.clone()))
    }

    async fn atomic_update(&self, code: &ShortCode, update: MappingUpdate) -> Result<bool> {
        let key = code.as_str();
        let now = self.now();

        let Some(mut entry) = self.storage.get_mut(key) else {
            return Ok(false);
        };

        if entry.is_expired_at(now) {
            drop(entry);
            self.evict_if_expired(key, now);
            return Ok(false);
        }

        update.apply_to(&mut entry)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::{SignedDuration, Timestamp};
    use snip_core::{ManualClock, MetricField};
    use std::sync::Arc;

    const WINDOW: SignedDuration = SignedDuration::from_secs(3_600);

    fn code(s: &str) -> ShortCode {
        ShortCode::new_unchecked(s)
    }

    fn start() -> Timestamp {
        Timestamp::from_second(1_700_000_000).unwrap()
    }

    fn mapping(c: &str, url: &str, now: Timestamp) -> UrlMapping {
        UrlMapping::new(code(c), url, now, WINDOW)
    }

    fn store() -> (InMemoryStore<ManualClock>, ManualClock) {
        let clock = ManualClock::new(start());
        (InMemoryStore::with_clock(clock.clone()), clock)
    }

    #[tokio::test]
    async fn create_and_get() {
        let (store, _clock) = store();

        store
            .create(mapping("abc123", "https://example.com", start()))
            .await
            .unwrap();

        let result = store.get(&code("abc123")).await.unwrap().unwrap();
        assert_eq!(result.long_url, "https://example.com");
        assert_eq!(result.num_clicks, 0);
        assert_eq!(
            store.get_long_url(&code("abc123")).await.unwrap().as_deref(),
            Some("https://example.com")
        );
    }

    #[tokio::test]
    async fn get_nonexistent() {
        let (store, _clock) = store();

        assert!(store.get(&code("nope")).await.unwrap().is_none());
        assert!(store.get_long_url(&code("nope")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn create_conflict() {
        let (store, _clock) = store();

        store
            .create(mapping("abc123", "https://example.com", start()))
            .await
            .unwrap();

        let err = store
            .create(mapping("abc123", "https://other.com", start()))
            .await
            .unwrap_err();

        assert_eq!(err, StorageError::Conflict("abc123".to_string()));
        let kept = store.get(&code("abc123")).await.unwrap().unwrap();
        assert_eq!(kept.long_url, "https://example.com");
    }

    #[tokio::test]
    async fn create_over_expired_entry() {
        let (store, clock) = store();

        store
            .create(mapping("abc123", "https://old.com", start()))
            .await
            .unwrap();

        clock.advance(WINDOW);

        // Should succeed because the existing entry is expired.
        store
            .create(mapping("abc123", "https://new.com", clock.now()))
            .await
            .unwrap();

        let result = store.get(&code("abc123")).await.unwrap().unwrap();
        assert_eq!(result.long_url, "https://new.com");
    }

    #[tokio::test]
    async fn expired_entry_is_evicted_on_read() {
        let (store, clock) = store();

        store
            .create(mapping("abc123", "https://example.com", start()))
            .await
            .unwrap();
        assert_eq!(store.len(), 1);

        clock.advance(WINDOW + SignedDuration::from_secs(1));

        assert!(store.get(&code("abc123")).await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn purge_drops_only_expired_entries() {
        let (store, clock) = store();
        store
            .create(mapping("old", "https://old.com", start()))
            .await
            .unwrap();
        clock.advance(SignedDuration::from_secs(600));
        store
            .create(mapping("new", "https://new.com", clock.now()))
            .await
            .unwrap();

        clock.advance(WINDOW - SignedDuration::from_secs(300));
        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.len(), 1);
        assert!(store.get(&code("new")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn untouched_expired_entries_are_swept_by_later_creates() {
        let (store, clock) = store();
        for i in 0..10 {
            store
                .create(mapping(&format!("dead{i}"), "https://old.com", start()))
                .await
                .unwrap();
        }

        clock.advance(WINDOW);
        for i in 10..SWEEP_INTERVAL {
            store
                .create(mapping(&format!("live{i}"), "https://new.com", clock.now()))
                .await
                .unwrap();
        }

        assert_eq!(store.len() as u64, SWEEP_INTERVAL - 10);
        assert!(store.storage.get("dead0").is_none());
    }

    #[tokio::test]
    async fn update_applies_all_fields() {
        let (store, clock) = store();
        store
            .create(mapping("abc123", "https://example.com", start()))
            .await
            .unwrap();

        clock.advance(SignedDuration::from_secs(60));
        let now = clock.now().as_second();
        let update = MappingUpdate::new()
            .set(MetricField::LastAccessed, now)
            .increment(MetricField::NumClicks, 1)
            .set(MetricField::ExpiresAt, now + WINDOW.as_secs());

        assert!(store.atomic_update(&code("abc123"), update).await.unwrap());

        let result = store.get(&code("abc123")).await.unwrap().unwrap();
        assert_eq!(result.last_accessed, now);
        assert_eq!(result.num_clicks, 1);
        assert_eq!(result.expires_at, now + WINDOW.as_secs());
        assert_eq!(result.created_at, start().as_second());
    }

    #[tokio::test]
    async fn update_missing_returns_false() {
        let (store, _clock) = store();

        let update = MappingUpdate::new().increment(MetricField::NumClicks, 1);
        assert!(!store.atomic_update(&code("nope"), update).await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn update_expired_returns_false() {
        let (store, clock) = store();
        store
            .create(mapping("abc123", "https://example.com", start()))
            .await
            .unwrap();

        clock.advance(WINDOW);

        let update = MappingUpdate::new().increment(MetricField::NumClicks, 1);
        assert!(!store.atomic_update(&code("abc123"), update).await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn rejected_update_keeps_previous_state() {
        let (store, _clock) = store();
        store
            .create(mapping("abc123", "https://example.com", start()))
            .await
            .unwrap();

        let update = MappingUpdate::new()
            .set(MetricField::LastAccessed, 42)
            .increment(MetricField::NumClicks, -5);
        let err = store
            .atomic_update(&code("abc123"), update)
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::InvalidData(_)));
        let result = store.get(&code("abc123")).await.unwrap().unwrap();
        assert_eq!(result.last_accessed, start().as_second());
        assert_eq!(result.num_clicks, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_have_one_winner() {
        let store = Arc::new(InMemoryStore::new());
        let mut handles = vec![];

        for i in 0..32u64 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let url = format!("https://example{}.com", i);
                store
                    .create(UrlMapping::new(code("shared"), url, Timestamp::now(), WINDOW))
                    .await
            }));
        }

        let mut winners = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => winners += 1,
                Err(err) => assert!(matches!(err, StorageError::Conflict(_))),
            }
        }

        assert_eq!(winners, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_increments_are_not_lost() {
        let store = Arc::new(InMemoryStore::new());
        store
            .create(UrlMapping::new(
                code("hot"),
                "https://example.com",
                Timestamp::now(),
                WINDOW,
            ))
            .await
            .unwrap();

        let mut handles = vec![];
        for _ in 0..100 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let update = MappingUpdate::new().increment(MetricField::NumClicks, 1);
                store.atomic_update(&code("hot"), update).await.unwrap()
            }));
        }

        for handle in handles {
            assert!(handle.await.unwrap());
        }

        let result = store.get(&code("hot")).await.unwrap().unwrap();
        assert_eq!(result.num_clicks, 100);
    }
}
