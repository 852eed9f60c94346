use parking_lot::RwLock;
use std::collections::HashMap;
#[cfg(feature = "stats")]
use std::sync::Arc;
use std::time::SystemTime;
use tracing::trace;

use crate::identity::{CacheIdentity, CacheTier, Tag};
use crate::{CacheEntry, MemoryEstimator};
#[cfg(feature = "stats")]
use crate::CacheCounter;

/// A process-local cache of results keyed by tag keys.
///
/// `TagCache` is the local tier of a block/page cache: cacheable objects are
/// looked up by the key their [`CacheIdentity`] derives from the current
/// context, and every stored value carries a [`Tag`] whose expire time bounds
/// how long it is served.
///
/// # Statistics
///
/// With the `stats` feature, each cache reports into a [`CacheCounter`]:
///
/// - `stored`: values stored (including replacements)
/// - `loaded`: successful loads
/// - `removed`: entries that left the cache (explicit removal, clearing, or
///   expiry detected on load)
/// - `used-memory`: sum of the [`MemoryEstimator`] estimates of the entries
///   currently held
///
/// # Thread Safety
///
/// Entries live in a `parking_lot::RwLock<HashMap>`: loads take the read lock
/// and only upgrade to the write lock to drop an expired entry. Counter updates
/// happen after the entry change they describe.
///
/// # Examples
///
/// ```
/// use tagcache_core::{CacheCounter, CacheIdentity, CacheObjectConfig, Tag, TagCache};
/// use std::sync::Arc;
///
/// struct Page {
///     config: CacheObjectConfig,
/// }
///
/// impl CacheIdentity for Page {
///     type Context = str;
///
///     fn create_tag_key(&self, url: &str) -> String {
///         format!("page:{url}")
///     }
///
///     fn cache_config(&self) -> &CacheObjectConfig {
///         &self.config
///     }
///
///     fn cache_config_mut(&mut self) -> &mut CacheObjectConfig {
///         &mut self.config
///     }
/// }
///
/// let counter = Arc::new(CacheCounter::new("page-cache"));
/// let cache = TagCache::new("page-cache", Arc::clone(&counter));
/// let page = Page { config: CacheObjectConfig::default() };
///
/// assert!(cache.store(&page, "/news", Tag::never_expires(), String::from("<html/>")));
/// assert_eq!(cache.load(&page, "/news").as_deref(), Some("<html/>"));
/// assert_eq!(counter.stored(), 1);
/// assert_eq!(counter.loaded(), 1);
/// ```
pub struct TagCache<V> {
    name: String,
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    #[cfg(feature = "stats")]
    counter: Arc<CacheCounter>,
}

impl<V: Clone + MemoryEstimator> TagCache<V> {
    /// Creates an empty cache reporting into `counter`.
    #[cfg(feature = "stats")]
    pub fn new(name: impl Into<String>, counter: Arc<CacheCounter>) -> Self {
        Self {
            name: name.into(),
            entries: RwLock::new(HashMap::new()),
            counter,
        }
    }

    #[cfg(not(feature = "stats"))]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Loads the value cached for `object` in `context`.
    ///
    /// An entry whose tag has expired is removed and reported as a miss.
    pub fn load<O>(&self, object: &O, context: &O::Context) -> Option<V>
    where
        O: CacheIdentity + ?Sized,
    {
        self.load_key(&object.create_tag_key(context))
    }

    /// Loads the value cached under a precomputed tag key.
    pub fn load_key(&self, key: &str) -> Option<V> {
        let now = SystemTime::now();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                None => {
                    trace!(cache = %self.name, key, "tag cache miss");
                    return None;
                }
                Some(entry) if !entry.expired_at(now) => {
                    #[cfg(feature = "stats")]
                    self.counter.inc_loaded();
                    trace!(cache = %self.name, key, "tag cache hit");
                    return Some(entry.value.clone());
                }
                Some(_) => {}
            }
        }

        // Re-check under the write lock: the entry may have been replaced.
        let mut entries = self.entries.write();
        if entries.get(key).is_some_and(|entry| entry.expired_at(now)) {
            if let Some(expired) = entries.remove(key) {
                trace!(cache = %self.name, key, "tag cache entry expired");
                self.record_removal(&expired);
            }
        }
        None
    }

    /// Stores `value` for `object` in `context`, replacing any previous entry.
    ///
    /// Returns `false` without storing anything if `tag` has already expired.
    pub fn store<O>(&self, object: &O, context: &O::Context, tag: Tag, value: V) -> bool
    where
        O: CacheIdentity + ?Sized,
    {
        let key = object.create_tag_key(context);
        let tier = CacheTier::for_object(object);
        trace!(cache = %self.name, key = %key, ?tier, "storing tag cache entry");
        self.store_key(&key, tag, value)
    }

    /// Stores `value` under a precomputed tag key.
    pub fn store_key(&self, key: &str, tag: Tag, value: V) -> bool {
        if tag.is_expired() {
            return false;
        }
        let entry = CacheEntry::new(value, tag);
        #[cfg(feature = "stats")]
        let memory = entry.memory();

        let previous = self.entries.write().insert(key.to_string(), entry);

        #[cfg(feature = "stats")]
        {
            if let Some(previous) = previous {
                self.counter.dec_used_memory(previous.memory());
            }
            self.counter.inc_used_memory(memory);
            self.counter.inc_stored();
        }
        #[cfg(not(feature = "stats"))]
        drop(previous);
        true
    }

    /// Removes the entry cached for `object` in `context`.
    pub fn remove<O>(&self, object: &O, context: &O::Context) -> bool
    where
        O: CacheIdentity + ?Sized,
    {
        self.remove_key(&object.create_tag_key(context))
    }

    pub fn remove_key(&self, key: &str) -> bool {
        let removed = self.entries.write().remove(key);
        match removed {
            Some(entry) => {
                trace!(cache = %self.name, key, "removed tag cache entry");
                self.record_removal(&entry);
                true
            }
            None => false,
        }
    }

    /// Removes every entry.
    pub fn clear(&self) {
        let drained: Vec<CacheEntry<V>> = self.entries.write().drain().map(|(_, e)| e).collect();
        for entry in &drained {
            self.record_removal(entry);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the counter this cache reports into.
    #[cfg(feature = "stats")]
    pub fn counter(&self) -> &Arc<CacheCounter> {
        &self.counter
    }

    #[cfg(feature = "stats")]
    fn record_removal(&self, entry: &CacheEntry<V>) {
        self.counter.dec_used_memory(entry.memory());
        self.counter.inc_removed();
    }

    #[cfg(not(feature = "stats"))]
    fn record_removal(&self, _entry: &CacheEntry<V>) {}
}

#[cfg(all(test, feature = "stats"))]
mod tests {
    use super::*;
    use crate::config::CacheObjectConfig;
    use crate::Counter;
    use std::thread;
    use std::time::Duration;

    struct Block {
        name: &'static str,
        config: CacheObjectConfig,
    }

    impl CacheIdentity for Block {
        type Context = u32;

        fn create_tag_key(&self, page: &u32) -> String {
            format!("{}#{}", self.name, page)
        }

        fn cache_config(&self) -> &CacheObjectConfig {
            &self.config
        }

        fn cache_config_mut(&mut self) -> &mut CacheObjectConfig {
            &mut self.config
        }
    }

    fn block() -> Block {
        Block {
            name: "news",
            config: CacheObjectConfig::default(),
        }
    }

    fn cache() -> TagCache<u64> {
        TagCache::new("blocks", Arc::new(CacheCounter::new("blocks")))
    }

    #[test]
    fn test_store_and_load() {
        let cache = cache();
        let block = block();
        assert!(cache.store(&block, &1, Tag::never_expires(), 10));
        assert_eq!(cache.load(&block, &1), Some(10));
        assert_eq!(cache.load(&block, &2), None);

        let counter = cache.counter();
        assert_eq!(counter.stored(), 1);
        assert_eq!(counter.loaded(), 1);
        assert_eq!(counter.used_memory(), std::mem::size_of::<u64>() as i64);
    }

    #[test]
    fn test_replace_keeps_memory_balanced() {
        let cache: TagCache<String> =
            TagCache::new("pages", Arc::new(CacheCounter::new("pages")));
        cache.store_key("k", Tag::never_expires(), String::from("first"));
        cache.store_key("k", Tag::never_expires(), String::from("second value"));

        let expected = String::from("second value").estimate_memory() as i64;
        assert_eq!(cache.counter().used_memory(), expected);
        assert_eq!(cache.counter().stored(), 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_expired_entry_removed_on_load() {
        let cache = cache();
        assert!(cache.store_key("k", Tag::with_ttl(Duration::from_millis(50)), 1));
        thread::sleep(Duration::from_millis(100));

        assert_eq!(cache.load_key("k"), None);
        assert!(cache.is_empty());
        assert_eq!(cache.counter().removed(), 1);
        assert_eq!(cache.counter().loaded(), 0);
        assert_eq!(cache.counter().used_memory(), 0);
    }

    #[test]
    fn test_expired_tag_not_stored() {
        let cache = cache();
        let past = SystemTime::now() - Duration::from_secs(5);
        assert!(!cache.store_key("k", Tag::new(None, Some(past)), 1));
        assert!(cache.is_empty());
        assert_eq!(cache.counter().stored(), 0);
    }

    #[test]
    fn test_remove_and_clear() {
        let cache = cache();
        let block = block();
        cache.store(&block, &1, Tag::never_expires(), 1);
        cache.store(&block, &2, Tag::never_expires(), 2);
        cache.store(&block, &3, Tag::never_expires(), 3);

        assert!(cache.remove(&block, &1));
        assert!(!cache.remove(&block, &1));
        cache.clear();

        assert!(cache.is_empty());
        let report = cache.counter().create_report();
        assert_eq!(report.get("stored"), Some("3"));
        assert_eq!(report.get("removed"), Some("3"));
        assert_eq!(report.get("used-memory"), Some("0"));
    }

    #[test]
    fn test_local_only_object_still_cached_locally() {
        let cache = cache();
        let mut block = block();
        block.check_property("distributed-cache", "no");
        assert_eq!(CacheTier::for_object(&block), CacheTier::Local);

        assert!(cache.store(&block, &1, Tag::never_expires(), 5));
        assert_eq!(cache.load(&block, &1), Some(5));
    }

    #[test]
    fn test_concurrent_store_and_load() {
        let cache = Arc::new(cache());
        let handles: Vec<_> = (0..8u64)
            .map(|i| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    let key = format!("k{i}");
                    cache.store_key(&key, Tag::never_expires(), i);
                    cache.load_key(&key)
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.join().unwrap(), Some(i as u64));
        }
        assert_eq!(cache.counter().stored(), 8);
        assert_eq!(cache.counter().loaded(), 8);
        assert_eq!(
            cache.counter().used_memory(),
            8 * std::mem::size_of::<u64>() as i64
        );
    }
}
