use std::time::SystemTime;

use crate::identity::Tag;
use crate::MemoryEstimator;

/// A value held by a [`TagCache`](crate::TagCache) together with its freshness
/// tag.
///
/// The memory estimate is computed once on creation so that the amount added
/// to the cache counter on store is exactly the amount subtracted on removal.
///
/// # Examples
///
/// ```
/// use tagcache_core::{CacheEntry, Tag};
/// use std::time::Duration;
///
/// let entry = CacheEntry::new(String::from("<page/>"), Tag::with_ttl(Duration::from_secs(60)));
/// assert_eq!(entry.value, "<page/>");
/// assert!(!entry.is_expired());
/// assert!(entry.memory() >= 7);
/// ```
#[derive(Clone, Debug)]
pub struct CacheEntry<V> {
    pub value: V,
    pub tag: Tag,
    memory: usize,
}

impl<V: MemoryEstimator> CacheEntry<V> {
    pub fn new(value: V, tag: Tag) -> Self {
        let memory = value.estimate_memory();
        Self { value, tag, memory }
    }
}

impl<V> CacheEntry<V> {
    /// Estimated size of the value, in bytes, as of insertion.
    pub fn memory(&self) -> usize {
        self.memory
    }

    pub fn expired_at(&self, now: SystemTime) -> bool {
        self.tag.expired_at(now)
    }

    pub fn is_expired(&self) -> bool {
        self.tag.is_expired()
    }
}
