use std::time::{Duration, SystemTime};

use crate::config::CacheObjectConfig;

/// Cache identity contract implemented by every cacheable object.
///
/// An implementor derives a tag key from its own configuration and an
/// execution context, and exposes a [`CacheObjectConfig`] that decides whether
/// that key may be published to a distributed cache tier.
///
/// # Key Determinism
///
/// [`create_tag_key`](Self::create_tag_key) must be a pure function of the
/// object's configuration and the supplied context: the same inputs must yield
/// a byte-identical key, in this process and in any other one sharing a
/// distributed tier. The key composition itself is up to the implementor.
///
/// # Examples
///
/// ```
/// use tagcache_core::{CacheIdentity, CacheObjectConfig};
/// use std::collections::BTreeMap;
///
/// struct Block {
///     script: String,
///     config: CacheObjectConfig,
/// }
///
/// impl CacheIdentity for Block {
///     type Context = BTreeMap<String, String>;
///
///     fn create_tag_key(&self, params: &Self::Context) -> String {
///         let mut key = self.script.clone();
///         for (name, value) in params {
///             key.push('|');
///             key.push_str(name);
///             key.push('=');
///             key.push_str(value);
///         }
///         key
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
/// let mut block = Block { script: "news.xml".into(), config: CacheObjectConfig::default() };
/// assert!(block.check_property("distributed-cache", "no"));
/// assert!(!block.allow_distributed());
///
/// let params = BTreeMap::from([("page".to_string(), "2".to_string())]);
/// assert_eq!(block.create_tag_key(&params), "news.xml|page=2");
/// ```
pub trait CacheIdentity {
    /// Execution context the tag key is derived from.
    type Context: ?Sized;

    /// Derives the cache lookup key for `context`.
    fn create_tag_key(&self, context: &Self::Context) -> String;

    fn cache_config(&self) -> &CacheObjectConfig;

    fn cache_config_mut(&mut self) -> &mut CacheObjectConfig;

    /// Configuration hook called during object setup.
    ///
    /// Returns `false` for property names this contract does not handle so
    /// that callers can chain to other handlers.
    fn check_property(&mut self, name: &str, value: &str) -> bool {
        self.cache_config_mut().check_property(name, value)
    }

    fn allow_distributed(&self) -> bool {
        self.cache_config().allow_distributed()
    }
}

/// Cache tier a computed tag key may be published to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheTier {
    /// Process-local cache only.
    Local,
    /// Cache shared across processes or machines.
    Distributed,
}

impl CacheTier {
    /// Returns the widest tier `object` may be cached in.
    pub fn for_object<O: CacheIdentity + ?Sized>(object: &O) -> Self {
        if object.allow_distributed() {
            CacheTier::Distributed
        } else {
            CacheTier::Local
        }
    }
}

/// Freshness metadata attached to a cached result.
///
/// `last_modified` records when the underlying data last changed;
/// `expire_time` is the instant after which the result must no longer be
/// served. A tag without an expire time never expires.
///
/// # Examples
///
/// ```
/// use tagcache_core::Tag;
/// use std::time::{Duration, SystemTime};
///
/// let tag = Tag::with_ttl(Duration::from_secs(60));
/// assert!(!tag.is_expired());
/// assert!(tag.expired_at(SystemTime::now() + Duration::from_secs(61)));
///
/// assert!(!Tag::never_expires().expired_at(SystemTime::now() + Duration::from_secs(3600)));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tag {
    pub last_modified: Option<SystemTime>,
    pub expire_time: Option<SystemTime>,
}

impl Tag {
    pub fn new(last_modified: Option<SystemTime>, expire_time: Option<SystemTime>) -> Self {
        Self {
            last_modified,
            expire_time,
        }
    }

    pub fn never_expires() -> Self {
        Self::default()
    }

    /// A tag modified now and expiring `ttl` from now.
    pub fn with_ttl(ttl: Duration) -> Self {
        let now = SystemTime::now();
        Self {
            last_modified: Some(now),
            expire_time: now.checked_add(ttl),
        }
    }

    /// Returns true if the tag has expired as of `now`.
    pub fn expired_at(&self, now: SystemTime) -> bool {
        match self.expire_time {
            Some(expire_time) => now >= expire_time,
            None => false,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expired_at(SystemTime::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Script {
        path: &'static str,
        config: CacheObjectConfig,
    }

    impl CacheIdentity for Script {
        type Context = [(&'static str, &'static str)];

        fn create_tag_key(&self, args: &Self::Context) -> String {
            let args: Vec<String> = args.iter().map(|(k, v)| format!("{k}={v}")).collect();
            format!("{}?{}", self.path, args.join("&"))
        }

        fn cache_config(&self) -> &CacheObjectConfig {
            &self.config
        }

        fn cache_config_mut(&mut self) -> &mut CacheObjectConfig {
            &mut self.config
        }
    }

    fn script() -> Script {
        Script {
            path: "/index.xml",
            config: CacheObjectConfig::default(),
        }
    }

    #[test]
    fn test_tag_key_is_deterministic() {
        let script = script();
        let args = [("id", "7"), ("lang", "en")];
        assert_eq!(script.create_tag_key(&args), script.create_tag_key(&args));
        assert_eq!(script.create_tag_key(&args), "/index.xml?id=7&lang=en");
    }

    #[test]
    fn test_check_property_through_identity() {
        let mut script = script();
        assert!(script.allow_distributed());
        assert_eq!(CacheTier::for_object(&script), CacheTier::Distributed);

        assert!(!script.check_property("unrelated", "no"));
        assert!(script.allow_distributed());

        assert!(script.check_property("distributed-cache", "NO"));
        assert!(!script.allow_distributed());
        assert_eq!(CacheTier::for_object(&script), CacheTier::Local);
    }

    #[test]
    fn test_tag_expiration() {
        let now = SystemTime::now();
        let tag = Tag::new(Some(now), Some(now + Duration::from_secs(10)));
        assert!(!tag.expired_at(now));
        assert!(!tag.expired_at(now + Duration::from_secs(9)));
        assert!(tag.expired_at(now + Duration::from_secs(10)));
    }

    #[test]
    fn test_tag_without_expire_time_never_expires() {
        let tag = Tag::new(Some(SystemTime::now()), None);
        assert!(!tag.is_expired());
        assert_eq!(Tag::never_expires(), Tag::default());
    }
}
