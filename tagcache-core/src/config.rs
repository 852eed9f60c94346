//! # Configuration
//!
//! Configuration surfaces consumed by the caching core.
//!
//! - [`CacheObjectConfig`] carries the per-object `distributed-cache` switch
//!   that every cacheable object exposes through
//!   [`CacheIdentity`](crate::CacheIdentity).
//! - [`RefresherConfig`] carries the refresh period hosts load from their
//!   settings files.
//!
//! Both can be built programmatically or deserialized with `serde`.
//!
//! # Examples
//!
//! ```
//! use tagcache_core::config::CacheObjectConfig;
//!
//! let mut config = CacheObjectConfig::default();
//! assert!(config.allow_distributed());
//!
//! assert!(config.check_property("distributed-cache", "No"));
//! assert!(!config.allow_distributed());
//!
//! // Unrecognized names are left for other handlers.
//! assert!(!config.check_property("xslt", "page.xsl"));
//! ```

use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Name of the property controlling distributed caching.
pub const DISTRIBUTED_CACHE_PROPERTY: &str = "distributed-cache";

const DEFAULT_REFRESH_PERIOD_SECS: u64 = 60;

/// Cache configuration of a single cacheable object.
///
/// The flag is set during object setup and read-only afterwards: mutation
/// requires `&mut self`, reads do not need any locking.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheObjectConfig {
    #[serde(
        rename = "distributed-cache",
        deserialize_with = "deserialize_distributed"
    )]
    allow_distributed: bool,
}

impl Default for CacheObjectConfig {
    fn default() -> Self {
        Self {
            allow_distributed: true,
        }
    }
}

impl CacheObjectConfig {
    /// Whether tag keys computed by the owning object may be published to a
    /// distributed cache tier.
    pub fn allow_distributed(&self) -> bool {
        self.allow_distributed
    }

    /// Applies a single configuration property.
    ///
    /// Recognizes only `distributed-cache`: the value `no` (in any case)
    /// disables distributed caching, anything else enables it. Returns whether
    /// the property name was recognized.
    pub fn check_property(&mut self, name: &str, value: &str) -> bool {
        if name != DISTRIBUTED_CACHE_PROPERTY {
            return false;
        }
        self.allow_distributed = parse_distributed(value);
        true
    }

    /// Applies every property and returns the names that were not recognized,
    /// in input order.
    pub fn apply_properties<'a, I>(&mut self, properties: I) -> Vec<&'a str>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        properties
            .into_iter()
            .filter(|(name, value)| !self.check_property(name, value))
            .map(|(name, _)| name)
            .collect()
    }
}

/// Fail-open parsing: only an explicit `no` disables distributed caching.
fn parse_distributed(value: &str) -> bool {
    !value.eq_ignore_ascii_case("no")
}

/// Accepts a value of any type; only a `no` string disables.
fn deserialize_distributed<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(value) => parse_distributed(&value),
        _ => true,
    })
}

/// Settings of a periodic refresher.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RefresherConfig {
    /// Period between refreshes, in whole seconds.
    pub period_secs: u64,
}

impl Default for RefresherConfig {
    fn default() -> Self {
        Self {
            period_secs: DEFAULT_REFRESH_PERIOD_SECS,
        }
    }
}

impl RefresherConfig {
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }
}
