//! # Tagcache
//!
//! The concurrent caching and instrumentation core of a content-assembly
//! engine: page-construction blocks are executed against backend data, and
//! their output is cached under keys derived from the request.
//!
//! ## Features
//!
//! - **Get-or-create store**: expensive per-request values are built once and
//!   shared by every reader
//! - **Cache identity**: cacheable objects derive deterministic tag keys and
//!   can opt out of the distributed tier with `distributed-cache: no`
//! - **Counters**: simple, average and cache statistics readable at any time
//! - **Refreshers**: periodic background callbacks with clean shutdown
//!
//! ## Quick Start
//!
//! ```rust
//! use tagcache::{CacheIdentity, CacheObjectConfig, CounterRegistry, Tag, TagCache};
//!
//! struct Block {
//!     script: &'static str,
//!     config: CacheObjectConfig,
//! }
//!
//! impl CacheIdentity for Block {
//!     type Context = str;
//!
//!     fn create_tag_key(&self, query: &str) -> String {
//!         format!("{}?{}", self.script, query)
//!     }
//!
//!     fn cache_config(&self) -> &CacheObjectConfig {
//!         &self.config
//!     }
//!
//!     fn cache_config_mut(&mut self) -> &mut CacheObjectConfig {
//!         &mut self.config
//!     }
//! }
//!
//! let registry = CounterRegistry::new();
//! let cache = TagCache::new("block-cache", registry.cache("block-cache"));
//!
//! let mut block = Block { script: "weather.xml", config: CacheObjectConfig::default() };
//! block.check_property("distributed-cache", "no");
//!
//! cache.store(&block, "city=riga", Tag::never_expires(), String::from("<weather/>"));
//! assert_eq!(cache.load(&block, "city=riga").as_deref(), Some("<weather/>"));
//!
//! let report = &registry.reports()[0];
//! assert_eq!(report.get("stored"), Some("1"));
//! assert_eq!(report.get("loaded"), Some("1"));
//! ```
//!
//! ## Object Store
//!
//! ```rust
//! use tagcache::ObjectStore;
//!
//! let request_values = ObjectStore::new();
//! let user = request_values.get_or_create("user", || String::from("anonymous"));
//! assert_eq!(user.as_str(), "anonymous");
//!
//! // The factory does not run again for an existing key.
//! let again = request_values.get_or_create("user", || String::from("ignored"));
//! assert_eq!(again.as_str(), "anonymous");
//! ```
//!
//! ## Refresher
//!
//! ```rust
//! use tagcache::Refresher;
//!
//! let mut refresher = Refresher::new(60, || {
//!     // reload the shared navigation tree
//! })
//! .unwrap();
//! refresher.stop();
//! ```

pub use tagcache_core::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use tagcache_core::{
        CacheIdentity, CacheObjectConfig, CacheTier, ObjectStore, Refresher, Tag, TagCache,
    };

    #[cfg(feature = "stats")]
    pub use tagcache_core::{
        AverageCounter, CacheCounter, Counter, CounterRegistry, Report, SimpleCounter,
    };
}
