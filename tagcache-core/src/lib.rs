//! # Tagcache Core
//!
//! Concurrency and instrumentation primitives for caching the output of
//! page-construction blocks.
//!
//! ## Features
//!
//! - **Object Store**: Thread-safe get-or-create storage keyed by name, with
//!   at-most-once construction per key
//! - **Cache Identity**: Contract through which cacheable objects derive tag
//!   keys and opt out of distributed caching
//! - **Counters**: Simple, average and cache counters producing consistent
//!   reports while being updated concurrently (`stats` feature)
//! - **Tag Cache**: Process-local cache keyed by tag keys with expiry and
//!   memory accounting
//! - **Refresher**: Background periodic callback with wait-for-completion
//!   shutdown
//!
//! ## Module Organization
//!
//! - [`object_store`] - Type-erased get-or-create store
//! - [`identity`] - `CacheIdentity` contract, tags and cache tiers
//! - [`config`] - Per-object cache configuration and refresher settings
//! - [`counters`] / [`counter_registry`] - Statistics counters and their registry
//! - [`tag_cache`] - Local tag-keyed cache
//! - [`refresher`] - Periodic background refresher
//!
mod cache_entry;
mod error;
mod memory_estimator;

pub mod config;
pub mod identity;
pub mod object_store;
pub mod refresher;
pub mod tag_cache;

#[cfg(feature = "stats")]
pub mod counters;

#[cfg(feature = "stats")]
pub mod counter_registry;

pub use cache_entry::CacheEntry;
pub use config::{CacheObjectConfig, RefresherConfig};
pub use error::{Error, Result};
pub use identity::{CacheIdentity, CacheTier, Tag};
pub use memory_estimator::MemoryEstimator;
pub use object_store::ObjectStore;
pub use refresher::{Refresher, RefresherState};
pub use tag_cache::TagCache;

#[cfg(feature = "stats")]
pub use counter_registry::CounterRegistry;
#[cfg(feature = "stats")]
pub use counters::{AverageCounter, CacheCounter, Counter, Report, SimpleCounter};
