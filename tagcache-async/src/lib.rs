//! # Tagcache Async
//!
//! Periodic refreshers for hosts that run on a tokio runtime.
//!
//! [`AsyncRefresher`] keeps the contract of the thread-based
//! [`Refresher`](tagcache_core::Refresher) (periodic wake-up, early wake-up on
//! stop, no callback once the stop has been observed) but runs as a
//! cooperative task and awaits an async callback.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tagcache_async::AsyncRefresher;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let refresher = AsyncRefresher::spawn(Duration::from_secs(30), || async {
//!         // reload the cached navigation tree
//!     })
//!     .unwrap();
//!
//!     // ... serve requests ...
//!
//!     refresher.stop().await;
//! }
//! ```
//!
//! ## Callback Failures
//!
//! A callback future that panics is caught and logged; the refresher keeps
//! its schedule.
//!

mod refresher;

pub use refresher::AsyncRefresher;

// Re-export the core types async hosts combine with refreshers
pub use tagcache_core::{Error, RefresherConfig, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::AsyncRefresher;
    pub use tagcache_core::{CacheIdentity, ObjectStore, Refresher, RefresherConfig, TagCache};
}
