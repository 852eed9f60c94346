use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use crate::counters::{AverageCounter, CacheCounter, Counter, Report, SimpleCounter};
use crate::error::Result;

/// Registry of named counters.
///
/// The registry is an explicit object: the host constructs it once during
/// initialization and passes it to every component that creates or reports
/// counters. Counters are created through the typed constructors
/// ([`simple`](Self::simple), [`average`](Self::average),
/// [`cache`](Self::cache)) or registered directly with
/// [`register`](Self::register).
///
/// # Thread Safety
///
/// The name map is guarded by a `parking_lot::RwLock`; reporting only takes
/// the read lock and each counter's own lock in turn.
///
/// # Examples
///
/// ```
/// use tagcache_core::CounterRegistry;
///
/// let registry = CounterRegistry::new();
/// let hits = registry.cache("block-cache");
/// hits.inc_loaded();
///
/// // The same name yields the same counter.
/// registry.cache("block-cache").inc_loaded();
/// assert_eq!(hits.loaded(), 2);
///
/// let reports = registry.reports();
/// assert_eq!(reports.len(), 1);
/// assert_eq!(reports[0].get("loaded"), Some("2"));
/// ```
#[derive(Default)]
pub struct CounterRegistry {
    counters: RwLock<HashMap<String, Registered>>,
}

#[derive(Clone)]
enum Registered {
    Simple(Arc<SimpleCounter>),
    Average(Arc<AverageCounter>),
    Cache(Arc<CacheCounter>),
    Custom(Arc<dyn Counter>),
}

impl Registered {
    fn counter(&self) -> Arc<dyn Counter> {
        match self {
            Registered::Simple(c) => c.clone(),
            Registered::Average(c) => c.clone(),
            Registered::Cache(c) => c.clone(),
            Registered::Custom(c) => Arc::clone(c),
        }
    }
}

/// Generates a typed get-or-register constructor.
macro_rules! typed_constructor {
    ($(#[$doc:meta])* $fn_name:ident, $variant:ident, $ty:ty) => {
        $(#[$doc])*
        pub fn $fn_name(&self, name: &str) -> Arc<$ty> {
            if let Some(Registered::$variant(existing)) = self.counters.read().get(name) {
                return Arc::clone(existing);
            }
            let mut counters = self.counters.write();
            match counters.get(name) {
                Some(Registered::$variant(existing)) => Arc::clone(existing),
                Some(other) => {
                    warn!(
                        counter = name,
                        registered = other.counter().kind(),
                        requested = stringify!($fn_name),
                        "counter name already registered with another kind"
                    );
                    Arc::new(<$ty>::new(name))
                }
                None => {
                    let created = Arc::new(<$ty>::new(name));
                    counters.insert(name.to_string(), Registered::$variant(Arc::clone(&created)));
                    created
                }
            }
        }
    };
}

impl CounterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    typed_constructor!(
        /// Returns the [`SimpleCounter`] registered under `name`, creating it if
        /// absent.
        ///
        /// If `name` is taken by a counter of another kind, a warning is logged
        /// and an unregistered counter is returned.
        simple,
        Simple,
        SimpleCounter
    );

    typed_constructor!(
        /// Returns the [`AverageCounter`] registered under `name`, creating it
        /// if absent.
        average,
        Average,
        AverageCounter
    );

    typed_constructor!(
        /// Returns the [`CacheCounter`] registered under `name`, creating it if
        /// absent.
        cache,
        Cache,
        CacheCounter
    );

    /// Registers a counter under its own name.
    ///
    /// Returns `false`, leaving the registry unchanged, if the name is taken.
    pub fn register(&self, counter: Arc<dyn Counter>) -> bool {
        let mut counters = self.counters.write();
        if counters.contains_key(counter.name()) {
            warn!(counter = counter.name(), "counter name already registered");
            return false;
        }
        counters.insert(counter.name().to_string(), Registered::Custom(counter));
        true
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Counter>> {
        self.counters.read().get(name).map(Registered::counter)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.counters.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Snapshots every registered counter, sorted by name.
    pub fn reports(&self) -> Vec<Report> {
        let counters: Vec<Arc<dyn Counter>> =
            self.counters.read().values().map(Registered::counter).collect();
        let mut reports: Vec<Report> = counters.iter().map(|c| c.create_report()).collect();
        reports.sort_by(|a, b| a.name().cmp(b.name()));
        reports
    }

    /// Serializes [`reports`](Self::reports) as a JSON array.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.reports())?)
    }

    pub fn len(&self) -> usize {
        self.counters.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.read().is_empty()
    }
}
