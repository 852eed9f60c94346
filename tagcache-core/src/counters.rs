//! # Counters
//!
//! Lock-protected statistics aggregators that are updated concurrently by
//! worker threads and read at any time for reporting.
//!
//! Every counter serializes mutation and snapshotting through one
//! `parking_lot::Mutex`, so a [`Report`] never observes a partial update (for
//! example `total` changed but `count` not yet).
//!
//! | Counter | Operations | Report attributes |
//! |---------|------------|-------------------|
//! | [`SimpleCounter`] | `inc`, `dec` | `count`, `peak` |
//! | [`AverageCounter`] | `add`, `remove` | `count` and, when non-zero, `total`, `min`, `max`, `avg` |
//! | [`CacheCounter`] | `inc_used_memory`, `dec_used_memory`, `inc_stored`, `inc_loaded`, `inc_removed` | `used-memory`, `stored`, `loaded`, `removed` |
//!
//! # Examples
//!
//! ```
//! use tagcache_core::{AverageCounter, Counter};
//!
//! let sizes = AverageCounter::new("block-size");
//! sizes.add(5).unwrap();
//! sizes.add(3).unwrap();
//! sizes.remove(3).unwrap();
//!
//! let report = sizes.create_report();
//! assert_eq!(report.get("count"), Some("1"));
//! assert_eq!(report.get("avg"), Some("5"));
//! assert_eq!(report.get("min"), Some("3"));
//! ```

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// A flat, named snapshot of a counter's fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Report {
    name: String,
    attributes: BTreeMap<String, String>,
}

impl Report {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Adds an attribute, replacing any previous value under `key`.
    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.attributes.insert(key.to_string(), value.to_string());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Attribute names in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }
}

/// Common reporting contract of all counters.
pub trait Counter: Send + Sync {
    fn name(&self) -> &str;

    /// Takes a consistent snapshot of the counter. Safe to call concurrently
    /// with updates.
    fn create_report(&self) -> Report;

    /// Short kind name (`simple`, `average`, `cache`).
    fn kind(&self) -> &'static str;
}

#[derive(Debug, Default)]
struct SimpleState {
    count: u64,
    peak: u64,
}

/// Live count with its all-time peak.
///
/// `peak` never decreases and is always at least `count`.
#[derive(Debug)]
pub struct SimpleCounter {
    name: String,
    state: Mutex<SimpleState>,
}

impl SimpleCounter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(SimpleState::default()),
        }
    }

    pub fn inc(&self) {
        let mut state = self.state.lock();
        state.count += 1;
        state.peak = state.peak.max(state.count);
    }

    /// Decrements the live count. The peak is left untouched.
    ///
    /// Fails with [`Error::CounterUnderflow`] when the count is already zero.
    pub fn dec(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.count = state
            .count
            .checked_sub(1)
            .ok_or_else(|| Error::underflow(&self.name, "dec"))?;
        Ok(())
    }

    pub fn count(&self) -> u64 {
        self.state.lock().count
    }

    pub fn peak(&self) -> u64 {
        self.state.lock().peak
    }
}

impl Counter for SimpleCounter {
    fn name(&self) -> &str {
        &self.name
    }

    fn create_report(&self) -> Report {
        let state = self.state.lock();
        Report::new(&self.name)
            .with("count", state.count)
            .with("peak", state.peak)
    }

    fn kind(&self) -> &'static str {
        "simple"
    }
}

#[derive(Debug)]
struct AverageState {
    count: u64,
    total: u64,
    min: u64,
    max: u64,
}

impl Default for AverageState {
    fn default() -> Self {
        Self {
            count: 0,
            total: 0,
            min: u64::MAX,
            max: 0,
        }
    }
}

/// Running count, total and extremes of a series of values.
///
/// Zero values are ignored by both [`add`](Self::add) and
/// [`remove`](Self::remove). Removal reverses a value's contribution to
/// `count` and `total` but keeps the historical `min`/`max`. The reported
/// `avg` is `total / count` with truncating integer division.
#[derive(Debug)]
pub struct AverageCounter {
    name: String,
    state: Mutex<AverageState>,
}

impl AverageCounter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(AverageState::default()),
        }
    }

    /// Records `value`.
    ///
    /// Fails with [`Error::CounterOverflow`], leaving every field unchanged,
    /// if the count or the total would exceed `u64::MAX`.
    pub fn add(&self, value: u64) -> Result<()> {
        if value == 0 {
            return Ok(());
        }
        let mut state = self.state.lock();
        let (Some(count), Some(total)) = (state.count.checked_add(1), state.total.checked_add(value))
        else {
            return Err(Error::overflow(&self.name, "add"));
        };
        state.count = count;
        state.total = total;
        state.max = state.max.max(value);
        state.min = state.min.min(value);
        Ok(())
    }

    /// Reverses a previous [`add`](Self::add) of `value`.
    ///
    /// Fails with [`Error::CounterUnderflow`], leaving every field unchanged,
    /// if there is nothing to remove or `value` exceeds the total.
    pub fn remove(&self, value: u64) -> Result<()> {
        if value == 0 {
            return Ok(());
        }
        let mut state = self.state.lock();
        let (Some(count), Some(total)) = (state.count.checked_sub(1), state.total.checked_sub(value))
        else {
            return Err(Error::underflow(&self.name, "remove"));
        };
        state.count = count;
        state.total = total;
        Ok(())
    }

    pub fn count(&self) -> u64 {
        self.state.lock().count
    }

    pub fn total(&self) -> u64 {
        self.state.lock().total
    }

    /// Smallest added value, or `None` before the first addition.
    pub fn min(&self) -> Option<u64> {
        let state = self.state.lock();
        (state.max != 0).then_some(state.min)
    }

    /// Largest added value, or `None` before the first addition.
    pub fn max(&self) -> Option<u64> {
        let state = self.state.lock();
        (state.max != 0).then_some(state.max)
    }

    /// `total / count`, or `None` while the count is zero.
    pub fn avg(&self) -> Option<u64> {
        let state = self.state.lock();
        state.total.checked_div(state.count)
    }
}

impl Counter for AverageCounter {
    fn name(&self) -> &str {
        &self.name
    }

    fn create_report(&self) -> Report {
        let state = self.state.lock();
        let report = Report::new(&self.name).with("count", state.count);
        if state.count == 0 {
            return report;
        }
        report
            .with("total", state.total)
            .with("min", state.min)
            .with("max", state.max)
            .with("avg", state.total / state.count)
    }

    fn kind(&self) -> &'static str {
        "average"
    }
}

#[derive(Debug, Default)]
struct CacheState {
    used_memory: i64,
    stored: u64,
    loaded: u64,
    removed: u64,
}

/// Load/store/remove events and memory usage of one cache.
///
/// `used-memory` is a signed accumulator and goes negative if decrements
/// outweigh increments.
#[derive(Debug)]
pub struct CacheCounter {
    name: String,
    state: Mutex<CacheState>,
}

impl CacheCounter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn inc_used_memory(&self, bytes: usize) {
        let mut state = self.state.lock();
        state.used_memory = state.used_memory.saturating_add(to_i64(bytes));
    }

    pub fn dec_used_memory(&self, bytes: usize) {
        let mut state = self.state.lock();
        state.used_memory = state.used_memory.saturating_sub(to_i64(bytes));
    }

    pub fn inc_stored(&self) {
        self.state.lock().stored += 1;
    }

    pub fn inc_loaded(&self) {
        self.state.lock().loaded += 1;
    }

    pub fn inc_removed(&self) {
        self.state.lock().removed += 1;
    }

    pub fn used_memory(&self) -> i64 {
        self.state.lock().used_memory
    }

    pub fn stored(&self) -> u64 {
        self.state.lock().stored
    }

    pub fn loaded(&self) -> u64 {
        self.state.lock().loaded
    }

    pub fn removed(&self) -> u64 {
        self.state.lock().removed
    }
}

impl Counter for CacheCounter {
    fn name(&self) -> &str {
        &self.name
    }

    fn create_report(&self) -> Report {
        let state = self.state.lock();
        Report::new(&self.name)
            .with("used-memory", state.used_memory)
            .with("stored", state.stored)
            .with("loaded", state.loaded)
            .with("removed", state.removed)
    }

    fn kind(&self) -> &'static str {
        "cache"
    }
}

fn to_i64(bytes: usize) -> i64 {
    i64::try_from(bytes).unwrap_or(i64::MAX)
}
