use dashmap::DashMap;
use once_cell::sync::OnceCell;
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

use crate::error::{Error, Result};

/// Type-erased value cell held by the store.
type Value = Arc<dyn Any + Send + Sync>;

/// A thread-safe, get-or-create object store keyed by string identifiers.
///
/// Values are type-erased on insertion and recovered under the caller-declared
/// type on retrieval. Asking for a value under a type it was not stored as is a
/// programming error: the plain accessors panic, the `try_*` accessors return
/// [`Error::TypeMismatch`].
///
/// # Thread Safety
///
/// The key/value map is guarded by a single `parking_lot::RwLock` which is only
/// held for map access, never while a value is being constructed. Construction
/// in [`get_or_create`](Self::get_or_create) is serialized per key through a
/// sharded table of `OnceCell`s, so factories for different keys run in parallel
/// while a given key's factory runs at most once.
///
/// # Examples
///
/// ```
/// use tagcache_core::ObjectStore;
///
/// let store = ObjectStore::new();
/// assert!(store.insert("answer", 42u32));
/// assert!(!store.insert("answer", 7u32));
///
/// assert_eq!(store.find::<u32>("answer").as_deref(), Some(&42));
/// assert!(store.find::<u32>("missing").is_none());
///
/// let greeting = store.get_or_create("greeting", || String::from("hello"));
/// assert_eq!(greeting.as_str(), "hello");
/// ```
#[derive(Default)]
pub struct ObjectStore {
    values: RwLock<HashMap<String, Value>>,
    pending: DashMap<String, Arc<OnceCell<Value>>>,
}

impl ObjectStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `key` only if the key is absent.
    ///
    /// Returns `false` and leaves the stored value untouched when the key is
    /// already present.
    pub fn insert<T: Any + Send + Sync>(&self, key: &str, value: T) -> bool {
        let mut values = self.values.write();
        if values.contains_key(key) {
            return false;
        }
        values.insert(key.to_string(), Arc::new(value));
        true
    }

    /// Replaces the value stored under `key`, returning whether one existed.
    pub fn replace<T: Any + Send + Sync>(&self, key: &str, value: T) -> bool {
        self.values
            .write()
            .insert(key.to_string(), Arc::new(value))
            .is_some()
    }

    /// Removes the value stored under `key`, returning whether one existed.
    ///
    /// Handles previously returned by the store stay valid.
    pub fn remove(&self, key: &str) -> bool {
        self.values.write().remove(key).is_some()
    }

    /// Returns a handle to the value stored under `key`.
    ///
    /// # Panics
    ///
    /// Panics if the value was stored under a different type.
    pub fn find<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        self.try_find(key).unwrap_or_else(|err| panic!("{err}"))
    }

    /// Returns a handle to the value stored under `key`, or a
    /// [`Error::TypeMismatch`] if it was stored under a different type.
    pub fn try_find<T: Any + Send + Sync>(&self, key: &str) -> Result<Option<Arc<T>>> {
        let found = self.values.read().get(key).cloned();
        found.map(|value| downcast(key, value)).transpose()
    }

    /// Returns the value stored under `key`, constructing it with `factory` if
    /// absent.
    ///
    /// The store owns one construction lock per key: concurrent callers for the
    /// same key block until the first one has published its value and then
    /// receive that value, so `factory` runs at most once per key. Callers for
    /// other keys are not blocked.
    ///
    /// # Panics
    ///
    /// Panics if an existing value was stored under a different type. A panic
    /// raised by `factory` propagates and leaves the key absent.
    pub fn get_or_create<T, F>(&self, key: &str, factory: F) -> Arc<T>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> T,
    {
        self.try_get_or_create(key, factory)
            .unwrap_or_else(|err| panic!("{err}"))
    }

    /// Fallible form of [`get_or_create`](Self::get_or_create).
    pub fn try_get_or_create<T, F>(&self, key: &str, factory: F) -> Result<Arc<T>>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> T,
    {
        if let Some(found) = self.try_find(key)? {
            return Ok(found);
        }

        let slot = self.pending_slot(key);
        let value = Arc::clone(slot.cell.get_or_init(|| {
            // A previous creator may have published and retired its cell
            // between our lookup and the pending entry.
            if let Some(existing) = self.values.read().get(key) {
                return Arc::clone(existing);
            }
            trace!(key, "constructing stored value");
            let created: Value = Arc::new(factory());
            Arc::clone(
                self.values
                    .write()
                    .entry(key.to_string())
                    .or_insert(created),
            )
        }));
        drop(slot);

        downcast(key, value)
    }

    /// Returns the value stored under `key`, constructing it with `factory`
    /// while holding a caller-supplied lock.
    ///
    /// The store only guarantees its own map is race-free; the at-most-once
    /// construction guarantee holds only if every call site sharing a key
    /// domain passes the same `lock`.
    ///
    /// # Panics
    ///
    /// Panics if an existing value was stored under a different type.
    pub fn get_or_create_with_lock<T, F>(&self, key: &str, lock: &Mutex<()>, factory: F) -> Arc<T>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> T,
    {
        let _guard = lock.lock();
        if let Some(found) = self.find(key) {
            return found;
        }
        trace!(key, "constructing stored value under external lock");
        let created: Value = Arc::new(factory());
        let value = Arc::clone(
            self.values
                .write()
                .entry(key.to_string())
                .or_insert(created),
        );
        downcast(key, value).unwrap_or_else(|err| panic!("{err}"))
    }

    /// Joins or opens the pending construction for `key`.
    ///
    /// A cell that is already initialized belongs to a construction that
    /// published before the caller looked up `key`; since the lookup missed,
    /// the value has been removed since and the cell is retired.
    fn pending_slot<'a>(&'a self, key: &'a str) -> PendingSlot<'a> {
        loop {
            // The dashmap guard must be released before initialization blocks.
            let cell = Arc::clone(self.pending.entry(key.to_string()).or_default().value());
            let slot = PendingSlot {
                pending: &self.pending,
                key,
                cell,
            };
            if slot.cell.get().is_none() {
                return slot;
            }
        }
    }

    /// Returns whether a value is stored under `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.read().contains_key(key)
    }

    /// Returns the number of stored values.
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}

/// A pending construction cell, retired from the table when dropped.
///
/// Dropping also runs while a panicking factory unwinds, so a failed
/// construction never leaves its cell behind.
struct PendingSlot<'a> {
    pending: &'a DashMap<String, Arc<OnceCell<Value>>>,
    key: &'a str,
    cell: Arc<OnceCell<Value>>,
}

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        self.pending
            .remove_if(self.key, |_, pending| Arc::ptr_eq(pending, &self.cell));
    }
}

fn downcast<T: Any + Send + Sync>(key: &str, value: Value) -> Result<Arc<T>> {
    value
        .downcast::<T>()
        .map_err(|_| Error::type_mismatch::<T>(key))
}
