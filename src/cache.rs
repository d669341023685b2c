//! Bounded, lock-guarded cache of loaded encoding resources.
//!
//! One [`ResourceCache`] exists per resource namespace (CID-to-Unicode,
//! Unicode-to-Unicode, Unicode map, CMap). Entries are handed out as
//! `Arc<T>`; the number of outstanding clones is the entry's holder count.
//!
//! Eviction is least-recently-used, but an entry that some caller still
//! holds is never evicted. The cache may therefore temporarily grow past its
//! capacity when every entry is in use, and shrinks back on later inserts.
//!
//! Loading happens outside the lock. Two threads missing on the same key
//! may both run the loader; the first result to be inserted is retained and
//! the later one is dropped in favour of the retained handle, so every
//! caller ends up sharing a single `Arc`.

use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use indexmap::IndexMap;

use crate::diagnostics::Diagnostics;
use crate::error::{ResourceKind, Result};

/// Default number of entries kept per namespace.
pub const DEFAULT_CACHE_CAPACITY: usize = 4;

/// Keyed cache with load-on-miss semantics.
pub struct ResourceCache<K, T> {
    kind: ResourceKind,
    capacity: usize,
    entries: Mutex<IndexMap<K, Arc<T>>>,
    diagnostics: Arc<Diagnostics>,
}

impl<K, T> fmt::Debug for ResourceCache<K, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceCache")
            .field("kind", &self.kind)
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

impl<K, T> ResourceCache<K, T>
where
    K: Eq + Hash + Clone + fmt::Debug,
{
    /// Create an empty cache for `kind` holding up to `capacity` idle entries.
    pub fn new(kind: ResourceKind, capacity: usize) -> Self {
        Self::with_diagnostics(kind, capacity, Arc::new(Diagnostics::default()))
    }

    /// Create an empty cache that reports load failures through `diagnostics`.
    pub fn with_diagnostics(
        kind: ResourceKind,
        capacity: usize,
        diagnostics: Arc<Diagnostics>,
    ) -> Self {
        Self {
            kind,
            capacity,
            entries: Mutex::new(IndexMap::new()),
            diagnostics,
        }
    }

    /// Namespace served by this cache.
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Return the cached resource for `key`, running `load` on a miss.
    ///
    /// Both "not found" and "failed to load" come back as `None`; the
    /// failure is reported through diagnostics and nothing is cached, so a
    /// later call retries the load.
    pub fn get_or_load<F>(&self, key: &K, load: F) -> Option<Arc<T>>
    where
        F: FnOnce(&K) -> Result<T>,
    {
        if let Some(hit) = self.lookup(key) {
            return Some(hit);
        }

        let loaded = match load(key) {
            Ok(value) => Arc::new(value),
            Err(e) if e.is_miss() => {
                log::debug!("{} cache miss for {:?}: {}", self.kind, key, e);
                return None;
            },
            Err(e) => {
                self.diagnostics.error(format_args!("{}", e));
                return None;
            },
        };

        Some(self.insert(key.clone(), loaded))
    }

    /// Return the cached resource for `key` without loading.
    pub fn get(&self, key: &K) -> Option<Arc<T>> {
        self.lookup(key)
    }

    /// Drop the entry for `key`. Outstanding handles stay valid.
    pub fn invalidate(&self, key: &K) -> bool {
        match self.entries.lock() {
            Ok(mut entries) => entries.shift_remove(key).is_some(),
            Err(_) => false,
        }
    }

    /// Drop every entry.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    /// True if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if an entry for `key` is retained.
    pub fn contains(&self, key: &K) -> bool {
        self.entries
            .lock()
            .map(|e| e.contains_key(key))
            .unwrap_or(false)
    }

    fn lookup(&self, key: &K) -> Option<Arc<T>> {
        let mut entries = self.entries.lock().ok()?;
        let pos = entries.get_index_of(key)?;
        let value = Arc::clone(entries.get_index(pos)?.1);
        let last = entries.len() - 1;
        if pos != last {
            entries.move_index(pos, last);
        }
        Some(value)
    }

    fn insert(&self, key: K, value: Arc<T>) -> Arc<T> {
        let Ok(mut entries) = self.entries.lock() else {
            // Poisoned: hand out the fresh value uncached
            return value;
        };

        if let Some(existing) = entries.get(&key) {
            log::debug!("{} cache: concurrent load of {:?} discarded", self.kind, key);
            return Arc::clone(existing);
        }

        entries.insert(key, Arc::clone(&value));
        self.evict(&mut entries);
        value
    }

    /// Evict idle entries, oldest first, until the cache fits its capacity.
    fn evict(&self, entries: &mut IndexMap<K, Arc<T>>) {
        let mut pos = 0;
        while entries.len() > self.capacity && pos < entries.len() {
            let idle = entries
                .get_index(pos)
                .map(|(_, v)| Arc::strong_count(v) == 1)
                .unwrap_or(false);
            if idle {
                if let Some((key, _)) = entries.shift_remove_index(pos) {
                    log::trace!("{} cache: evicted {:?}", self.kind, key);
                }
            } else {
                pos += 1;
            }
        }
    }
}
