//! The pathname → filehandle cache.
//!
//! Maps absolute paths to `(filehandle, attributes, install time)`. Two
//! disciplines bound it: strict least-recently-used eviction when the
//! capacity is reached, and an age limit applied lazily. The age sweep
//! walks every entry, so the resolver only triggers it when the cache is
//! full (the same gate the capacity check already pays for).
//!
//! Entries are also removed explicitly when the server declares a handle
//! stale, which is the only coherence signal NFS offers.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::client::attr::{Fattr, FileHandle};

/// Default capacity, overridable with the `cachesize` option.
pub const DEFAULT_CAPACITY: usize = 1024;
/// Default per-entry freshness bound, overridable with `cachetimeout`.
pub const DEFAULT_TTL: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
struct Entry {
    fh: FileHandle,
    attr: Fattr,
    installed: Instant,
    /// Recency stamp from the cache's monotone counter; smallest is the
    /// least recently used.
    used: u64,
}

/// LRU + TTL cache of resolved path handles.
#[derive(Debug)]
pub struct HandleCache {
    capacity: usize,
    ttl: Duration,
    entries: HashMap<String, Entry>,
    tick: u64,
}

impl HandleCache {
    pub fn new(capacity: usize, ttl: Duration) -> HandleCache {
        HandleCache {
            capacity: capacity.max(1),
            ttl,
            entries: HashMap::new(),
            tick: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn bump(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    /// Looks up `path`, marking the entry most recently used.
    pub fn get(&mut self, path: &str) -> Option<(FileHandle, Fattr)> {
        let tick = self.bump();
        let entry = self.entries.get_mut(path)?;
        entry.used = tick;
        Some((entry.fh.clone(), entry.attr))
    }

    /// Installs or refreshes `path`. A new entry evicts the least recently
    /// used one when the cache is full.
    pub fn insert(&mut self, path: &str, fh: FileHandle, attr: Fattr) {
        let tick = self.bump();
        if let Some(entry) = self.entries.get_mut(path) {
            entry.fh = fh;
            entry.attr = attr;
            entry.installed = Instant::now();
            entry.used = tick;
            return;
        }
        if self.entries.len() >= self.capacity {
            self.evict_lru();
        }
        self.entries.insert(
            path.to_string(),
            Entry { fh, attr, installed: Instant::now(), used: tick },
        );
    }

    /// Refreshes the attributes of an existing entry without resetting its
    /// install time; used for post-op attribute writeback.
    pub fn update_attr(&mut self, path: &str, attr: Fattr) {
        if let Some(entry) = self.entries.get_mut(path) {
            entry.attr = attr;
        }
    }

    pub fn remove(&mut self, path: &str) {
        self.entries.remove(path);
    }

    /// Drops entries older than the TTL, but only when the cache sits at
    /// capacity: the sweep is O(N) and pointless while there is room.
    pub fn prune_expired_if_full(&mut self) {
        if self.entries.len() < self.capacity {
            return;
        }
        let ttl = self.ttl;
        self.entries.retain(|_, e| e.installed.elapsed() <= ttl);
    }

    fn evict_lru(&mut self) {
        if let Some(path) = self
            .entries
            .iter()
            .min_by_key(|(_, e)| e.used)
            .map(|(p, _)| p.clone())
        {
            self.entries.remove(&path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fh(byte: u8) -> FileHandle {
        FileHandle(vec![byte; 4])
    }

    #[test]
    fn get_returns_installed_entry() {
        let mut cache = HandleCache::new(4, DEFAULT_TTL);
        cache.insert("/a", fh(1), Fattr::default());
        let (handle, _) = cache.get("/a").expect("entry present");
        assert_eq!(handle, fh(1));
        assert!(cache.get("/b").is_none());
    }

    #[test]
    fn capacity_evicts_least_recently_used() {
        let mut cache = HandleCache::new(4, DEFAULT_TTL);
        for (i, path) in ["/a", "/b", "/c", "/d"].iter().enumerate() {
            cache.insert(path, fh(i as u8), Fattr::default());
        }
        // touch everything but /b, then overflow
        cache.get("/a");
        cache.get("/c");
        cache.get("/d");
        cache.insert("/e", fh(9), Fattr::default());

        assert_eq!(cache.len(), 4);
        assert!(cache.get("/b").is_none());
        assert!(cache.get("/a").is_some());
        assert!(cache.get("/e").is_some());
    }

    #[test]
    fn reinsert_refreshes_instead_of_evicting() {
        let mut cache = HandleCache::new(2, DEFAULT_TTL);
        cache.insert("/a", fh(1), Fattr::default());
        cache.insert("/b", fh(2), Fattr::default());
        cache.insert("/a", fh(3), Fattr::default());
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("/a").unwrap().0, fh(3));
        assert!(cache.get("/b").is_some());
    }

    #[test]
    fn prune_only_runs_at_capacity() {
        let mut cache = HandleCache::new(4, Duration::ZERO);
        cache.insert("/a", fh(1), Fattr::default());
        cache.prune_expired_if_full();
        // below capacity: expired entry survives the gate
        assert_eq!(cache.len(), 1);

        for (i, path) in ["/b", "/c", "/d"].iter().enumerate() {
            cache.insert(path, fh(i as u8), Fattr::default());
        }
        cache.prune_expired_if_full();
        assert!(cache.is_empty());
    }

    #[test]
    fn remove_is_idempotent() {
        let mut cache = HandleCache::new(4, DEFAULT_TTL);
        cache.insert("/a", fh(1), Fattr::default());
        cache.remove("/a");
        cache.remove("/a");
        assert!(cache.get("/a").is_none());
    }
}
