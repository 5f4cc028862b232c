// Copyright (c) 2026 Betanet
// Licensed under the Apache License, Version 2.0

//! In-memory content cache with a byte ceiling and LRA eviction.
//!
//! Records are never cached here; only content blobs, which can be re-fetched
//! from the store or the network after eviction.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;

/// Default cache ceiling: 100 MiB.
pub const DEFAULT_MAX_CACHE_BYTES: usize = 100 * 1024 * 1024;

#[derive(Clone, Debug)]
struct CacheEntry {
    bytes: Vec<u8>,
    last_access: u64,
}

/// Least-recently-accessed content cache.
pub struct ContentCache {
    max_bytes: usize,
    usage: usize,
    tick: u64,
    entries: BTreeMap<String, CacheEntry>,
}

impl ContentCache {
    /// New cache with a byte ceiling.
    pub fn new(max_bytes: usize) -> Self {
        Self {
            max_bytes,
            usage: 0,
            tick: 0,
            entries: BTreeMap::new(),
        }
    }

    /// Bytes currently cached.
    pub fn usage(&self) -> usize {
        self.usage
    }

    /// Fetch a blob, marking it most recently accessed.
    pub fn get(&mut self, cid: &str) -> Option<Vec<u8>> {
        self.tick += 1;
        let tick = self.tick;
        let entry = self.entries.get_mut(cid)?;
        entry.last_access = tick;
        Some(entry.bytes.clone())
    }

    /// Insert a blob. Oversized blobs (larger than the whole ceiling) are
    /// not cached.
    pub fn put(&mut self, cid: &str, bytes: Vec<u8>) {
        if bytes.len() > self.max_bytes {
            return;
        }
        self.tick += 1;
        if let Some(old) = self.entries.remove(cid) {
            self.usage -= old.bytes.len();
        }
        self.usage += bytes.len();
        self.entries.insert(
            cid.to_string(),
            CacheEntry {
                bytes,
                last_access: self.tick,
            },
        );
    }

    /// Drop a blob (e.g. after a delete record removed it from the store).
    pub fn remove(&mut self, cid: &str) {
        if let Some(old) = self.entries.remove(cid) {
            self.usage -= old.bytes.len();
        }
    }

    /// Evict least-recently-accessed entries until usage is at or under the
    /// ceiling. Returns the number of evicted blobs.
    pub fn evict_to_limit(&mut self) -> usize {
        let mut evicted = 0usize;
        while self.usage > self.max_bytes {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_access)
                .map(|(k, _)| k.clone());
            let Some(key) = oldest else { break };
            if let Some(old) = self.entries.remove(&key) {
                self.usage -= old.bytes.len();
            }
            evicted += 1;
        }
        evicted
    }
}

impl Default for ContentCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CACHE_BYTES)
    }
}
