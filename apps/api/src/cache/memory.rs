//! Process-local cache tier.
//!
//! Unbounded map from key to (entry, insertion instant), volatile, entries
//! expire a fixed TTL after insertion. No eviction beyond TTL. This tier can
//! never fail a request; an error here would be a logic bug, not a runtime
//! fault.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::cache::key::CacheKey;
use crate::cache::tier::{CacheTier, TierError};
use crate::models::analysis::CachedAnalysis;

/// Entries are served for 24 hours from insertion, then treated as absent.
pub const MEMORY_TTL: Duration = Duration::from_secs(24 * 60 * 60);

pub struct MemoryTier {
    // Lock is held only across synchronous map operations, never across an
    // await point.
    entries: Mutex<HashMap<CacheKey, (CachedAnalysis, Instant)>>,
    ttl: Duration,
}

impl MemoryTier {
    pub fn new() -> Self {
        Self::with_ttl(MEMORY_TTL)
    }

    /// Test constructor overriding the TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }
}

impl Default for MemoryTier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheTier for MemoryTier {
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedAnalysis>, TierError> {
        let mut entries = self.entries.lock().expect("memory tier mutex poisoned");

        match entries.get(key) {
            Some((entry, inserted_at)) if inserted_at.elapsed() < self.ttl => {
                Ok(Some(entry.clone()))
            }
            Some(_) => {
                // Expired. Purge in place so the unbounded map does not
                // accumulate dead pairs.
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn put(&self, key: &CacheKey, entry: &CachedAnalysis) -> Result<(), TierError> {
        let mut entries = self.entries.lock().expect("memory tier mutex poisoned");
        // Overwrites any existing entry and resets its insertion timestamp.
        entries.insert(key.clone(), (entry.clone(), Instant::now()));
        Ok(())
    }
}
