//! The shared tier capability.
//!
//! Both cache tiers implement one `get`/`put` trait so the coordinator's
//! orchestration is written once; the failure behavior that differs between
//! tiers (memory never fails, the durable store can be unreachable or hit its
//! uniqueness constraint) stays inside each implementation.

use async_trait::async_trait;
use thiserror::Error;

use crate::cache::key::CacheKey;
use crate::models::analysis::CachedAnalysis;

#[derive(Debug, Error)]
pub enum TierError {
    /// The tier is transiently unreachable. Distinct from "not found";
    /// the coordinator degrades on it and never fails the caller.
    #[error("cache tier unavailable: {0}")]
    Unavailable(String),

    /// A concurrent writer already inserted an entry for this key.
    /// Signals a race, not a fault; the coordinator converges on the
    /// stored entry.
    #[error("an entry already exists for this key")]
    Conflict,
}

/// One layer of the cache hierarchy, keyed by [`CacheKey`].
///
/// `put` has insert semantics for durable tiers (duplicate key →
/// [`TierError::Conflict`]) and overwrite semantics for the memory tier.
#[async_trait]
pub trait CacheTier: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedAnalysis>, TierError>;

    async fn put(&self, key: &CacheKey, entry: &CachedAnalysis) -> Result<(), TierError>;
}
