//! Lookup orchestration: memory → persistent → compute, strict order, each
//! step short-circuiting on a hit.
//!
//! Degradation contract: the persistent tier being unreachable is never the
//! caller's problem — the coordinator treats it as a miss, logs it, counts it,
//! and moves on. A duplicate-insert conflict means a concurrent resolve won
//! the write race; the coordinator re-reads and converges on the stored entry
//! so callers never diverge on payload content for one key.
//!
//! Concurrent identical misses may both invoke the analyzer: there is no
//! in-flight de-duplication, and the store's uniqueness constraint catches
//! duplicate writes, not duplicate computes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::analysis::validation::validate_analysis_input;
use crate::analyzer::GapAnalyzer;
use crate::cache::key::derive_key;
use crate::cache::tier::{CacheTier, TierError};
use crate::errors::AppError;
use crate::models::analysis::{AnalysisResponse, CachedAnalysis};

/// Counters for the paths the resolve algorithm can take. Cheap to bump,
/// read by tests and logged on degradation.
#[derive(Default)]
pub struct CacheStats {
    pub memory_hits: AtomicU64,
    pub persistent_hits: AtomicU64,
    pub misses: AtomicU64,
    pub computes: AtomicU64,
    pub degraded_probes: AtomicU64,
    pub converged_conflicts: AtomicU64,
}

/// Point-in-time view of [`CacheStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStatsSnapshot {
    pub memory_hits: u64,
    pub persistent_hits: u64,
    pub misses: u64,
    pub computes: u64,
    pub degraded_probes: u64,
    pub converged_conflicts: u64,
}

impl CacheStats {
    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            memory_hits: self.memory_hits.load(Ordering::Relaxed),
            persistent_hits: self.persistent_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            computes: self.computes.load(Ordering::Relaxed),
            degraded_probes: self.degraded_probes.load(Ordering::Relaxed),
            converged_conflicts: self.converged_conflicts.load(Ordering::Relaxed),
        }
    }
}

/// The cache coordinator. Constructed once at startup and injected through
/// `AppState`; owns no global state.
pub struct AnalysisCache {
    memory: Arc<dyn CacheTier>,
    persistent: Arc<dyn CacheTier>,
    stats: CacheStats,
}

impl AnalysisCache {
    pub fn new(memory: Arc<dyn CacheTier>, persistent: Arc<dyn CacheTier>) -> Self {
        Self {
            memory,
            persistent,
            stats: CacheStats::default(),
        }
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }

    /// Resolves an analysis for an input pair, computing via `analyzer` only
    /// on a full cache miss.
    pub async fn resolve(
        &self,
        resume_text: &str,
        jd_text: &str,
        analyzer: &dyn GapAnalyzer,
    ) -> Result<AnalysisResponse, AppError> {
        // Reject unusable input before spending a hash/lookup cycle on it.
        validate_analysis_input(resume_text, jd_text)?;

        let key = derive_key(resume_text, jd_text);

        // Memory probe. A hit here must not touch the persistent tier or
        // the analyzer. The memory tier cannot fail.
        if let Ok(Some(entry)) = self.memory.get(&key).await {
            self.stats.memory_hits.fetch_add(1, Ordering::Relaxed);
            debug!("memory tier hit");
            return Ok(AnalysisResponse::from_entry(entry, true));
        }

        // Persistent probe. Unavailable → degraded mode: treat as a miss,
        // never fail the caller over it.
        match self.persistent.get(&key).await {
            Ok(Some(entry)) => {
                self.stats.persistent_hits.fetch_add(1, Ordering::Relaxed);
                debug!("persistent tier hit, populating memory tier");
                let _ = self.memory.put(&key, &entry).await;
                return Ok(AnalysisResponse::from_entry(entry, true));
            }
            Ok(None) => {}
            Err(TierError::Unavailable(reason)) => {
                self.stats.degraded_probes.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "persistent tier unavailable, degrading to compute-direct path: {reason} ({:?})",
                    self.stats()
                );
            }
            Err(TierError::Conflict) => {
                // A read cannot conflict; treat a misbehaving tier as a miss.
                warn!("persistent tier returned conflict on read, treating as miss");
            }
        }

        // Full miss. An analyzer failure propagates; nothing is cached.
        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        let analysis = analyzer.analyze(resume_text, jd_text).await?;
        self.stats.computes.fetch_add(1, Ordering::Relaxed);

        let mut entry = CachedAnalysis::new(analysis);

        // Persistent first, then memory, so memory never holds an entry the
        // durable store lost in a crash.
        match self.persistent.put(&key, &entry).await {
            Ok(()) => {}
            Err(TierError::Conflict) => {
                // A concurrent resolve inserted this key first. Converge on
                // the stored entry so callers agree on one payload.
                self.stats
                    .converged_conflicts
                    .fetch_add(1, Ordering::Relaxed);
                debug!("duplicate insert for key, converging on stored entry");
                if let Ok(Some(stored)) = self.persistent.get(&key).await {
                    entry = stored;
                }
            }
            Err(TierError::Unavailable(reason)) => {
                self.stats.degraded_probes.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "persistent tier write failed, serving uncached result: {reason} ({:?})",
                    self.stats()
                );
            }
        }

        let _ = self.memory.put(&key, &entry).await;

        Ok(AnalysisResponse::from_entry(entry, false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::AnalyzerError;
    use crate::cache::key::CacheKey;
    use crate::cache::memory::MemoryTier;
    use crate::models::analysis::{GapAnalysis, LearningStep};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use std::sync::Mutex;
    use std::time::Duration;

    fn sample_analysis(skill: &str) -> GapAnalysis {
        GapAnalysis {
            missing_skills: vec![skill.to_string()],
            learning_steps: vec![
                LearningStep {
                    title: "Learn the basics".to_string(),
                    description: "Work through the official book".to_string(),
                },
                LearningStep {
                    title: "Build a project".to_string(),
                    description: "Apply the skill end to end".to_string(),
                },
                LearningStep {
                    title: "Go deeper".to_string(),
                    description: "Read production codebases".to_string(),
                },
            ],
            interview_questions: vec![
                "Explain the core concepts".to_string(),
                "Describe a tradeoff you made".to_string(),
                "How would you debug a failure?".to_string(),
            ],
        }
    }

    /// Deterministic analyzer stub with a yield point so concurrent resolves
    /// interleave the way real suspension points allow.
    struct StubAnalyzer {
        calls: AtomicUsize,
        fail_with: Option<fn() -> AnalyzerError>,
    }

    impl StubAnalyzer {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_with: None,
            }
        }

        fn failing(fail_with: fn() -> AnalyzerError) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_with: Some(fail_with),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GapAnalyzer for StubAnalyzer {
        async fn analyze(
            &self,
            _resume_text: &str,
            _jd_text: &str,
        ) -> Result<GapAnalysis, AnalyzerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            match self.fail_with {
                Some(make_err) => Err(make_err()),
                None => Ok(sample_analysis("kubernetes")),
            }
        }
    }

    /// Fault-injecting tier with insert semantics: a second put for the same
    /// key conflicts, mirroring the durable store's uniqueness constraint.
    #[derive(Default)]
    struct MockTier {
        entries: Mutex<HashMap<CacheKey, CachedAnalysis>>,
        unavailable: AtomicBool,
        gets: AtomicUsize,
        puts: AtomicUsize,
    }

    impl MockTier {
        fn set_unavailable(&self, unavailable: bool) {
            self.unavailable.store(unavailable, Ordering::SeqCst);
        }

        fn len(&self) -> usize {
            self.entries.lock().unwrap().len()
        }

        fn get_count(&self) -> usize {
            self.gets.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CacheTier for MockTier {
        async fn get(&self, key: &CacheKey) -> Result<Option<CachedAnalysis>, TierError> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(TierError::Unavailable("injected outage".to_string()));
            }
            Ok(self.entries.lock().unwrap().get(key).cloned())
        }

        async fn put(&self, key: &CacheKey, entry: &CachedAnalysis) -> Result<(), TierError> {
            self.puts.fetch_add(1, Ordering::SeqCst);
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(TierError::Unavailable("injected outage".to_string()));
            }
            let mut entries = self.entries.lock().unwrap();
            if entries.contains_key(key) {
                return Err(TierError::Conflict);
            }
            entries.insert(key.clone(), entry.clone());
            Ok(())
        }
    }

    fn cache_with(persistent: Arc<MockTier>) -> AnalysisCache {
        AnalysisCache::new(Arc::new(MemoryTier::new()), persistent)
    }

    fn resume() -> String {
        "a".repeat(60)
    }

    fn jd() -> String {
        "b".repeat(60)
    }

    #[tokio::test]
    async fn test_second_identical_resolve_is_cached() {
        let persistent = Arc::new(MockTier::default());
        let cache = cache_with(persistent.clone());
        let analyzer = StubAnalyzer::new();

        let first = cache.resolve(&resume(), &jd(), &analyzer).await.unwrap();
        let second = cache.resolve(&resume(), &jd(), &analyzer).await.unwrap();

        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(first.missing_skills, second.missing_skills);
        assert_eq!(first.learning_steps, second.learning_steps);
        assert_eq!(first.interview_questions, second.interview_questions);
        assert_eq!(analyzer.call_count(), 1);
        assert_eq!(persistent.len(), 1);

        let stats = cache.stats();
        assert_eq!(stats.memory_hits, 1);
        assert_eq!(stats.computes, 1);
    }

    #[tokio::test]
    async fn test_memory_hit_skips_persistent_tier() {
        let persistent = Arc::new(MockTier::default());
        let cache = cache_with(persistent.clone());
        let analyzer = StubAnalyzer::new();

        cache.resolve(&resume(), &jd(), &analyzer).await.unwrap();
        let probes_after_first = persistent.get_count();

        cache.resolve(&resume(), &jd(), &analyzer).await.unwrap();
        assert_eq!(persistent.get_count(), probes_after_first);
    }

    #[tokio::test]
    async fn test_short_input_rejected_before_any_cache_work() {
        let persistent = Arc::new(MockTier::default());
        let cache = cache_with(persistent.clone());
        let analyzer = StubAnalyzer::new();

        let short_resume = "a".repeat(40);
        let err = cache
            .resolve(&short_resume, &jd(), &analyzer)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(analyzer.call_count(), 0);
        assert_eq!(persistent.get_count(), 0);
    }

    #[tokio::test]
    async fn test_persistent_hit_populates_memory() {
        let persistent = Arc::new(MockTier::default());
        let analyzer = StubAnalyzer::new();

        // First coordinator computes and persists.
        let first_cache = cache_with(persistent.clone());
        first_cache
            .resolve(&resume(), &jd(), &analyzer)
            .await
            .unwrap();

        // Fresh coordinator (empty memory, same store) hits persistent,
        // then serves subsequent calls from memory.
        let second_cache = cache_with(persistent.clone());
        let from_store = second_cache
            .resolve(&resume(), &jd(), &analyzer)
            .await
            .unwrap();
        assert!(from_store.cached);
        assert_eq!(analyzer.call_count(), 1);

        let probes = persistent.get_count();
        let from_memory = second_cache
            .resolve(&resume(), &jd(), &analyzer)
            .await
            .unwrap();
        assert!(from_memory.cached);
        assert_eq!(persistent.get_count(), probes);
        assert_eq!(second_cache.stats().persistent_hits, 1);
        assert_eq!(second_cache.stats().memory_hits, 1);
    }

    #[tokio::test]
    async fn test_degraded_mode_still_resolves() {
        let persistent = Arc::new(MockTier::default());
        persistent.set_unavailable(true);
        let cache = cache_with(persistent.clone());
        let analyzer = StubAnalyzer::new();

        let response = cache.resolve(&resume(), &jd(), &analyzer).await.unwrap();
        assert!(!response.cached);
        assert_eq!(persistent.len(), 0);
        assert!(cache.stats().degraded_probes >= 1);

        // After recovery a fresh process finds nothing durably stored and
        // computes again rather than erroring.
        persistent.set_unavailable(false);
        let fresh_cache = cache_with(persistent.clone());
        let recomputed = fresh_cache
            .resolve(&resume(), &jd(), &analyzer)
            .await
            .unwrap();
        assert!(!recomputed.cached);
        assert_eq!(analyzer.call_count(), 2);
        assert_eq!(persistent.len(), 1);
    }

    #[tokio::test]
    async fn test_expired_memory_with_empty_store_recomputes() {
        let persistent = Arc::new(MockTier::default());
        // Memory whose entries expire immediately; the store stays
        // unavailable so nothing is ever durably kept.
        persistent.set_unavailable(true);
        let memory: Arc<dyn CacheTier> = Arc::new(MemoryTier::with_ttl(Duration::ZERO));
        let cache = AnalysisCache::new(memory, persistent);
        let analyzer = StubAnalyzer::new();

        cache.resolve(&resume(), &jd(), &analyzer).await.unwrap();
        let again = cache.resolve(&resume(), &jd(), &analyzer).await.unwrap();

        assert!(!again.cached);
        assert_eq!(analyzer.call_count(), 2);
    }

    #[tokio::test]
    async fn test_analyzer_failure_propagates_and_caches_nothing() {
        let persistent = Arc::new(MockTier::default());
        let cache = cache_with(persistent.clone());
        let analyzer =
            StubAnalyzer::failing(|| AnalyzerError::Unavailable("api down".to_string()));

        let err = cache.resolve(&resume(), &jd(), &analyzer).await.unwrap_err();
        assert!(matches!(err, AppError::AnalyzerUnavailable(_)));
        assert_eq!(persistent.len(), 0);

        // Nothing was cached, so a healthy analyzer computes fresh.
        let healthy = StubAnalyzer::new();
        let response = cache.resolve(&resume(), &jd(), &healthy).await.unwrap();
        assert!(!response.cached);
    }

    #[tokio::test]
    async fn test_concurrent_misses_converge_on_one_stored_entry() {
        let persistent = Arc::new(MockTier::default());
        let cache = cache_with(persistent.clone());
        let analyzer = StubAnalyzer::new();

        // Bound before the join so the borrows outlive both futures.
        let (resume, jd) = (resume(), jd());
        let (a, b) = tokio::join!(
            cache.resolve(&resume, &jd, &analyzer),
            cache.resolve(&resume, &jd, &analyzer),
        );
        let a = a.unwrap();
        let b = b.unwrap();

        // Both raced past the miss and computed; the store holds exactly one
        // record and both callers converged on its identity.
        assert_eq!(analyzer.call_count(), 2);
        assert_eq!(persistent.len(), 1);
        assert_eq!(a.id, b.id);
        assert_eq!(a.missing_skills, b.missing_skills);
        assert_eq!(cache.stats().converged_conflicts, 1);
    }

    #[tokio::test]
    async fn test_swapped_texts_do_not_share_an_entry() {
        let persistent = Arc::new(MockTier::default());
        let cache = cache_with(persistent.clone());
        let analyzer = StubAnalyzer::new();

        cache.resolve(&resume(), &jd(), &analyzer).await.unwrap();
        let swapped = cache.resolve(&jd(), &resume(), &analyzer).await.unwrap();

        assert!(!swapped.cached);
        assert_eq!(analyzer.call_count(), 2);
        assert_eq!(persistent.len(), 2);
    }
}
