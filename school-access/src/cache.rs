//! Caching layer for on-demand quick-win searches.
//!
//! A search over a few hundred candidates takes long enough that repeated
//! identical requests should not rerun it. Plans are cached per parameter
//! set; the graph they were computed on never changes while the server runs.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache as MokaCache;
use tracing::debug;

use crate::metrics::Weighting;
use crate::optimizer::{CandidatePlacement, QuickWinConfig, QuickWinPlan};

/// Cache key: (threshold bits, threshold2 bits, budget, weighting, detour bits).
///
/// Thresholds are keyed by their bit patterns; `None` is centroid placement.
type PlanKey = (u64, u64, usize, Weighting, Option<u64>);

/// Configuration for the cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for cached entries.
    pub ttl: Duration,

    /// Maximum number of cached entries.
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(600),
            max_capacity: 64,
        }
    }
}

/// Cache of quick-win plans keyed by search parameters.
pub struct PlanCache {
    plans: MokaCache<PlanKey, Arc<QuickWinPlan>>,
}

impl PlanCache {
    /// Create a new cache with the given configuration.
    pub fn new(config: &CacheConfig) -> Self {
        let plans = MokaCache::builder()
            .time_to_live(config.ttl)
            .max_capacity(config.max_capacity)
            .build();
        Self { plans }
    }

    fn key(search: &QuickWinConfig) -> PlanKey {
        let detour = match search.placement {
            CandidatePlacement::Centroid => None,
            CandidatePlacement::Detour { max_offset_m } => Some(max_offset_m.to_bits()),
        };
        (
            search.threshold_min.to_bits(),
            search.threshold2_min.to_bits(),
            search.max_new_stops,
            search.weighting,
            detour,
        )
    }

    /// Return the cached plan for `search`, computing it with `compute` on a
    /// miss.
    ///
    /// Errors are returned to the caller and not cached.
    pub async fn get_or_compute<E, F, Fut>(
        &self,
        search: &QuickWinConfig,
        compute: F,
    ) -> Result<Arc<QuickWinPlan>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<QuickWinPlan, E>>,
    {
        let key = Self::key(search);

        if let Some(cached) = self.plans.get(&key).await {
            debug!(budget = search.max_new_stops, "quick-win cache hit");
            return Ok(cached);
        }

        let plan = Arc::new(compute().await?);
        self.plans.insert(key, plan.clone()).await;
        Ok(plan)
    }

    /// Get cache statistics (for monitoring).
    pub fn entry_count(&self) -> u64 {
        self.plans.entry_count()
    }

    /// Invalidate all cached entries.
    pub fn invalidate_all(&self) {
        self.plans.invalidate_all();
    }

    /// Apply pending inserts and evictions so `entry_count` is current.
    pub async fn run_pending_tasks(&self) {
        self.plans.run_pending_tasks().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::AggregateKpis;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn empty_plan(candidates: usize) -> QuickWinPlan {
        QuickWinPlan {
            baseline: AggregateKpis::empty(),
            projected: AggregateKpis::empty(),
            candidates_considered: candidates,
            picks: vec![],
        }
    }

    #[test]
    fn default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.ttl, Duration::from_secs(600));
        assert_eq!(config.max_capacity, 64);
    }

    #[test]
    fn keys_distinguish_parameters() {
        let base = QuickWinConfig::default();
        let key = PlanCache::key(&base);

        assert_eq!(key, PlanCache::key(&QuickWinConfig::default()));
        assert_ne!(key, PlanCache::key(&QuickWinConfig::new(12.0, 15.0, 10)));
        assert_ne!(key, PlanCache::key(&QuickWinConfig::new(10.0, 15.0, 3)));
        assert_ne!(key, PlanCache::key(&base.with_weighting(Weighting::Uniform)));
        assert_ne!(
            key,
            PlanCache::key(&base.with_placement(CandidatePlacement::Detour { max_offset_m: 0.0 }))
        );
    }

    #[tokio::test]
    async fn computes_once_per_key() {
        let cache = PlanCache::new(&CacheConfig::default());
        let calls = AtomicUsize::new(0);
        let search = QuickWinConfig::default();

        for _ in 0..3 {
            let plan = cache
                .get_or_compute(&search, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(empty_plan(7))
                })
                .await
                .unwrap();
            assert_eq!(plan.candidates_considered, 7);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let other = QuickWinConfig::new(10.0, 15.0, 1);
        cache
            .get_or_compute(&other, || async { Ok::<_, String>(empty_plan(1)) })
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        cache.run_pending_tasks().await;
        assert_eq!(cache.entry_count(), 2);

        cache.invalidate_all();
        cache.run_pending_tasks().await;
        assert_eq!(cache.entry_count(), 0);
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let cache = PlanCache::new(&CacheConfig::default());
        let search = QuickWinConfig::default();

        let err = cache
            .get_or_compute(&search, || async { Err::<QuickWinPlan, _>("boom") })
            .await
            .unwrap_err();
        assert_eq!(err, "boom");

        let plan = cache
            .get_or_compute(&search, || async { Ok::<_, &str>(empty_plan(2)) })
            .await
            .unwrap();
        assert_eq!(plan.candidates_considered, 2);
    }
}
