//! Region-scoped read cache with TTL and coarse invalidation.
//!
//! Regions mirror the derived views the pipeline serves: top candidates
//! per job, recommended jobs per candidate, and individual match scores.
//! Invalidation is deliberately coarse: a write that could affect a region
//! clears the whole region rather than chasing individual keys.

use metrics::counter;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::config::CacheConfig;
use crate::error::Result;

/// Ranked candidates per job.
pub const TOP_CANDIDATES_REGION: &str = "top_candidates";
/// Ranked jobs per candidate.
pub const RECOMMENDED_JOBS_REGION: &str = "recommended_jobs";
/// Individual candidate-vs-job scores.
pub const SCORES_REGION: &str = "scores";

#[derive(Debug, Clone)]
struct Entry {
    value: serde_json::Value,
    expires_at: Instant,
}

/// Point-in-time cache counters.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// In-memory cache partitioned into named regions.
pub struct RegionCache {
    regions: RwLock<HashMap<String, HashMap<String, Entry>>>,
    stats: RwLock<CacheStats>,
    default_ttl: Duration,
    max_entries_per_region: usize,
}

impl RegionCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            regions: RwLock::new(HashMap::new()),
            stats: RwLock::new(CacheStats::default()),
            default_ttl: Duration::from_secs(config.default_ttl_secs),
            max_entries_per_region: config.max_entries_per_region,
        }
    }

    /// Store a value under a region and key.
    ///
    /// `ttl` defaults to the configured region TTL. When a region is full,
    /// the entry closest to expiry is evicted first.
    pub fn put<T: Serialize>(
        &self,
        region: &str,
        key: impl Into<String>,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let value = serde_json::to_value(value)?;
        let ttl = ttl.unwrap_or(self.default_ttl);
        let key = key.into();

        let mut regions = self.regions.write();
        let entries = regions.entry(region.to_string()).or_default();

        if entries.len() >= self.max_entries_per_region && !entries.contains_key(&key) {
            if let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, e)| e.expires_at)
                .map(|(k, _)| k.clone())
            {
                entries.remove(&oldest);
                self.stats.write().evictions += 1;
            }
        }

        entries.insert(
            key,
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    /// Fetch a value, dropping it if expired.
    pub fn get<T: DeserializeOwned>(&self, region: &str, key: &str) -> Option<T> {
        let mut regions = self.regions.write();
        let entries = regions.get_mut(region)?;

        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                let value = serde_json::from_value(entry.value.clone()).ok();
                if value.is_some() {
                    self.stats.write().hits += 1;
                    counter!("hirestream_cache_hits_total", "region" => region.to_string())
                        .increment(1);
                }
                value
            }
            Some(_) => {
                // lazily evict expired entries
                entries.remove(key);
                self.stats.write().misses += 1;
                None
            }
            None => {
                self.stats.write().misses += 1;
                counter!("hirestream_cache_misses_total", "region" => region.to_string())
                    .increment(1);
                None
            }
        }
    }

    /// Drop every entry in a region.
    pub fn clear_region(&self, region: &str) {
        let mut regions = self.regions.write();
        if let Some(entries) = regions.get_mut(region) {
            let dropped = entries.len();
            entries.clear();
            debug!(region, dropped, "cache region cleared");
            counter!("hirestream_cache_region_clears_total", "region" => region.to_string())
                .increment(1);
        }
    }

    /// Number of live entries in a region (expired entries may be counted
    /// until their lazy eviction).
    pub fn len(&self, region: &str) -> usize {
        self.regions
            .read()
            .get(region)
            .map(|e| e.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self, region: &str) -> bool {
        self.len(region) == 0
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.read().clone()
    }
}

/// Cache key for a candidate-vs-job score.
pub fn score_key(candidate_id: impl std::fmt::Display, job_id: impl std::fmt::Display) -> String {
    format!("score:candidate:{}:job:{}", candidate_id, job_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> RegionCache {
        RegionCache::new(&CacheConfig {
            default_ttl_secs: 600,
            score_ttl_secs: 86_400,
            max_entries_per_region: 3,
        })
    }

    #[test]
    fn test_put_get_roundtrip() {
        let cache = cache();
        cache
            .put(SCORES_REGION, "k", &vec![1.0_f32, 2.0], None)
            .unwrap();
        let value: Vec<f32> = cache.get(SCORES_REGION, "k").unwrap();
        assert_eq!(value, vec![1.0, 2.0]);
    }

    #[test]
    fn test_regions_are_isolated() {
        let cache = cache();
        cache.put(TOP_CANDIDATES_REGION, "k", &1_u32, None).unwrap();
        cache.put(RECOMMENDED_JOBS_REGION, "k", &2_u32, None).unwrap();

        cache.clear_region(TOP_CANDIDATES_REGION);
        assert!(cache.get::<u32>(TOP_CANDIDATES_REGION, "k").is_none());
        assert_eq!(cache.get::<u32>(RECOMMENDED_JOBS_REGION, "k"), Some(2));
    }

    #[test]
    fn test_expired_entries_are_dropped() {
        let cache = cache();
        cache
            .put(SCORES_REGION, "k", &1_u32, Some(Duration::from_millis(0)))
            .unwrap();
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get::<u32>(SCORES_REGION, "k").is_none());
    }

    #[test]
    fn test_capacity_eviction() {
        let cache = cache();
        for i in 0..4 {
            cache
                .put(SCORES_REGION, format!("k{}", i), &i, None)
                .unwrap();
        }
        assert_eq!(cache.len(SCORES_REGION), 3);
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_score_key_format() {
        assert_eq!(score_key("cid", "jid"), "score:candidate:cid:job:jid");
    }
}
