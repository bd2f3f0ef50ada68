//! Reference-data cache.
//!
//! Reference data (grades, interests, code-to-name mappings) changes rarely
//! and is fetched from CSRS on demand. Entries are keyed by an explicit
//! cache region and checked against a pluggable eviction policy on every
//! read; the shipped default never evicts, matching the process-lifetime
//! behaviour the rest of the application expects.
//!
//! Concurrent first-time misses are not coordinated: both callers fetch and
//! both store. The duplicate fetch is wasteful but harmless, and avoiding
//! it would need a lock held across an upstream call.

use std::future::Future;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::Value;

/// The reference-data regions this application caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheRegion {
    Grades,
    Interests,
    DepartmentCodeToName,
    DepartmentCodeToAbbreviation,
    GradeCodeToName,
}

/// Decides whether a cached entry is still usable.
pub trait EvictionPolicy: Send + Sync {
    fn should_evict(&self, inserted_at: DateTime<Utc>) -> bool;
}

/// Entries persist for the process lifetime.
pub struct NeverEvict;

impl EvictionPolicy for NeverEvict {
    fn should_evict(&self, _inserted_at: DateTime<Utc>) -> bool {
        false
    }
}

/// Evict entries older than a fixed age.
pub struct MaxAge(pub chrono::Duration);

impl EvictionPolicy for MaxAge {
    fn should_evict(&self, inserted_at: DateTime<Utc>) -> bool {
        Utc::now() - inserted_at > self.0
    }
}

struct CacheEntry {
    value: Value,
    inserted_at: DateTime<Utc>,
}

pub struct ReferenceCache {
    entries: DashMap<CacheRegion, CacheEntry>,
    policy: Box<dyn EvictionPolicy>,
}

impl ReferenceCache {
    pub fn new(policy: Box<dyn EvictionPolicy>) -> Self {
        Self {
            entries: DashMap::new(),
            policy,
        }
    }

    pub fn get(&self, region: CacheRegion) -> Option<Value> {
        let entry = self.entries.get(&region)?;
        if self.policy.should_evict(entry.inserted_at) {
            drop(entry);
            self.entries.remove(&region);
            return None;
        }
        Some(entry.value.clone())
    }

    pub fn put(&self, region: CacheRegion, value: Value) {
        self.entries.insert(
            region,
            CacheEntry {
                value,
                inserted_at: Utc::now(),
            },
        );
    }

    /// Return the cached value for `region`, invoking `fetcher` and storing
    /// its result on a miss. The map is not held across the fetch, so
    /// concurrent misses each fetch once.
    pub async fn get_or_fetch<F, Fut, E>(&self, region: CacheRegion, fetcher: F) -> Result<Value, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, E>>,
    {
        if let Some(value) = self.get(region) {
            return Ok(value);
        }

        let value = fetcher().await?;
        self.put(region, value.clone());
        Ok(value)
    }
}

impl Default for ReferenceCache {
    fn default() -> Self {
        Self::new(Box::new(NeverEvict))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn hit_skips_the_fetcher() {
        let cache = ReferenceCache::default();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value: Result<Value, Infallible> = cache
                .get_or_fetch(CacheRegion::Grades, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(json!({"grades": ["AA"]}))
                })
                .await;
            assert_eq!(value.unwrap()["grades"][0], "AA");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_first_reads_both_fetch_and_agree() {
        let cache = Arc::new(ReferenceCache::default());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..2 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                let value: Result<Value, Infallible> = cache
                    .get_or_fetch(CacheRegion::Interests, || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        // keep both tasks inside the miss window
                        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                        Ok(json!(["commercial awareness"]))
                    })
                    .await;
                value.unwrap()
            }));
        }

        let first = handles.pop().unwrap().await.unwrap();
        let second = handles.pop().unwrap().await.unwrap();

        // the stampede is tolerated, not prevented
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn failed_fetch_is_not_cached() {
        let cache = ReferenceCache::default();

        let result: Result<Value, &str> = cache
            .get_or_fetch(CacheRegion::Grades, || async { Err("upstream down") })
            .await;
        assert!(result.is_err());
        assert!(cache.get(CacheRegion::Grades).is_none());
    }

    #[test]
    fn max_age_policy_evicts_old_entries() {
        let cache = ReferenceCache::new(Box::new(MaxAge(chrono::Duration::zero())));
        cache.put(CacheRegion::Grades, json!(1));
        assert!(cache.get(CacheRegion::Grades).is_none());
    }
}
