//! In-memory result memoization with per-kind TTLs.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::clock::Clock;
use crate::domain::{IndicatorResult, RatioResult, Symbol};

/// Cache key of the single put/call ratio entry.
pub const RATIO_CACHE_KEY: &str = "put_call_ratio";

#[derive(Debug, Clone)]
struct CacheEntry<T> {
    value: T,
    produced_at: Instant,
}

impl<T> CacheEntry<T> {
    fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.produced_at) < ttl
    }
}

type Slot<T> = Arc<tokio::sync::Mutex<Option<CacheEntry<T>>>>;

/// Keyed TTL cache of successful computations.
///
/// Each key owns a slot guarded by an async mutex, so concurrent callers for the same key
/// queue behind one in-flight computation instead of each running their own. Failures are
/// never stored.
pub struct ResultCache<T> {
    clock: Arc<dyn Clock>,
    slots: Arc<tokio::sync::Mutex<HashMap<String, Slot<T>>>>,
}

impl<T> Clone for ResultCache<T> {
    fn clone(&self) -> Self {
        Self {
            clock: Arc::clone(&self.clock),
            slots: Arc::clone(&self.slots),
        }
    }
}

impl<T: Clone> ResultCache<T> {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            slots: Arc::new(tokio::sync::Mutex::new(HashMap::new())),
        }
    }

    async fn slot(&self, key: &str) -> Slot<T> {
        let mut slots = self.slots.lock().await;
        Arc::clone(slots.entry(key.to_owned()).or_default())
    }

    /// Return the cached value for `key` if younger than `ttl`, otherwise run `compute`.
    ///
    /// A successful result is stored with the clock's current instant. An error is returned
    /// as-is and leaves the key empty, so the next call computes again.
    pub async fn get_or_compute<E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        compute: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let slot = self.slot(key).await;
        let mut entry = slot.lock().await;

        if let Some(cached) = entry.as_ref() {
            if cached.is_fresh(self.clock.now(), ttl) {
                debug!(key, "cache hit");
                return Ok(cached.value.clone());
            }
        }
        *entry = None;

        debug!(key, "cache miss; computing");
        let value = compute().await?;
        *entry = Some(CacheEntry {
            value: value.clone(),
            produced_at: self.clock.now(),
        });
        Ok(value)
    }

    /// Fresh value for `key`, without computing. Waits for an in-flight computation.
    pub async fn get(&self, key: &str, ttl: Duration) -> Option<T> {
        let slot = {
            let slots = self.slots.lock().await;
            Arc::clone(slots.get(key)?)
        };
        let entry = slot.lock().await;
        let now = self.clock.now();
        entry
            .as_ref()
            .filter(|cached| cached.is_fresh(now, ttl))
            .map(|cached| cached.value.clone())
    }

    /// Drop every entry regardless of age.
    pub async fn invalidate_all(&self) {
        let mut slots = self.slots.lock().await;
        slots.clear();
    }

    /// Remove idle slots that are empty or older than `ttl`.
    ///
    /// A slot handed out to a caller that has not locked it yet counts as busy and stays.
    pub async fn purge_expired(&self, ttl: Duration) {
        let now = self.clock.now();
        let mut slots = self.slots.lock().await;
        slots.retain(|_, slot| {
            if Arc::strong_count(slot) > 1 {
                return true;
            }
            match slot.try_lock() {
                Ok(entry) => entry.as_ref().is_some_and(|cached| cached.is_fresh(now, ttl)),
                Err(_) => true,
            }
        });
    }

    /// Number of keys currently tracked, including expired entries.
    pub async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// TTLs per data kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub price_ttl: Duration,
    pub ratio_ttl: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            price_ttl: Duration::from_secs(60),
            ratio_ttl: Duration::from_secs(3_600),
        }
    }
}

/// The dashboard's two typed caches behind one invalidation point.
#[derive(Clone)]
pub struct MarketCache {
    policy: CachePolicy,
    indicators: ResultCache<IndicatorResult>,
    ratio: ResultCache<RatioResult>,
}

impl MarketCache {
    pub fn new(policy: CachePolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            policy,
            indicators: ResultCache::new(Arc::clone(&clock)),
            ratio: ResultCache::new(clock),
        }
    }

    pub async fn indicator<E, F, Fut>(&self, symbol: &Symbol, compute: F) -> Result<IndicatorResult, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<IndicatorResult, E>>,
    {
        self.indicators
            .get_or_compute(symbol.as_str(), self.policy.price_ttl, compute)
            .await
    }

    pub async fn ratio<E, F, Fut>(&self, compute: F) -> Result<RatioResult, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<RatioResult, E>>,
    {
        self.ratio
            .get_or_compute(RATIO_CACHE_KEY, self.policy.ratio_ttl, compute)
            .await
    }

    pub async fn invalidate_all(&self) {
        self.indicators.invalidate_all().await;
        self.ratio.invalidate_all().await;
    }

    pub async fn purge_expired(&self) {
        self.indicators.purge_expired(self.policy.price_ttl).await;
        self.ratio.purge_expired(self.policy.ratio_ttl).await;
    }
}
