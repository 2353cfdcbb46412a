use std::future::Future;
use std::time::Duration;

use augur_models::market::MarketDetail;
use moka::future::Cache;

/// Resolved market details, reachable by condition id and by slug.
///
/// Misses are never cached, so a market that appears later is picked up on
/// the next lookup.
pub struct MarketCache {
    inner: Cache<String, MarketDetail>,
}

impl MarketCache {
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn get(&self, id_or_slug: &str) -> Option<MarketDetail> {
        self.inner.get(id_or_slug.trim()).await
    }

    /// Store under the lookup key plus the market's own condition id and slug.
    pub async fn insert(&self, id_or_slug: &str, market: &MarketDetail) {
        let mut keys = vec![id_or_slug.trim()];
        for key in [market.condition_id.as_str(), market.slug.as_str()] {
            if !key.is_empty() && !keys.contains(&key) {
                keys.push(key);
            }
        }
        for key in keys {
            self.inner.insert(key.to_string(), market.clone()).await;
        }
    }

    /// Cached detail, or the result of `fetch` (cached when found).
    pub async fn get_or_fetch<F, Fut, E>(
        &self,
        id_or_slug: &str,
        fetch: F,
    ) -> Result<Option<MarketDetail>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<MarketDetail>, E>>,
    {
        if let Some(hit) = self.get(id_or_slug).await {
            return Ok(Some(hit));
        }
        let fetched = fetch().await?;
        if let Some(market) = &fetched {
            self.insert(id_or_slug, market).await;
        }
        Ok(fetched)
    }
}
