use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use augur_agents::{AgentError, MarketDataProvider};
use augur_models::market::{MarketDetail, WalletTrade};
use augur_store::MarketCache;
use tracing::debug;

/// Read-through cache over market metadata. Prices and trades always go upstream.
pub struct CachedMarketData {
    inner: Arc<dyn MarketDataProvider>,
    cache: MarketCache,
}

impl CachedMarketData {
    pub fn new(inner: Arc<dyn MarketDataProvider>, max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner,
            cache: MarketCache::new(max_capacity, ttl),
        }
    }
}

#[async_trait]
impl MarketDataProvider for CachedMarketData {
    async fn market(&self, id_or_slug: &str) -> Result<Option<MarketDetail>, AgentError> {
        self.cache
            .get_or_fetch(id_or_slug, || async {
                debug!(market = %id_or_slug, "Market cache miss");
                self.inner.market(id_or_slug).await
            })
            .await
    }

    async fn prices(&self, token_ids: &[String]) -> Result<HashMap<String, f64>, AgentError> {
        self.inner.prices(token_ids).await
    }

    async fn wallet_trades(&self, wallet: &str, limit: usize) -> Result<Vec<WalletTrade>, AgentError> {
        self.inner.wallet_trades(wallet, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use augur_agents::test_support::{market_detail, FakeMarketData};
    use std::sync::atomic::Ordering;

    fn fake() -> FakeMarketData {
        FakeMarketData::default()
            .with_market("fed-cut", market_detail("0xfed", "fed-cut", &[("Yes", "y")]))
            .with_price("y", 0.4)
    }

    #[tokio::test]
    async fn repeated_lookups_hit_the_cache() {
        let inner = fake();
        let market_calls = inner.market_calls.clone();
        let cached = CachedMarketData::new(Arc::new(inner), 100, Duration::from_secs(60));

        let first = cached.market("fed-cut").await.unwrap();
        let second = cached.market("fed-cut").await.unwrap();

        assert_eq!(first, second);
        assert!(first.is_some());
        assert_eq!(market_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn misses_are_not_cached() {
        let inner = fake();
        let market_calls = inner.market_calls.clone();
        let cached = CachedMarketData::new(Arc::new(inner), 100, Duration::from_secs(60));

        assert!(cached.market("unknown").await.unwrap().is_none());
        assert!(cached.market("unknown").await.unwrap().is_none());
        assert_eq!(market_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn slug_lookup_fills_condition_id() {
        let inner = fake();
        let market_calls = inner.market_calls.clone();
        let cached = CachedMarketData::new(Arc::new(inner), 100, Duration::from_secs(60));

        cached.market("fed-cut").await.unwrap();
        let by_id = cached.market("0xfed").await.unwrap();

        assert_eq!(by_id.map(|m| m.slug), Some("fed-cut".to_string()));
        assert_eq!(market_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn prices_pass_through() {
        let inner = fake();
        let price_calls = inner.price_calls.clone();
        let cached = CachedMarketData::new(Arc::new(inner), 100, Duration::from_secs(60));

        let ids = vec!["y".to_string()];
        cached.prices(&ids).await.unwrap();
        let prices = cached.prices(&ids).await.unwrap();

        assert_eq!(prices.get("y"), Some(&0.4));
        assert_eq!(price_calls.load(Ordering::SeqCst), 2);
    }
}
