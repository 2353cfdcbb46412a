use std::collections::HashMap;

use async_trait::async_trait;
use augur_agents::{AgentError, MarketDataProvider};
use augur_models::config::ProvidersConfig;
use augur_models::market::{MarketDetail, OutcomeToken, WalletTrade};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, warn};

use crate::http_error;

/// Polymarket Gamma (market metadata), CLOB (prices) and Data (trades) APIs.
pub struct PolymarketClient {
    http: reqwest::Client,
    gamma_base: String,
    clob_base: String,
    data_base: String,
}

impl PolymarketClient {
    pub fn new(http: reqwest::Client, config: &ProvidersConfig) -> Self {
        Self {
            http,
            gamma_base: config.gamma_api_base.trim_end_matches('/').to_string(),
            clob_base: config.clob_api_base.trim_end_matches('/').to_string(),
            data_base: config.data_api_base.trim_end_matches('/').to_string(),
        }
    }

    async fn price(&self, token_id: &str) -> Result<Option<f64>, AgentError> {
        let response = self
            .http
            .get(format!("{}/price", self.clob_base))
            .query(&[("token_id", token_id), ("side", "buy")])
            .send()
            .await
            .map_err(|e| http_error("clob price request", e))?;

        if !response.status().is_success() {
            debug!(token_id = %token_id, status = %response.status(), "No price for token");
            return Ok(None);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| http_error("clob price body", e))?;
        Ok(body.get("price").and_then(value_as_f64))
    }
}

#[async_trait]
impl MarketDataProvider for PolymarketClient {
    async fn market(&self, id_or_slug: &str) -> Result<Option<MarketDetail>, AgentError> {
        let key = if id_or_slug.starts_with("0x") { "id" } else { "slug" };
        let markets: Vec<GammaMarket> = self
            .http
            .get(format!("{}/markets", self.gamma_base))
            .query(&[(key, id_or_slug)])
            .send()
            .await
            .map_err(|e| http_error("gamma markets request", e))?
            .error_for_status()
            .map_err(|e| http_error("gamma markets status", e))?
            .json()
            .await
            .map_err(|e| http_error("gamma markets body", e))?;

        Ok(markets.into_iter().next().map(GammaMarket::into_detail))
    }

    async fn prices(&self, token_ids: &[String]) -> Result<HashMap<String, f64>, AgentError> {
        let mut prices = HashMap::with_capacity(token_ids.len());
        for token_id in token_ids {
            match self.price(token_id).await {
                Ok(Some(price)) => {
                    prices.insert(token_id.clone(), price);
                }
                Ok(None) => {}
                Err(e) => warn!(token_id = %token_id, error = %e, "Price lookup failed, skipping"),
            }
        }
        Ok(prices)
    }

    async fn wallet_trades(&self, wallet: &str, limit: usize) -> Result<Vec<WalletTrade>, AgentError> {
        self.http
            .get(format!("{}/v1/trades", self.data_base))
            .query(&[("user", wallet.to_string()), ("limit", limit.to_string())])
            .send()
            .await
            .map_err(|e| http_error("data api trades request", e))?
            .error_for_status()
            .map_err(|e| http_error("data api trades status", e))?
            .json()
            .await
            .map_err(|e| http_error("data api trades body", e))
    }
}

/// Subset of a Gamma `/markets` row.
#[derive(Debug, Deserialize)]
struct GammaMarket {
    #[serde(rename = "conditionId", alias = "condition_id", default)]
    condition_id: String,
    #[serde(default)]
    question: String,
    #[serde(default)]
    slug: String,
    #[serde(default, deserialize_with = "de_string_f64")]
    volume: f64,
    #[serde(default, deserialize_with = "de_string_f64")]
    liquidity: f64,
    #[serde(default)]
    tokens: Vec<GammaToken>,
    #[serde(default, deserialize_with = "de_string_vec")]
    outcomes: Vec<String>,
    #[serde(rename = "clobTokenIds", default, deserialize_with = "de_string_vec")]
    clob_token_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GammaToken {
    #[serde(default)]
    outcome: String,
    #[serde(default)]
    token_id: String,
}

impl GammaMarket {
    fn into_detail(self) -> MarketDetail {
        let tokens = if self.tokens.is_empty() {
            self.outcomes
                .into_iter()
                .zip(self.clob_token_ids)
                .map(|(outcome, token_id)| OutcomeToken { outcome, token_id })
                .collect()
        } else {
            self.tokens
                .into_iter()
                .map(|t| OutcomeToken {
                    outcome: t.outcome,
                    token_id: t.token_id,
                })
                .collect()
        };

        MarketDetail {
            condition_id: self.condition_id,
            question: self.question,
            slug: self.slug,
            volume: self.volume,
            liquidity: self.liquidity,
            tokens,
        }
    }
}

fn value_as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn de_string_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;
    match v {
        Value::Array(arr) => Ok(arr
            .into_iter()
            .filter_map(|x| match x {
                Value::String(s) => Some(s),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect()),
        // Gamma often returns arrays as JSON-encoded strings, e.g. "[\"Yes\",\"No\"]".
        Value::String(s) if s.trim().is_empty() => Ok(Vec::new()),
        Value::String(s) => serde_json::from_str::<Vec<String>>(&s).map_err(serde::de::Error::custom),
        _ => Ok(Vec::new()),
    }
}

fn de_string_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;
    Ok(value_as_f64(&v).unwrap_or_default())
}
