use serde::{Deserialize, Serialize};

/// A watchlist market resolved to its tradable "Yes" token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketRef {
    pub market_id: String,
    pub question: String,
    pub slug: String,
    /// CLOB token id of the "Yes" outcome. Empty when the market exposed no tokens.
    pub token_id: String,
    #[serde(default)]
    pub volume: f64,
    #[serde(default)]
    pub liquidity: f64,
}

/// One outcome token of a market.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutcomeToken {
    pub outcome: String,
    pub token_id: String,
}

/// Full market detail as returned by the market-data provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketDetail {
    pub condition_id: String,
    pub question: String,
    pub slug: String,
    #[serde(default)]
    pub volume: f64,
    #[serde(default)]
    pub liquidity: f64,
    pub tokens: Vec<OutcomeToken>,
}

impl MarketDetail {
    /// Token id of the explicit "Yes" outcome, falling back to the first token.
    pub fn yes_token_id(&self) -> Option<&str> {
        self.tokens
            .iter()
            .find(|t| t.outcome.eq_ignore_ascii_case("yes"))
            .or_else(|| self.tokens.first())
            .map(|t| t.token_id.as_str())
    }

    pub fn to_market_ref(&self) -> MarketRef {
        MarketRef {
            market_id: self.condition_id.clone(),
            question: self.question.clone(),
            slug: self.slug.clone(),
            token_id: self.yes_token_id().unwrap_or_default().to_string(),
            volume: self.volume,
            liquidity: self.liquidity,
        }
    }
}

/// Live price view of a watchlist market.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketSnapshot {
    pub token_id: String,
    pub question: String,
    pub slug: String,
    pub yes_price: f64,
    pub no_price: f64,
    pub volume: f64,
    pub liquidity: f64,
}

/// A raw trade as reported for a wallet by the market-data provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WalletTrade {
    #[serde(default)]
    pub side: Option<String>,
    #[serde(default)]
    pub size: f64,
    #[serde(default)]
    pub price: f64,
    #[serde(default, rename = "marketSlug", alias = "market_slug")]
    pub market_slug: Option<String>,
}

/// Recent trade from a tracked wallet, normalized for the advisor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WalletActivity {
    pub wallet: String,
    /// Upper-cased side, e.g. `BUY` / `SELL`.
    pub side: String,
    pub shares: f64,
    pub price: f64,
    /// `shares * price`, rounded to cents.
    pub usd_size: f64,
    pub market_slug: String,
}

impl WalletActivity {
    pub fn from_trade(wallet: &str, trade: &WalletTrade) -> Self {
        let side = trade
            .side
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or("unknown")
            .to_uppercase();
        Self {
            wallet: wallet.to_string(),
            side,
            shares: trade.size,
            price: trade.price,
            usd_size: round_to(trade.size * trade.price, 2),
            market_slug: trade.market_slug.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Relevance {
    High,
    #[default]
    Medium,
    Low,
}

impl Relevance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// A raw hit from the search or news provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub source: String,
}

/// A piece of research context handed to the advisor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewsItem {
    pub title: String,
    pub source: String,
    pub url: String,
    pub snippet: String,
    pub relevance: Relevance,
}

impl NewsItem {
    pub fn from_result(result: SearchResult, relevance: Relevance) -> Self {
        Self {
            title: result.title,
            source: result.source,
            url: result.url,
            snippet: result.snippet,
            relevance,
        }
    }
}

/// Round to a fixed number of decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
