use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Recommended action on a market's "Yes" outcome.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Signal {
    BuyYes,
    BuyNo,
    #[default]
    Hold,
    Skip,
}

impl Signal {
    /// Lenient parse of a model-emitted signal. Unrecognised values yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().replace([' ', '-'], "_").as_str() {
            "BUY_YES" => Some(Self::BuyYes),
            "BUY_NO" => Some(Self::BuyNo),
            "HOLD" => Some(Self::Hold),
            "SKIP" => Some(Self::Skip),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BuyYes => "BUY_YES",
            Self::BuyNo => "BUY_NO",
            Self::Hold => "HOLD",
            Self::Skip => "SKIP",
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl RiskLevel {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" | "med" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// A single advisor recommendation for one market.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Decision {
    pub market_question: String,
    pub market_slug: String,
    pub signal: Signal,
    /// 0.0 to 1.0. Always clamped before a decision is constructed from model output.
    pub confidence: Decimal,
    /// The decision path explanation.
    pub reasoning: String,
    pub key_factors: Vec<String>,
    pub risk_level: RiskLevel,
}

impl Decision {
    /// A decision is actionable when it clears the threshold and is not a SKIP.
    pub fn is_actionable(&self, threshold: Decimal) -> bool {
        self.confidence >= threshold && self.signal != Signal::Skip
    }
}

/// A decision as persisted in the user's feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredDecision {
    pub id: Uuid,
    pub user_id: String,
    #[serde(flatten)]
    pub decision: Decision,
    pub created_at: DateTime<Utc>,
}

/// Result of an on-demand pipeline invocation: raw decisions plus the run log.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnalyzeResponse {
    pub decisions: Vec<Decision>,
    pub messages: Vec<String>,
}
