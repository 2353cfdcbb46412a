use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Per-user risk appetite. Controls advisor tone and the feed's confidence threshold.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum RiskProfile {
    Conservative,
    #[default]
    Moderate,
    Degen,
    /// Any stored value this build does not recognise.
    #[serde(other)]
    Unknown,
}

impl RiskProfile {
    /// Minimum decision confidence for the proactive feed.
    /// Unknown profiles use the moderate threshold.
    pub fn confidence_threshold(&self) -> Decimal {
        match self {
            Self::Conservative => Decimal::new(80, 2),
            Self::Moderate | Self::Unknown => Decimal::new(65, 2),
            Self::Degen => Decimal::new(50, 2),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Conservative => "conservative",
            Self::Moderate => "moderate",
            Self::Degen => "degen",
            Self::Unknown => "unknown",
        }
    }
}

impl FromStr for RiskProfile {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "conservative" => Self::Conservative,
            "moderate" => Self::Moderate,
            "degen" => Self::Degen,
            _ => Self::Unknown,
        })
    }
}

impl std::fmt::Display for RiskProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Context sources a user can enable for their agent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Watchlists,
    Squads,
    News,
    #[serde(other)]
    Other,
}

/// A user's agent configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserConfig {
    #[serde(default)]
    pub risk_profile: RiskProfile,
    #[serde(default = "default_sources")]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub focus_sectors: Vec<String>,
    /// Stored with the config but not interpreted by the pipeline.
    #[serde(default = "default_alert_frequency")]
    pub alert_frequency: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            risk_profile: RiskProfile::default(),
            sources: default_sources(),
            focus_sectors: Vec::new(),
            alert_frequency: default_alert_frequency(),
            is_active: true,
        }
    }
}

impl UserConfig {
    pub fn has_source(&self, source: Source) -> bool {
        self.sources.contains(&source)
    }
}

/// One row of the scheduler's active-user query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActiveUser {
    pub user_id: String,
    pub risk_profile: RiskProfile,
    pub focus_sectors: Vec<String>,
    pub sources: Vec<Source>,
}

fn default_sources() -> Vec<Source> {
    vec![Source::Watchlists, Source::News]
}

fn default_alert_frequency() -> String {
    "medium".to_string()
}

fn default_true() -> bool {
    true
}
