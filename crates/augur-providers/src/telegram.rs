use std::sync::Arc;

use async_trait::async_trait;
use augur_agents::collaborators::short_id;
use augur_agents::{AgentError, Notifier};
use augur_models::config::TelegramConfig;
use augur_models::decision::{Decision, Signal};
use augur_store::SqliteStore;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::http_error;

/// Pushes actionable decisions to the user's linked Telegram chat.
pub struct TelegramNotifier {
    http: reqwest::Client,
    api_base: String,
    bot_token: Option<String>,
    store: Arc<SqliteStore>,
}

impl TelegramNotifier {
    pub fn new(
        http: reqwest::Client,
        config: &TelegramConfig,
        bot_token: Option<String>,
        store: Arc<SqliteStore>,
    ) -> Self {
        Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bot_token: bot_token.filter(|t| !t.trim().is_empty()),
            store,
        }
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, user_id: &str, decision: &Decision) -> Result<bool, AgentError> {
        let Some(token) = self.bot_token.as_deref() else {
            debug!("Telegram bot token not configured, skipping push");
            return Ok(false);
        };
        let Some(chat_id) = self.store.telegram_chat_id(user_id)? else {
            info!(user_id = %short_id(user_id), "No Telegram chat linked, skipping push");
            return Ok(false);
        };

        let text = format_decision_message(decision);
        let response = self
            .http
            .post(format!("{}/bot{token}/sendMessage", self.api_base))
            .json(&SendMessage {
                chat_id: &chat_id,
                text: &text,
                parse_mode: "HTML",
                disable_web_page_preview: true,
            })
            .send()
            .await
            .map_err(|e| http_error("telegram sendMessage", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(user_id = %short_id(user_id), status = status.as_u16(), body = %body, "Telegram send failed");
            return Err(AgentError::Provider(format!(
                "telegram sendMessage {}",
                status.as_u16()
            )));
        }

        info!(user_id = %short_id(user_id), slug = %decision.market_slug, "Decision sent to Telegram");
        Ok(true)
    }
}

fn signal_label(signal: Signal) -> &'static str {
    match signal {
        Signal::BuyYes => "🟢 BUY YES",
        Signal::BuyNo => "🔴 BUY NO",
        Signal::Hold => "🟡 HOLD",
        Signal::Skip => "⏭ SKIP",
    }
}

/// Ten cells, one per full 10%, followed by the rounded percentage.
fn confidence_bar(confidence: Decimal) -> String {
    let filled = (confidence * Decimal::TEN)
        .floor()
        .to_usize()
        .unwrap_or_default()
        .min(10);
    let percent = (confidence * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .normalize();
    format!("{}{} {percent}%", "█".repeat(filled), "░".repeat(10 - filled))
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Telegram HTML body for one decision.
pub fn format_decision_message(decision: &Decision) -> String {
    let question = if decision.market_question.is_empty() {
        "Unknown Market".to_string()
    } else {
        escape_html(&decision.market_question)
    };
    let market = if decision.market_slug.is_empty() {
        question
    } else {
        format!(
            "<a href=\"https://polymarket.com/event/{}\">{question}</a>",
            escape_html(&decision.market_slug)
        )
    };

    let reasoning = if decision.reasoning.is_empty() {
        "No reasoning provided.".to_string()
    } else {
        escape_html(&decision.reasoning)
    };

    let factors = if decision.key_factors.is_empty() {
        "  • N/A".to_string()
    } else {
        decision
            .key_factors
            .iter()
            .map(|f| format!("  • {}", escape_html(f)))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "🧠 <b>AUGUR ADVISOR</b>\n\
         {}\n\
         📊 <b>Market</b>: {market}\n\
         🎯 <b>Signal</b>: {}\n\
         📈 <b>Confidence</b>: <code>{}</code>\n\
         ⚖️ <b>Risk</b>: {}\n\n\
         💡 <b>Reasoning</b>:\n  {reasoning}\n\n\
         🔑 <b>Key Factors</b>:\n{factors}",
        "─".repeat(22),
        signal_label(decision.signal),
        confidence_bar(decision.confidence),
        decision.risk_level.as_str().to_uppercase(),
    )
}
