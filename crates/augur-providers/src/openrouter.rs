use std::time::Duration;

use async_trait::async_trait;
use augur_agents::{AgentError, CompletionClient};
use augur_models::config::LlmConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Client for any OpenAI-compatible `/chat/completions` endpoint. OpenRouter by default.
pub struct OpenAiCompatibleClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f64,
    timeout: Duration,
}

impl OpenAiCompatibleClient {
    pub fn new(http: reqwest::Client, config: &LlmConfig, api_key: String) -> Self {
        Self {
            http,
            endpoint: format!("{}/chat/completions", config.api_base.trim_end_matches('/')),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f64,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Option<ChatChoiceMessage>,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl CompletionClient for OpenAiCompatibleClient {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, AgentError> {
        debug!(model = %self.model, "Requesting chat completion");

        let request = ChatCompletionRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: self.temperature,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .timeout(self.timeout)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AgentError::Timeout(self.timeout.as_secs())
                } else {
                    AgentError::Provider(format!("completion request: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AgentError::Provider(format!("completion body: {e}")))?;

        if !status.is_success() {
            let snippet: String = body.chars().take(800).collect();
            warn!(status = status.as_u16(), "Completion request rejected");
            return Err(AgentError::Provider(format!(
                "completion {}: {snippet}",
                status.as_u16()
            )));
        }

        extract_content(&body)
    }
}

fn extract_content(body: &str) -> Result<String, AgentError> {
    let parsed: ChatCompletionResponse = serde_json::from_str(body)?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| AgentError::Provider("completion returned no content".to_string()))
}
