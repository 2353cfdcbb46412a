//! Integration tests that invoke the real Claude CLI.
//!
//! These tests are `#[ignore]` by default. They require the `claude` CLI on
//! PATH with valid credentials configured.
//!
//! Run explicitly with:
//! ```bash
//! cargo test -p augur-agents --test cli_integration -- --ignored
//! ```

use std::time::Duration;

use augur_agents::claude_cli::{check_cli_available, invoke_claude, ClaudeCliConfig};
use augur_agents::parser::parse_decisions;

#[tokio::test]
#[ignore]
async fn cli_is_available() {
    assert!(check_cli_available().await, "claude CLI not found on PATH");
}

/// Catches CLI output format changes that would otherwise only surface in a live scan.
#[tokio::test]
#[ignore]
async fn cli_output_parses_as_decisions() {
    if !check_cli_available().await {
        eprintln!("Skipping: claude CLI not available");
        return;
    }

    let config = ClaudeCliConfig {
        timeout: Duration::from_secs(45),
        ..ClaudeCliConfig::default()
    };

    let system_prompt = concat!(
        "Respond ONLY with a JSON array containing one object with these fields:\n",
        "market_question (string), market_slug (string), signal (\"HOLD\"),\n",
        "confidence (0.5), reasoning (string), key_factors (array of strings), risk_level (\"low\").\n",
    );

    let raw = invoke_claude(system_prompt, "Will it rain tomorrow?", &config)
        .await
        .expect("Claude CLI invocation failed");

    let decisions = parse_decisions(&raw)
        .unwrap_or_else(|e| panic!("CLI output no longer parses ({e}).\nRaw output:\n---\n{raw}\n---"));
    assert_eq!(decisions.len(), 1);
}

#[tokio::test]
#[ignore]
async fn cli_reports_errors_for_invalid_model() {
    if !check_cli_available().await {
        eprintln!("Skipping: claude CLI not available");
        return;
    }

    let config = ClaudeCliConfig {
        model: "nonexistent-model-12345".to_string(),
        timeout: Duration::from_secs(15),
        ..ClaudeCliConfig::default()
    };

    let result = invoke_claude("You are a test.", "hello", &config).await;
    assert!(result.is_err(), "expected an error for an invalid model");
}
