use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::collaborators::CompletionClient;
use crate::error::AgentError;

const STDERR_SNIPPET_CHARS: usize = 500;

#[derive(Debug, Clone)]
pub struct ClaudeCliConfig {
    /// Executable to run. `claude` resolved from PATH by default.
    pub binary: String,
    pub model: String,
    pub timeout: Duration,
}

impl Default for ClaudeCliConfig {
    fn default() -> Self {
        Self {
            binary: "claude".to_string(),
            model: "claude-3-5-haiku-latest".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

fn print_args<'a>(system_prompt: &'a str, user_prompt: &'a str, model: &'a str) -> [&'a str; 8] {
    [
        "-p",
        user_prompt,
        "--system-prompt",
        system_prompt,
        "--model",
        model,
        "--output-format",
        "text",
    ]
}

/// Run one non-interactive completion and return stdout untouched.
///
/// The child is killed if the timeout elapses first.
pub async fn invoke_claude(
    system_prompt: &str,
    user_prompt: &str,
    config: &ClaudeCliConfig,
) -> Result<String, AgentError> {
    debug!(binary = %config.binary, model = %config.model, "Invoking claude CLI");

    let child = Command::new(&config.binary)
        .args(print_args(system_prompt, user_prompt, &config.model))
        .kill_on_drop(true)
        .output();

    let output = tokio::time::timeout(config.timeout, child)
        .await
        .map_err(|_| AgentError::Timeout(config.timeout.as_secs()))?
        .map_err(|e| AgentError::Cli(format!("failed to spawn {}: {e}", config.binary)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let snippet: String = stderr.trim().chars().take(STDERR_SNIPPET_CHARS).collect();
        warn!(status = %output.status, stderr = %snippet, "Claude CLI failed");
        return Err(AgentError::Cli(format!("{} exited {}: {snippet}", config.binary, output.status)));
    }

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if stdout.trim().is_empty() {
        return Err(AgentError::Cli(format!("{} produced no output", config.binary)));
    }
    Ok(stdout)
}

/// Whether `claude --version` runs successfully.
pub async fn check_cli_available() -> bool {
    Command::new(ClaudeCliConfig::default().binary)
        .arg("--version")
        .output()
        .await
        .is_ok_and(|out| out.status.success())
}

/// Completion backend that shells out to the locally installed `claude` CLI.
pub struct ClaudeCliClient {
    config: ClaudeCliConfig,
}

impl ClaudeCliClient {
    pub fn new(model: String, timeout: Duration) -> Self {
        Self::with_config(ClaudeCliConfig {
            model,
            timeout,
            ..ClaudeCliConfig::default()
        })
    }

    pub fn with_config(config: ClaudeCliConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl CompletionClient for ClaudeCliClient {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, AgentError> {
        invoke_claude(system_prompt, user_prompt, &self.config).await
    }
}
