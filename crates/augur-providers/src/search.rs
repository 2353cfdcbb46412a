use async_trait::async_trait;
use augur_agents::prompts::truncate_chars;
use augur_agents::{AgentError, NewsProvider};
use augur_models::config::ProvidersConfig;
use augur_models::market::SearchResult;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::http_error;

const TAVILY_SNIPPET_CHARS: usize = 500;
const NEWS_SNIPPET_CHARS: usize = 400;

/// Tavily web search for targeted queries plus CryptoCompare for general news.
pub struct WebNews {
    http: reqwest::Client,
    tavily_base: String,
    tavily_api_key: Option<String>,
    news_base: String,
}

impl WebNews {
    pub fn new(http: reqwest::Client, config: &ProvidersConfig, tavily_api_key: Option<String>) -> Self {
        Self {
            http,
            tavily_base: config.tavily_api_base.trim_end_matches('/').to_string(),
            tavily_api_key: tavily_api_key.filter(|k| !k.trim().is_empty()),
            news_base: config.news_api_base.trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: usize,
    search_depth: &'static str,
    include_answer: bool,
}

#[derive(Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyHit>,
}

#[derive(Deserialize)]
struct TavilyHit {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct NewsResponse {
    #[serde(rename = "Data", default)]
    data: Vec<NewsArticle>,
}

#[derive(Deserialize)]
struct NewsArticle {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    source: String,
}

impl From<TavilyHit> for SearchResult {
    fn from(hit: TavilyHit) -> Self {
        SearchResult {
            title: hit.title,
            url: hit.url,
            snippet: truncate_chars(&hit.content, TAVILY_SNIPPET_CHARS).to_string(),
            source: "tavily".to_string(),
        }
    }
}

impl From<NewsArticle> for SearchResult {
    fn from(article: NewsArticle) -> Self {
        let source = if article.source.is_empty() {
            "cryptocompare".to_string()
        } else {
            article.source
        };
        SearchResult {
            title: article.title,
            url: article.url,
            snippet: truncate_chars(&article.body, NEWS_SNIPPET_CHARS).to_string(),
            source,
        }
    }
}

#[async_trait]
impl NewsProvider for WebNews {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>, AgentError> {
        let Some(api_key) = self.tavily_api_key.as_deref() else {
            warn!("Tavily API key not set, returning no search results");
            return Ok(Vec::new());
        };

        let response: TavilyResponse = self
            .http
            .post(format!("{}/search", self.tavily_base))
            .json(&TavilyRequest {
                api_key,
                query,
                max_results,
                search_depth: "advanced",
                include_answer: true,
            })
            .send()
            .await
            .map_err(|e| http_error("tavily request", e))?
            .error_for_status()
            .map_err(|e| http_error("tavily status", e))?
            .json()
            .await
            .map_err(|e| http_error("tavily body", e))?;

        Ok(response
            .results
            .into_iter()
            .take(max_results)
            .map(SearchResult::from)
            .collect())
    }

    async fn general_news(&self, limit: usize) -> Result<Vec<SearchResult>, AgentError> {
        let response: NewsResponse = self
            .http
            .get(format!("{}/data/v2/news/", self.news_base))
            .query(&[("lang", "EN"), ("sortOrder", "latest")])
            .send()
            .await
            .map_err(|e| http_error("news request", e))?
            .error_for_status()
            .map_err(|e| http_error("news status", e))?
            .json()
            .await
            .map_err(|e| http_error("news body", e))?;

        Ok(response
            .data
            .into_iter()
            .take(limit)
            .map(SearchResult::from)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tavily_hits_are_truncated_and_tagged() {
        let raw = serde_json::json!({
            "answer": "ignored",
            "results": [{"title": "Fed", "url": "https://a", "content": "y".repeat(800)}]
        });
        let response: TavilyResponse = serde_json::from_value(raw).unwrap();
        let result = SearchResult::from(response.results.into_iter().next().unwrap());
        assert_eq!(result.snippet.chars().count(), 500);
        assert_eq!(result.source, "tavily");
    }

    #[test]
    fn news_articles_are_truncated() {
        let raw = serde_json::json!({
            "Data": [
                {"title": "BTC", "url": "https://b", "body": "z".repeat(450), "source": "coindesk"},
                {"title": "ETH", "url": "https://c", "body": "short"}
            ]
        });
        let response: NewsResponse = serde_json::from_value(raw).unwrap();
        let results: Vec<SearchResult> = response.data.into_iter().map(SearchResult::from).collect();
        assert_eq!(results[0].snippet.len(), 400);
        assert_eq!(results[0].source, "coindesk");
        assert_eq!(results[1].source, "cryptocompare");
    }

    #[tokio::test]
    async fn missing_tavily_key_returns_nothing() {
        let news = WebNews::new(reqwest::Client::new(), &ProvidersConfig::default(), Some("  ".into()));
        assert!(news.search("anything", 3).await.unwrap().is_empty());
    }
}
