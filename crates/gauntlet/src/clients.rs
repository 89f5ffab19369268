//! Collaborator clients — text generation, web search, page scraping.
//!
//! Three traits sit between the stages and the outside world so tests can
//! inject stubs without any network. The production implementations speak:
//!
//! ```text
//! TextGenerator   → Anthropic Messages API   (POST /v1/messages)
//! SearchProvider  → Serper                   (POST /search)
//! ContentScraper  → Firecrawl                (POST /v1/scrape)
//! ```
//!
//! The generator keeps an in-memory response cache keyed by a content hash
//! of (system, prompt, temperature); repeated identical calls replay the
//! cached response at $0.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;

use crate::config::FunnelConfig;
use crate::error::{FunnelError, Service};
use crate::ledger::{TokenUsage, SCRAPE_PAGE_COST, SEARCH_QUERY_COST};

/// One generation call's inputs.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub system: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, system: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system: system.into(),
            temperature: 0.7,
            max_tokens: 4096,
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }
}

/// A generation result with its metered cost.
#[derive(Debug, Clone)]
pub struct Generation {
    pub content: String,
    /// Dollars; 0 for cache replays.
    pub cost: f64,
}

/// One search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
    pub link: String,
    /// Host the hit came from, e.g. `reddit.com`.
    #[serde(default)]
    pub source: String,
}

/// A scraped page.
#[derive(Debug, Clone)]
pub struct ScrapedPage {
    pub url: String,
    pub content: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<Generation, FunnelError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, FunnelError>;

    /// Flat dollar cost per query, metered by the caller.
    fn cost_per_query(&self) -> f64 {
        SEARCH_QUERY_COST
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentScraper: Send + Sync {
    async fn scrape(&self, url: &str) -> Result<ScrapedPage, FunnelError>;

    /// Flat dollar cost per page, metered by the caller.
    fn cost_per_page(&self) -> f64 {
        SCRAPE_PAGE_COST
    }
}

/// The collaborators a funnel run needs, pre-built from config.
#[derive(Clone)]
pub struct ClientSet {
    pub generator: Arc<dyn TextGenerator>,
    pub search: Arc<dyn SearchProvider>,
    /// Optional; without it the funnel works from search snippets alone.
    pub scraper: Option<Arc<dyn ContentScraper>>,
}

impl ClientSet {
    pub fn from_config(config: &FunnelConfig) -> Result<Self, FunnelError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|err| FunnelError::Config(format!("failed to build HTTP client: {err}")))?;

        let generator = Arc::new(AnthropicGenerator::new(
            http.clone(),
            config.generation.url.clone(),
            config.generation.api_key.clone(),
            config.generation.model.clone(),
        ));

        let search = Arc::new(SerperSearch::new(
            http.clone(),
            config.search.url.clone(),
            config.search.api_key.clone(),
        ));

        let scraper = config.scrape.as_ref().map(|endpoint| {
            Arc::new(FirecrawlScraper::new(
                http,
                endpoint.url.clone(),
                endpoint.api_key.clone(),
            )) as Arc<dyn ContentScraper>
        });

        Ok(Self {
            generator,
            search,
            scraper,
        })
    }
}

// ---------------------------------------------------------------------------
// Anthropic Messages client
// ---------------------------------------------------------------------------

pub struct AnthropicGenerator {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    cache: Mutex<HashMap<String, String>>,
}

impl AnthropicGenerator {
    pub fn new(http: reqwest::Client, base_url: String, api_key: String, model: String) -> Self {
        Self {
            http,
            base_url,
            api_key,
            model,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn cache_key(request: &GenerationRequest) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(request.system.as_bytes());
        hasher.update(b"\x00");
        hasher.update(request.prompt.as_bytes());
        hasher.update(b"\x00");
        hasher.update(request.temperature.to_le_bytes().as_slice());
        hasher.finalize().to_hex().to_string()
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<AnthropicContent>,
    #[serde(default)]
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Default, Deserialize)]
struct AnthropicUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

/// Pull the text and token usage out of a Messages API response body.
fn parse_generation_response(body: &str) -> Result<(String, TokenUsage), FunnelError> {
    let response: AnthropicResponse = serde_json::from_str(body).map_err(|err| {
        FunnelError::collaborator(Service::Generation, format!("unparseable response: {err}"))
    })?;

    let text = response
        .content
        .iter()
        .map(|block| block.text.as_str())
        .collect::<Vec<_>>()
        .join("");

    if text.trim().is_empty() {
        return Err(FunnelError::EmptyResponse {
            service: Service::Generation,
        });
    }

    Ok((
        text,
        TokenUsage::new(response.usage.input_tokens, response.usage.output_tokens),
    ))
}

#[async_trait]
impl TextGenerator for AnthropicGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<Generation, FunnelError> {
        let key = Self::cache_key(&request);
        if let Some(cached) = self.cache.lock().await.get(&key) {
            tracing::debug!("Generation cache hit");
            return Ok(Generation {
                content: cached.clone(),
                cost: 0.0,
            });
        }

        let body = json!({
            "model": self.model,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "system": request.system,
            "messages": [{"role": "user", "content": request.prompt}],
        });

        let response = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .await
            .map_err(|err| FunnelError::collaborator(Service::Generation, err.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| FunnelError::collaborator(Service::Generation, err.to_string()))?;

        if !status.is_success() {
            return Err(FunnelError::collaborator(
                Service::Generation,
                format!("HTTP {status}: {}", text.chars().take(200).collect::<String>()),
            ));
        }

        let (content, usage) = parse_generation_response(&text)?;
        let cost = usage.cost();

        tracing::debug!(
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            cost,
            "Generation complete"
        );

        self.cache.lock().await.insert(key, content.clone());
        Ok(Generation { content, cost })
    }
}

// ---------------------------------------------------------------------------
// Serper search client
// ---------------------------------------------------------------------------

pub struct SerperSearch {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl SerperSearch {
    pub fn new(http: reqwest::Client, base_url: String, api_key: String) -> Self {
        Self {
            http,
            base_url,
            api_key,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<SerperHit>,
}

#[derive(Debug, Deserialize)]
struct SerperHit {
    #[serde(default)]
    title: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    link: String,
}

fn parse_search_response(body: &str) -> Result<Vec<SearchHit>, FunnelError> {
    let response: SerperResponse = serde_json::from_str(body).map_err(|err| {
        FunnelError::collaborator(Service::Search, format!("unparseable response: {err}"))
    })?;

    Ok(response
        .organic
        .into_iter()
        .map(|hit| {
            let source = crate::validate::domain_of(&hit.link).unwrap_or_default();
            SearchHit {
                title: hit.title,
                snippet: hit.snippet,
                link: hit.link,
                source,
            }
        })
        .collect())
}

#[async_trait]
impl SearchProvider for SerperSearch {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, FunnelError> {
        let response = self
            .http
            .post(format!("{}/search", self.base_url))
            .header("X-API-KEY", &self.api_key)
            .json(&json!({"q": query, "num": limit}))
            .send()
            .await
            .map_err(|err| FunnelError::collaborator(Service::Search, err.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| FunnelError::collaborator(Service::Search, err.to_string()))?;

        if !status.is_success() {
            return Err(FunnelError::collaborator(
                Service::Search,
                format!("HTTP {status}"),
            ));
        }

        let mut hits = parse_search_response(&text)?;
        hits.truncate(limit);
        tracing::debug!(query, hits = hits.len(), "Search complete");
        Ok(hits)
    }
}

// ---------------------------------------------------------------------------
// Firecrawl scrape client
// ---------------------------------------------------------------------------

pub struct FirecrawlScraper {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl FirecrawlScraper {
    pub fn new(http: reqwest::Client, base_url: String, api_key: String) -> Self {
        Self {
            http,
            base_url,
            api_key,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FirecrawlResponse {
    #[serde(default)]
    data: FirecrawlData,
}

#[derive(Debug, Default, Deserialize)]
struct FirecrawlData {
    #[serde(default)]
    markdown: Option<String>,
}

fn parse_scrape_response(body: &str, url: &str) -> Result<ScrapedPage, FunnelError> {
    let response: FirecrawlResponse = serde_json::from_str(body).map_err(|err| {
        FunnelError::collaborator(Service::Scrape, format!("unparseable response: {err}"))
    })?;

    match response.data.markdown {
        Some(content) if !content.trim().is_empty() => Ok(ScrapedPage {
            url: url.to_string(),
            content,
        }),
        _ => Err(FunnelError::EmptyResponse {
            service: Service::Scrape,
        }),
    }
}

#[async_trait]
impl ContentScraper for FirecrawlScraper {
    async fn scrape(&self, url: &str) -> Result<ScrapedPage, FunnelError> {
        let response = self
            .http
            .post(format!("{}/v1/scrape", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({"url": url, "formats": ["markdown"]}))
            .send()
            .await
            .map_err(|err| FunnelError::collaborator(Service::Scrape, err.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| FunnelError::collaborator(Service::Scrape, err.to_string()))?;

        if !status.is_success() {
            return Err(FunnelError::collaborator(
                Service::Scrape,
                format!("HTTP {status}"),
            ));
        }

        tracing::debug!(url, "Scrape complete");
        parse_scrape_response(&text, url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- Response parsing --

    #[test]
    fn test_parse_generation_response() {
        let body = r#"{
            "content": [{"type": "text", "text": "hello "}, {"type": "text", "text": "world"}],
            "usage": {"input_tokens": 2000, "output_tokens": 500}
        }"#;
        let (text, usage) = parse_generation_response(body).unwrap();
        assert_eq!(text, "hello world");
        assert_eq!(usage.input_tokens, 2000);
        assert!((usage.cost() - 0.0135).abs() < 1e-12);
    }

    #[test]
    fn test_parse_generation_empty_content_is_error() {
        let body = r#"{"content": [], "usage": {"input_tokens": 10, "output_tokens": 0}}"#;
        let err = parse_generation_response(body).unwrap_err();
        assert!(matches!(err, FunnelError::EmptyResponse { .. }));
    }

    #[test]
    fn test_parse_generation_garbage_is_collaborator_error() {
        let err = parse_generation_response("<html>502</html>").unwrap_err();
        assert!(matches!(
            err,
            FunnelError::Collaborator {
                service: Service::Generation,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_search_response_fills_source() {
        let body = r#"{"organic": [
            {"title": "Acme review", "snippet": "too expensive", "link": "https://www.reddit.com/r/saas/1"},
            {"title": "No link hit", "snippet": "whatever", "link": ""}
        ]}"#;
        let hits = parse_search_response(body).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].source, "reddit.com");
        assert_eq!(hits[1].source, "");
    }

    #[test]
    fn test_parse_search_response_missing_organic() {
        let hits = parse_search_response("{}").unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_parse_scrape_response() {
        let body = r##"{"success": true, "data": {"markdown": "# Pricing\n$49/month"}}"##;
        let page = parse_scrape_response(body, "https://acme.com/pricing").unwrap();
        assert_eq!(page.url, "https://acme.com/pricing");
        assert!(page.content.contains("$49/month"));
    }

    #[test]
    fn test_parse_scrape_response_empty_markdown_is_error() {
        let body = r#"{"data": {"markdown": "  "}}"#;
        let err = parse_scrape_response(body, "https://x.com").unwrap_err();
        assert!(matches!(
            err,
            FunnelError::EmptyResponse {
                service: Service::Scrape
            }
        ));
    }

    // -- Cache keying --

    #[test]
    fn test_cache_key_distinguishes_inputs() {
        let a = GenerationRequest::new("prompt", "system");
        let b = GenerationRequest::new("prompt2", "system");
        let c = GenerationRequest::new("prompt", "system").with_temperature(0.2);
        assert_ne!(
            AnthropicGenerator::cache_key(&a),
            AnthropicGenerator::cache_key(&b)
        );
        assert_ne!(
            AnthropicGenerator::cache_key(&a),
            AnthropicGenerator::cache_key(&c)
        );
        assert_eq!(
            AnthropicGenerator::cache_key(&a),
            AnthropicGenerator::cache_key(&a.clone())
        );
    }

    #[test]
    fn test_cache_key_separator_prevents_boundary_collisions() {
        // "ab" + "c" must not hash like "a" + "bc".
        let a = GenerationRequest::new("c", "ab");
        let b = GenerationRequest::new("bc", "a");
        assert_ne!(
            AnthropicGenerator::cache_key(&a),
            AnthropicGenerator::cache_key(&b)
        );
    }

    // -- Mock wiring --

    #[tokio::test]
    async fn test_mock_generator_returns_canned_response() {
        let mut generator = MockTextGenerator::new();
        generator.expect_generate().returning(|_| {
            Ok(Generation {
                content: "canned".into(),
                cost: 0.01,
            })
        });

        let result = generator
            .generate(GenerationRequest::new("p", "s"))
            .await
            .unwrap();
        assert_eq!(result.content, "canned");
    }

    #[tokio::test]
    async fn test_mock_search_default_cost() {
        let mut search = MockSearchProvider::new();
        search.expect_search().returning(|_, _| Ok(Vec::new()));
        search
            .expect_cost_per_query()
            .returning(|| SEARCH_QUERY_COST);

        assert!(search.search("q", 10).await.unwrap().is_empty());
        assert_eq!(search.cost_per_query(), SEARCH_QUERY_COST);
    }
}
