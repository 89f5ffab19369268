//! Funnel configuration.
//!
//! Defaults come from environment variables (`GAUNTLET_*`), and a TOML file
//! can overlay any subset of fields — operators typically override the kill
//! gate level and the pricing bar, and leave the rest alone.

use std::path::Path;

use serde::Deserialize;

use crate::error::FunnelError;
use crate::thresholds::{RigorLevel, ThresholdSettings};

/// Text generation endpoint (Anthropic Messages API shape).
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationEndpoint {
    pub url: String,
    pub api_key: String,
    pub model: String,
}

/// Web search endpoint (Serper shape).
#[derive(Debug, Clone, Deserialize)]
pub struct SearchEndpoint {
    pub url: String,
    pub api_key: String,
}

/// Page scraping endpoint (Firecrawl shape). Optional — without it the
/// funnel classifies from search snippets alone.
#[derive(Debug, Clone, Deserialize)]
pub struct ScrapeEndpoint {
    pub url: String,
    pub api_key: String,
}

/// Top-level funnel configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FunnelConfig {
    pub generation: GenerationEndpoint,
    pub search: SearchEndpoint,
    pub scrape: Option<ScrapeEndpoint>,

    /// Per-level pain gate thresholds.
    pub thresholds: ThresholdSettings,
    /// Which profile the pain-research kill gate enforces.
    pub kill_level: RigorLevel,

    /// Dollars/month a competitor must charge to count as "paying".
    pub min_competitor_price: f64,
    /// Market opportunity score (1–10) below which the idea is killed.
    pub min_opportunity_score: f64,
    /// Predicted conversion fraction below which the content stage kills.
    pub min_conversion_rate: f64,
    /// Messaging effectiveness (1–10) below which the content stage kills.
    pub min_messaging_score: f64,
    /// Average willingness-to-pay bar for the survey stage.
    pub min_willingness_to_pay: f64,
    /// Percent of respondents that must meet the willingness-to-pay bar.
    pub min_wtp_percentage: f64,

    /// Search queries for pain research.
    pub pain_query_count: usize,
    /// Search queries for market analysis.
    pub market_query_count: usize,
    /// How many top hits to scrape per stage when a scraper is configured.
    pub scrape_top_n: usize,
    /// Simulated respondents to request from the survey stage.
    pub survey_response_count: usize,

    /// Per-request timeout for collaborator calls.
    pub request_timeout_secs: u64,
    /// Stop the run at the first killed stage instead of continuing through
    /// the remaining stages for information.
    pub stop_on_kill: bool,
}

impl Default for FunnelConfig {
    fn default() -> Self {
        Self {
            generation: GenerationEndpoint {
                url: std::env::var("GAUNTLET_GENERATION_URL")
                    .unwrap_or_else(|_| "https://api.anthropic.com".into()),
                api_key: std::env::var("GAUNTLET_GENERATION_API_KEY").unwrap_or_default(),
                model: std::env::var("GAUNTLET_GENERATION_MODEL")
                    .unwrap_or_else(|_| "claude-sonnet-4-5".into()),
            },
            search: SearchEndpoint {
                url: std::env::var("GAUNTLET_SEARCH_URL")
                    .unwrap_or_else(|_| "https://google.serper.dev".into()),
                api_key: std::env::var("GAUNTLET_SEARCH_API_KEY").unwrap_or_default(),
            },
            scrape: Self::scrape_from_env(),
            thresholds: ThresholdSettings::default(),
            kill_level: RigorLevel::Medium,
            min_competitor_price: 50.0,
            min_opportunity_score: 6.0,
            min_conversion_rate: 0.02,
            min_messaging_score: 6.0,
            min_willingness_to_pay: 50.0,
            min_wtp_percentage: 30.0,
            pain_query_count: 60,
            market_query_count: 40,
            scrape_top_n: 5,
            survey_response_count: 20,
            request_timeout_secs: 30,
            stop_on_kill: false,
        }
    }
}

impl FunnelConfig {
    /// Scraping is opt-in: configured only when a key is present.
    fn scrape_from_env() -> Option<ScrapeEndpoint> {
        let api_key = std::env::var("GAUNTLET_SCRAPE_API_KEY").ok()?;
        let url = std::env::var("GAUNTLET_SCRAPE_URL")
            .unwrap_or_else(|_| "https://api.firecrawl.dev".into());
        Some(ScrapeEndpoint { url, api_key })
    }

    /// Load env defaults, then overlay whatever the TOML file sets.
    pub fn from_toml_file(path: &Path) -> Result<Self, FunnelError> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text)
            .map_err(|err| FunnelError::Config(format!("{}: {err}", path.display())))
    }

    /// Reject configurations that cannot make a single collaborator call.
    pub fn validate(&self) -> Result<(), FunnelError> {
        if self.generation.api_key.is_empty() {
            return Err(FunnelError::Config(
                "generation API key is not set (GAUNTLET_GENERATION_API_KEY)".into(),
            ));
        }
        if self.search.api_key.is_empty() {
            return Err(FunnelError::Config(
                "search API key is not set (GAUNTLET_SEARCH_API_KEY)".into(),
            ));
        }
        if self.min_competitor_price <= 0.0 {
            return Err(FunnelError::Config(
                "min_competitor_price must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Check if an HTTP endpoint is reachable (GET /v1/models).
pub async fn check_endpoint(url: &str) -> bool {
    let models_url = format!("{url}/v1/models");
    match reqwest::Client::new()
        .get(&models_url)
        .timeout(std::time::Duration::from_secs(5))
        .send()
        .await
    {
        Ok(resp) => resp.status().is_success(),
        Err(_) => false,
    }
}
