//! The four executable funnel stages.
//!
//! | Module            | Stage                | Kills on                                  |
//! |-------------------|----------------------|-------------------------------------------|
//! | `pain_research`   | `pain_research`      | configured rigor gate unmet               |
//! | `market_analysis` | `market_analysis`    | paying competitors / avg price / opportunity |
//! | `content_gen`     | `content_generation` | predicted conversion / messaging score    |
//! | `survey`          | `survey`             | no responses / avg WTP / percent willing  |
//!
//! Every stage entry point is infallible: collaborator failures are caught
//! at the stage boundary and converted into a killed `StageResult` that
//! keeps whatever partial output the stage had produced. A kill verdict is
//! advice for the session's recommendation — it never prevents running
//! later stages.

pub mod content_gen;
pub mod market_analysis;
pub mod pain_research;
pub mod survey;

pub use content_gen::ContentOutput;
pub use market_analysis::MarketOutput;
pub use pain_research::PainResearchOutput;
pub use survey::SurveyOutput;

use serde::Serialize;

use crate::clients::{ContentScraper, GenerationRequest, TextGenerator};
use crate::contracts;
use crate::error::FunnelError;
use crate::ledger::CostLedger;
use crate::policy::Verdict;
use crate::state_machine::FunnelStage;

/// What a stage run produced: its domain output plus the verdict wrapper.
#[derive(Debug, Clone, Serialize)]
pub struct StageResult<T> {
    pub stage: FunnelStage,
    /// Domain output; partial when the stage was cut short by an error.
    pub output: T,
    pub killed: bool,
    pub kill_reason: Option<String>,
    /// Dollars this run charged to the ledger.
    pub cost_incurred: f64,
}

impl<T> StageResult<T> {
    /// Wrap a completed stage's output and verdict.
    pub fn from_verdict(stage: FunnelStage, output: T, verdict: &Verdict, cost: f64) -> Self {
        Self {
            stage,
            output,
            killed: verdict.is_kill(),
            kill_reason: verdict.reason().map(String::from),
            cost_incurred: cost,
        }
    }

    /// Wrap a stage cut short by a collaborator failure. The partial output
    /// is preserved; the kill reason names the stage and the error.
    pub fn from_error(stage: FunnelStage, output: T, err: &FunnelError, cost: f64) -> Self {
        tracing::warn!(%stage, error = %err, "Stage failed; recording as killed");
        Self {
            stage,
            output,
            killed: true,
            kill_reason: Some(format!("Error during {}: {err}", stage.label())),
            cost_incurred: cost,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        self.kill_reason.as_deref()
    }
}

/// Ask the generator for a list of search queries, falling back to the
/// deterministic templates when the call fails or yields nothing usable.
/// A generator that under-delivers is accepted as-is.
pub(crate) async fn request_query_list(
    generator: &dyn TextGenerator,
    ledger: &mut CostLedger,
    stage: FunnelStage,
    preamble: &str,
    prompt: String,
    fallback: Vec<String>,
    count: usize,
) -> Vec<String> {
    let request = GenerationRequest::new(prompt, preamble).with_temperature(0.8);
    match generator.generate(request).await {
        Ok(generation) => {
            ledger.record(stage, generation.cost);
            let mut queries = contracts::parse_string_list(&generation.content);
            if queries.is_empty() {
                tracing::warn!(%stage, "Query generation yielded nothing usable; using templates");
                return fallback;
            }
            queries.truncate(count);
            queries
        }
        Err(err) => {
            tracing::warn!(%stage, error = %err, "Query generation failed; using templates");
            fallback
        }
    }
}

/// Scrape one page, tolerating failure. Scrape errors downgrade to the
/// search snippet we already have, so they are logged and swallowed.
pub(crate) async fn scrape_tolerant(
    scraper: &dyn ContentScraper,
    ledger: &mut CostLedger,
    stage: FunnelStage,
    url: &str,
) -> Option<String> {
    match scraper.scrape(url).await {
        Ok(page) => {
            ledger.record(stage, scraper.cost_per_page());
            Some(page.content)
        }
        Err(err) => {
            tracing::debug!(url, error = %err, "Scrape failed; keeping search snippet");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_verdict_continue() {
        let verdict = Verdict::Continue;
        let result = StageResult::from_verdict(FunnelStage::Survey, 42u32, &verdict, 0.5);
        assert!(!result.killed);
        assert_eq!(result.kill_reason, None);
        assert_eq!(result.output, 42);
        assert_eq!(result.cost_incurred, 0.5);
    }

    #[test]
    fn test_from_verdict_kill_carries_reason() {
        let verdict = Verdict::Kill {
            rule: "low_average_price",
            reason: "Average market pricing $30 is below $50 threshold".into(),
        };
        let result = StageResult::from_verdict(FunnelStage::MarketAnalysis, (), &verdict, 0.0);
        assert!(result.killed);
        assert_eq!(
            result.reason(),
            Some("Average market pricing $30 is below $50 threshold")
        );
    }

    #[test]
    fn test_from_error_formats_stage_label() {
        let err = FunnelError::collaborator(crate::error::Service::Search, "HTTP 500");
        let result = StageResult::from_error(FunnelStage::PainResearch, vec![1, 2], &err, 0.01);
        assert!(result.killed);
        assert_eq!(
            result.reason(),
            Some("Error during pain research: search service error: HTTP 500")
        );
        // Partial output survives.
        assert_eq!(result.output, vec![1, 2]);
    }
}
