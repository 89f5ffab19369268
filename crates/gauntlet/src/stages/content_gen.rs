//! Content generation — landing page copy and its messaging evaluation.
//!
//! Flow: draft landing page copy for the problem and audience (speaking to
//! the complaint themes pain research surfaced and the gaps market analysis
//! found) → have the generator score the copy's predicted conversion and
//! messaging effectiveness → apply the content kill rules.

use serde::Serialize;

use crate::clients::{ClientSet, GenerationRequest};
use crate::config::FunnelConfig;
use crate::contracts::{ContentEvaluation, LandingPage};
use crate::error::FunnelError;
use crate::ledger::CostLedger;
use crate::policy::{content_rules, first_kill, ContentGates, Verdict};
use crate::progress::ProgressSink;
use crate::prompts;
use crate::state_machine::FunnelStage;

use super::StageResult;

const STAGE: FunnelStage = FunnelStage::ContentGeneration;

#[derive(Debug, Clone, Serialize)]
pub struct ContentOutput {
    pub page: Option<LandingPage>,
    pub evaluation: Option<ContentEvaluation>,
}

impl ContentOutput {
    fn empty() -> Self {
        Self {
            page: None,
            evaluation: None,
        }
    }

    /// Headline for downstream stages; empty when the page never landed.
    pub fn headline(&self) -> &str {
        self.page.as_ref().map(|p| p.headline.as_str()).unwrap_or("")
    }
}

#[allow(clippy::too_many_arguments)]
pub async fn run(
    config: &FunnelConfig,
    clients: &ClientSet,
    progress: &dyn ProgressSink,
    ledger: &mut CostLedger,
    problem: &str,
    audience: &str,
    themes: &[String],
    gaps: &[String],
) -> StageResult<ContentOutput> {
    let cost_before = ledger.stage_total(STAGE);
    let mut output = ContentOutput::empty();

    let outcome = execute(
        config, clients, progress, ledger, problem, audience, themes, gaps, &mut output,
    )
    .await;

    let cost = ledger.stage_total(STAGE) - cost_before;
    match outcome {
        Ok(verdict) => StageResult::from_verdict(STAGE, output, &verdict, cost),
        Err(err) => StageResult::from_error(STAGE, output, &err, cost),
    }
}

#[allow(clippy::too_many_arguments)]
async fn execute(
    config: &FunnelConfig,
    clients: &ClientSet,
    progress: &dyn ProgressSink,
    ledger: &mut CostLedger,
    problem: &str,
    audience: &str,
    themes: &[String],
    gaps: &[String],
    output: &mut ContentOutput,
) -> Result<Verdict, FunnelError> {
    progress.update(STAGE, 10, "Drafting landing page copy");
    let generation = clients
        .generator
        .generate(GenerationRequest::new(
            prompts::landing_page_prompt(problem, audience, themes, gaps),
            prompts::LANDING_PAGE_PREAMBLE,
        ))
        .await?;
    ledger.record(STAGE, generation.cost);

    let page = LandingPage::from_response(&generation.content, problem);
    let page_text = format!(
        "Headline: {}\nSubheadline: {}\nBenefits:\n- {}\nCall to action: {}",
        page.headline,
        page.subheadline,
        page.benefits.join("\n- "),
        page.call_to_action
    );
    output.page = Some(page);

    progress.update(STAGE, 60, "Scoring the copy");
    let generation = clients
        .generator
        .generate(
            GenerationRequest::new(
                prompts::content_eval_prompt(&page_text),
                prompts::CONTENT_EVAL_PREAMBLE,
            )
            .with_temperature(0.2),
        )
        .await?;
    ledger.record(STAGE, generation.cost);

    let evaluation = ContentEvaluation::from_response(&generation.content);
    let gates = ContentGates {
        predicted_conversion: evaluation.predicted_conversion_rate,
        min_conversion: config.min_conversion_rate,
        messaging_score: evaluation.messaging_score,
        min_messaging: config.min_messaging_score,
    };
    output.evaluation = Some(evaluation);

    progress.update(STAGE, 100, "Content generation complete");
    Ok(first_kill(&content_rules(), &gates))
}
