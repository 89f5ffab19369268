//! Survey — simulated willingness-to-pay panel and deterministic
//! aggregation.
//!
//! Flow: generate survey questions (built-in defaults when generation
//! fails) → simulate a respondent panel → aggregate average willingness to
//! pay, percent at-or-above the bar, and the most-requested features →
//! apply the survey kill rules.
//!
//! Aggregation is pure arithmetic over the parsed responses; only the panel
//! itself comes from the generator.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::clients::{ClientSet, GenerationRequest};
use crate::config::FunnelConfig;
use crate::contracts::{
    parse_string_list, parse_survey_responses, SurveyResponse, DEFAULT_SURVEY_QUESTIONS,
};
use crate::error::FunnelError;
use crate::ledger::CostLedger;
use crate::policy::{first_kill, survey_rules, SurveyGates, Verdict};
use crate::progress::ProgressSink;
use crate::prompts;
use crate::state_machine::FunnelStage;

use super::StageResult;

const STAGE: FunnelStage = FunnelStage::Survey;

/// How many top-requested features to surface in the output.
const TOP_FEATURE_COUNT: usize = 3;

#[derive(Debug, Clone, Serialize)]
pub struct SurveyOutput {
    pub questions: Vec<String>,
    pub responses: Vec<SurveyResponse>,
    /// Mean willingness to pay in dollars/month; 0 with no responses.
    pub average_wtp: f64,
    /// Percent of respondents at or above the configured bar.
    pub pct_willing: f64,
    /// Most-requested must-have features, most frequent first.
    pub top_features: Vec<String>,
}

impl SurveyOutput {
    fn empty() -> Self {
        Self {
            questions: Vec::new(),
            responses: Vec::new(),
            average_wtp: 0.0,
            pct_willing: 0.0,
            top_features: Vec::new(),
        }
    }
}

pub async fn run(
    config: &FunnelConfig,
    clients: &ClientSet,
    progress: &dyn ProgressSink,
    ledger: &mut CostLedger,
    problem: &str,
    audience: &str,
    headline: &str,
) -> StageResult<SurveyOutput> {
    let cost_before = ledger.stage_total(STAGE);
    let mut output = SurveyOutput::empty();

    let outcome = execute(
        config, clients, progress, ledger, problem, audience, headline, &mut output,
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
    headline: &str,
    output: &mut SurveyOutput,
) -> Result<Verdict, FunnelError> {
    progress.update(STAGE, 10, "Writing survey questions");
    output.questions = request_questions(config, clients, ledger, problem, audience).await;

    progress.update(STAGE, 40, "Simulating respondent panel");
    let generation = clients
        .generator
        .generate(
            GenerationRequest::new(
                prompts::survey_simulation_prompt(
                    problem,
                    audience,
                    headline,
                    &output.questions,
                    config.survey_response_count,
                ),
                prompts::SURVEY_SIMULATION_PREAMBLE,
            )
            .with_temperature(0.9),
        )
        .await?;
    ledger.record(STAGE, generation.cost);

    output.responses = parse_survey_responses(&generation.content);
    output.average_wtp = average_wtp(&output.responses);
    output.pct_willing = percent_willing(&output.responses, config.min_willingness_to_pay);
    output.top_features = top_features(&output.responses, TOP_FEATURE_COUNT);

    tracing::info!(
        responses = output.responses.len(),
        average_wtp = output.average_wtp,
        pct_willing = output.pct_willing,
        "Survey aggregation complete"
    );

    let gates = SurveyGates {
        response_count: output.responses.len(),
        average_wtp: output.average_wtp,
        min_wtp: config.min_willingness_to_pay,
        pct_willing: output.pct_willing,
        min_pct_willing: config.min_wtp_percentage,
    };

    progress.update(STAGE, 100, "Survey complete");
    Ok(first_kill(&survey_rules(), &gates))
}

/// Question generation is best-effort: any failure falls back to the
/// built-in question list.
async fn request_questions(
    config: &FunnelConfig,
    clients: &ClientSet,
    ledger: &mut CostLedger,
    problem: &str,
    audience: &str,
) -> Vec<String> {
    let request = GenerationRequest::new(
        prompts::survey_questions_prompt(problem, audience),
        prompts::SURVEY_QUESTIONS_PREAMBLE,
    )
    .with_temperature(0.6);

    match clients.generator.generate(request).await {
        Ok(generation) => {
            ledger.record(STAGE, generation.cost);
            let questions = parse_string_list(&generation.content);
            if questions.is_empty() {
                tracing::warn!("Question generation yielded nothing usable; using defaults");
                default_questions()
            } else {
                questions
            }
        }
        Err(err) => {
            tracing::warn!(error = %err, "Question generation failed; using defaults");
            default_questions()
        }
    }
    .into_iter()
    .take(8)
    .collect()
}

fn default_questions() -> Vec<String> {
    DEFAULT_SURVEY_QUESTIONS
        .iter()
        .map(|q| q.to_string())
        .collect()
}

fn average_wtp(responses: &[SurveyResponse]) -> f64 {
    if responses.is_empty() {
        return 0.0;
    }
    let sum: f64 = responses.iter().map(|r| r.willingness_to_pay).sum();
    sum / responses.len() as f64
}

fn percent_willing(responses: &[SurveyResponse], bar: f64) -> f64 {
    if responses.is_empty() {
        return 0.0;
    }
    let willing = responses
        .iter()
        .filter(|r| r.willingness_to_pay >= bar)
        .count();
    willing as f64 / responses.len() as f64 * 100.0
}

/// Most-requested features, by count descending then name ascending so the
/// output is stable across runs.
fn top_features(responses: &[SurveyResponse], limit: usize) -> Vec<String> {
    let mut counts: BTreeMap<String, u32> = BTreeMap::new();
    for response in responses {
        if let Some(feature) = &response.must_have_feature {
            let key = feature.trim().to_lowercase();
            if !key.is_empty() {
                *counts.entry(key).or_insert(0) += 1;
            }
        }
    }

    let mut ranked: Vec<(String, u32)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().take(limit).map(|(name, _)| name).collect()
}
