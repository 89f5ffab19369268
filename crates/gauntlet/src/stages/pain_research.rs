//! Pain research — complaint mining, classification, threshold gating.
//!
//! Flow: generate search queries → run them → clean and dedupe the hits →
//! optionally scrape the top results for fuller text → classify the
//! complaint evidence → evaluate all three rigor profiles → apply the
//! configured kill gate.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::clients::{ClientSet, GenerationRequest};
use crate::config::FunnelConfig;
use crate::contracts::PainAnalysis;
use crate::error::FunnelError;
use crate::ledger::CostLedger;
use crate::policy::{first_kill, pain_rules, PainGates, Verdict};
use crate::progress::ProgressSink;
use crate::prompts;
use crate::state_machine::FunnelStage;
use crate::thresholds::{evaluate_thresholds, RigorLevel, ThresholdEvaluation};
use crate::validate::{clean_search_hits, sanitize_text};

use super::{request_query_list, scrape_tolerant, StageResult};

const STAGE: FunnelStage = FunnelStage::PainResearch;

/// Snippets beyond this add token cost without moving the classification.
const MAX_SNIPPETS_FOR_ANALYSIS: usize = 120;

#[derive(Debug, Clone, Serialize)]
pub struct PainResearchOutput {
    pub queries_run: Vec<String>,
    /// Usable complaint snippets after cleaning and deduplication.
    pub complaints_found: u32,
    pub pages_scraped: u32,
    pub analysis: Option<PainAnalysis>,
    /// One evaluation per rigor level, regardless of which level gates.
    pub evaluations: BTreeMap<RigorLevel, ThresholdEvaluation>,
}

impl PainResearchOutput {
    fn empty() -> Self {
        Self {
            queries_run: Vec::new(),
            complaints_found: 0,
            pages_scraped: 0,
            analysis: None,
            evaluations: BTreeMap::new(),
        }
    }
}

/// Run the stage. Never returns an error: collaborator failures become a
/// killed result carrying whatever was gathered before the failure.
pub async fn run(
    config: &FunnelConfig,
    clients: &ClientSet,
    progress: &dyn ProgressSink,
    ledger: &mut CostLedger,
    problem: &str,
    audience: &str,
) -> StageResult<PainResearchOutput> {
    let cost_before = ledger.stage_total(STAGE);
    let mut output = PainResearchOutput::empty();

    let outcome = execute(config, clients, progress, ledger, problem, audience, &mut output).await;

    let cost = ledger.stage_total(STAGE) - cost_before;
    match outcome {
        Ok(verdict) => StageResult::from_verdict(STAGE, output, &verdict, cost),
        Err(err) => StageResult::from_error(STAGE, output, &err, cost),
    }
}

async fn execute(
    config: &FunnelConfig,
    clients: &ClientSet,
    progress: &dyn ProgressSink,
    ledger: &mut CostLedger,
    problem: &str,
    audience: &str,
    output: &mut PainResearchOutput,
) -> Result<Verdict, FunnelError> {
    progress.update(STAGE, 5, "Generating complaint search queries");
    let queries = request_query_list(
        clients.generator.as_ref(),
        ledger,
        STAGE,
        prompts::PAIN_QUERY_PREAMBLE,
        prompts::pain_query_prompt(problem, audience, config.pain_query_count),
        prompts::fallback_pain_queries(problem, audience, config.pain_query_count),
        config.pain_query_count,
    )
    .await;

    let mut hits = Vec::new();
    let total = queries.len().max(1);
    for (index, query) in queries.iter().enumerate() {
        let found = clients.search.search(query, 10).await?;
        ledger.record(STAGE, clients.search.cost_per_query());
        hits.extend(found);
        output.queries_run.push(query.clone());

        if (index + 1) % 10 == 0 || index + 1 == queries.len() {
            let percent = 10 + ((index + 1) * 50 / total) as u8;
            progress.update(
                STAGE,
                percent,
                &format!("Searched {}/{} queries", index + 1, queries.len()),
            );
        }
    }

    let mut hits = clean_search_hits(hits);
    let mut seen = HashSet::new();
    hits.retain(|hit| seen.insert(hit.link.clone()));

    if let Some(scraper) = &clients.scraper {
        progress.update(STAGE, 65, "Scraping top results");
        for hit in hits.iter_mut().take(config.scrape_top_n) {
            if let Some(content) = scrape_tolerant(scraper.as_ref(), ledger, STAGE, &hit.link).await
            {
                hit.snippet = sanitize_text(&content);
                output.pages_scraped += 1;
            }
        }
    }

    output.complaints_found = hits.len() as u32;
    tracing::info!(
        complaints = output.complaints_found,
        queries = output.queries_run.len(),
        scraped = output.pages_scraped,
        "Complaint mining complete"
    );

    progress.update(STAGE, 75, "Classifying complaint evidence");
    let snippets: Vec<String> = hits
        .iter()
        .take(MAX_SNIPPETS_FOR_ANALYSIS)
        .map(|hit| format!("[{}] {}", hit.source, hit.snippet))
        .collect();

    let generation = clients
        .generator
        .generate(
            GenerationRequest::new(
                prompts::pain_analysis_prompt(problem, &snippets),
                prompts::PAIN_ANALYSIS_PREAMBLE,
            )
            .with_temperature(0.3),
        )
        .await?;
    ledger.record(STAGE, generation.cost);

    let analysis = PainAnalysis::from_response(&generation.content, output.complaints_found);
    let evaluations = evaluate_thresholds(&analysis.metrics(), &config.thresholds);
    let gate_evaluation = evaluations[&config.kill_level].clone();

    output.analysis = Some(analysis);
    output.evaluations = evaluations;

    progress.update(STAGE, 100, "Pain research complete");
    Ok(first_kill(&pain_rules(), &PainGates { gate_evaluation }))
}
