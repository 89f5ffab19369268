//! Market analysis — competitor discovery, pricing extraction, opportunity
//! scoring.
//!
//! Flow: generate competitor-discovery queries → run them → shape the hits
//! into deduplicated competitor records → optionally scrape top pricing
//! pages for fuller text → count paying competitors → generator scores the
//! opportunity → apply the market kill rules in order (paying competitors,
//! average price, opportunity score).

use serde::Serialize;

use crate::clients::{ClientSet, GenerationRequest};
use crate::competitors::{average_price, count_paying, CompetitorRecord};
use crate::config::FunnelConfig;
use crate::contracts::MarketAssessment;
use crate::error::FunnelError;
use crate::ledger::CostLedger;
use crate::policy::{first_kill, market_rules, MarketGates, Verdict};
use crate::pricing::extract_pricing;
use crate::progress::ProgressSink;
use crate::prompts;
use crate::state_machine::FunnelStage;
use crate::validate::{clean_search_hits, competitor_name, mentions_pricing, sanitize_text};

use super::{request_query_list, scrape_tolerant, StageResult};

const STAGE: FunnelStage = FunnelStage::MarketAnalysis;

#[derive(Debug, Clone, Serialize)]
pub struct MarketOutput {
    pub queries_run: Vec<String>,
    pub competitors: Vec<CompetitorRecord>,
    /// Competitors charging at least the configured minimum, after
    /// half-credits and flooring.
    pub paying_competitors: u32,
    /// Mean of the extracted monthly prices; `None` when none extracted.
    pub average_price: Option<f64>,
    pub assessment: Option<MarketAssessment>,
}

impl MarketOutput {
    fn empty() -> Self {
        Self {
            queries_run: Vec::new(),
            competitors: Vec::new(),
            paying_competitors: 0,
            average_price: None,
            assessment: None,
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
) -> StageResult<MarketOutput> {
    let cost_before = ledger.stage_total(STAGE);
    let mut output = MarketOutput::empty();

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
    output: &mut MarketOutput,
) -> Result<Verdict, FunnelError> {
    progress.update(STAGE, 5, "Generating competitor discovery queries");
    let queries = request_query_list(
        clients.generator.as_ref(),
        ledger,
        STAGE,
        prompts::MARKET_QUERY_PREAMBLE,
        prompts::market_query_prompt(problem, audience, config.market_query_count),
        prompts::fallback_market_queries(problem, audience, config.market_query_count),
        config.market_query_count,
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
            let percent = 10 + ((index + 1) * 40 / total) as u8;
            progress.update(
                STAGE,
                percent,
                &format!("Searched {}/{} queries", index + 1, queries.len()),
            );
        }
    }

    let hits = clean_search_hits(hits);

    // One record per competitor name, first sighting wins.
    let mut seen_names = std::collections::HashSet::new();
    for hit in &hits {
        let name = competitor_name(&hit.title, &hit.link);
        if !seen_names.insert(name.to_lowercase()) {
            continue;
        }
        let raw_text = format!("{}. {}", hit.title, hit.snippet);
        let pricing_mentioned = mentions_pricing(&raw_text);
        let pricing = extract_pricing(&raw_text, pricing_mentioned);
        output.competitors.push(CompetitorRecord {
            name,
            raw_text,
            link: hit.link.clone(),
            pricing_mentioned,
            pricing,
        });
    }

    if let Some(scraper) = &clients.scraper {
        progress.update(STAGE, 60, "Scraping competitor pages");
        for competitor in output.competitors.iter_mut().take(config.scrape_top_n) {
            if let Some(content) =
                scrape_tolerant(scraper.as_ref(), ledger, STAGE, &competitor.link).await
            {
                // Scraped pricing pages usually carry the numbers the
                // snippet lacked; re-run extraction on the richer text.
                competitor.raw_text =
                    format!("{} {}", sanitize_text(&content), competitor.raw_text);
                competitor.pricing_mentioned = mentions_pricing(&competitor.raw_text);
                competitor.pricing =
                    extract_pricing(&competitor.raw_text, competitor.pricing_mentioned);
            }
        }
    }

    output.paying_competitors = count_paying(&output.competitors, config.min_competitor_price);
    output.average_price = average_price(&output.competitors);

    tracing::info!(
        competitors = output.competitors.len(),
        paying = output.paying_competitors,
        average_price = ?output.average_price,
        "Competitor discovery complete"
    );

    progress.update(STAGE, 80, "Scoring market opportunity");
    let competitor_lines: Vec<String> = output
        .competitors
        .iter()
        .take(40)
        .map(|competitor| match competitor.monthly_price() {
            Some(price) => format!(
                "{}: ${price}/month ({})",
                competitor.name,
                competitor
                    .pricing
                    .pricing_model
                    .as_deref()
                    .unwrap_or("Subscription")
            ),
            None => format!("{}: pricing unknown", competitor.name),
        })
        .collect();

    let generation = clients
        .generator
        .generate(
            GenerationRequest::new(
                prompts::market_assessment_prompt(problem, &competitor_lines),
                prompts::MARKET_ASSESSMENT_PREAMBLE,
            )
            .with_temperature(0.4),
        )
        .await?;
    ledger.record(STAGE, generation.cost);

    let assessment = MarketAssessment::from_response(&generation.content);
    let gates = MarketGates {
        paying_competitors: output.paying_competitors,
        min_price: config.min_competitor_price,
        average_price: output.average_price,
        opportunity_score: assessment.opportunity_score,
        min_opportunity: config.min_opportunity_score,
    };
    output.assessment = Some(assessment);

    progress.update(STAGE, 100, "Market analysis complete");
    Ok(first_kill(&market_rules(), &gates))
}
