//! Stage-level gate behavior driven end to end through `Funnel::run_stage`.
//!
//! Each test feeds tailored collaborator payloads through a real stage run
//! and asserts on the exact kill reason (or its absence):
//!
//! - Two paying competitors kill market analysis with the competitor-floor
//!   reason; lexical signals alone only reach the count via half credits.
//! - Pricing extraction feeds competitor records verbatim from snippets.
//! - The configured kill level selects which rigor profile gates pain
//!   research; the other profiles are still evaluated and reported.
//! - Survey kills distinguish a cheap panel from an unwilling one.

use std::sync::Arc;

use async_trait::async_trait;
use gauntlet::prompts;
use gauntlet::{
    ClientSet, Funnel, FunnelConfig, FunnelError, FunnelStage, Generation, GenerationRequest,
    PriceConfidence, RigorLevel, SearchHit, SearchProvider, TextGenerator,
};

// ── Collaborator stubs ────────────────────────────────────────────────────────

/// Canned payload per generation call, keyed by the system prompt; every
/// field starts from a gate-passing default so tests override only what
/// they exercise.
struct CannedGenerator {
    pain_queries: String,
    pain_analysis: String,
    market_queries: String,
    market_assessment: String,
    landing_page: String,
    content_eval: String,
    survey_questions: String,
    survey_panel: String,
}

impl Default for CannedGenerator {
    fn default() -> Self {
        Self {
            pain_queries: r#"["invoice chasing complaints", "unpaid invoice rant"]"#.into(),
            pain_analysis: r#"{
                "pain_score": 8,
                "complaint_breakdown": {"tier_3": 20, "tier_2": 25, "tier_1": 15, "tier_0": 0},
                "quality_rating": "high",
                "urgency_percentage": 55,
                "emotional_intensity_percentage": 45,
                "key_themes": ["late payments"]
            }"#
            .into(),
            market_queries: r#"["invoice chasing software", "invoice reminder tools"]"#.into(),
            market_assessment:
                r#"{"opportunity_score": 8, "market_gaps": ["solo tier"], "reasoning": "room"}"#
                    .into(),
            landing_page: r#"{
                "headline": "Get invoices paid on time",
                "subheadline": "Reminders that do the chasing",
                "benefits": ["Fast setup", "Polite follow-ups", "Clear overview"],
                "call_to_action": "Start free"
            }"#
            .into(),
            content_eval:
                r#"{"predicted_conversion_rate": 0.03, "messaging_score": 8, "strengths": [], "weaknesses": []}"#
                    .into(),
            survey_questions: r#"["How much would you pay monthly for this?"]"#.into(),
            survey_panel: panel_json(&[60.0, 80.0, 55.0, 70.0]),
        }
    }
}

#[async_trait]
impl TextGenerator for CannedGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<Generation, FunnelError> {
        let content = match request.system.as_str() {
            s if s == prompts::PAIN_QUERY_PREAMBLE => &self.pain_queries,
            s if s == prompts::PAIN_ANALYSIS_PREAMBLE => &self.pain_analysis,
            s if s == prompts::MARKET_QUERY_PREAMBLE => &self.market_queries,
            s if s == prompts::MARKET_ASSESSMENT_PREAMBLE => &self.market_assessment,
            s if s == prompts::LANDING_PAGE_PREAMBLE => &self.landing_page,
            s if s == prompts::CONTENT_EVAL_PREAMBLE => &self.content_eval,
            s if s == prompts::SURVEY_QUESTIONS_PREAMBLE => &self.survey_questions,
            s if s == prompts::SURVEY_SIMULATION_PREAMBLE => &self.survey_panel,
            other => panic!("unexpected system prompt: {other}"),
        };
        Ok(Generation {
            content: content.clone(),
            cost: 0.004,
        })
    }
}

fn panel_json(wtps: &[f64]) -> String {
    let items: Vec<String> = wtps
        .iter()
        .map(|wtp| {
            format!(
                r#"{{"persona": "p", "willingness_to_pay": {wtp}, "current_solution": "email", "must_have_feature": "reminders"}}"#
            )
        })
        .collect();
    format!("[{}]", items.join(","))
}

struct CannedSearch {
    hits: Vec<SearchHit>,
}

#[async_trait]
impl SearchProvider for CannedSearch {
    async fn search(&self, _query: &str, limit: usize) -> Result<Vec<SearchHit>, FunnelError> {
        Ok(self.hits.iter().take(limit).cloned().collect())
    }
}

fn hit(title: &str, snippet: &str, link: &str) -> SearchHit {
    SearchHit {
        title: title.into(),
        snippet: snippet.into(),
        link: link.into(),
        source: String::new(),
    }
}

fn well_priced_hits() -> Vec<SearchHit> {
    vec![
        hit(
            "InvoiceBot | Automated invoice chasing",
            "Plans from $60/mo for solo freelancers.",
            "https://invoicebot.io/pricing",
        ),
        hit(
            "ChaseFlow | Payment reminders for agencies",
            "Plans from $80/mo, annual billing available.",
            "https://chaseflow.com/plans",
        ),
        hit(
            "DunningPro | Accounts receivable automation",
            "From $99/mo, enterprise pricing available.",
            "https://dunningpro.com",
        ),
    ]
}

fn small_config() -> FunnelConfig {
    FunnelConfig {
        pain_query_count: 2,
        market_query_count: 2,
        survey_response_count: 4,
        ..FunnelConfig::default()
    }
}

fn funnel(config: FunnelConfig, generator: CannedGenerator, hits: Vec<SearchHit>) -> Funnel {
    let clients = ClientSet {
        generator: Arc::new(generator),
        search: Arc::new(CannedSearch { hits }),
        scraper: None,
    };
    Funnel::new(config, clients)
}

/// Run stages in canonical order up to and including `target`, returning
/// the target's verdict.
async fn run_through(
    funnel: &Funnel,
    session: &mut gauntlet::PipelineSession,
    target: FunnelStage,
) -> gauntlet::StageVerdict {
    let mut last = None;
    for stage in FunnelStage::EXECUTABLE {
        last = Some(funnel.run_stage(session, stage).await.unwrap());
        if stage == target {
            break;
        }
    }
    last.unwrap()
}

// ── Market analysis gates ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_two_paying_competitors_kill_market() {
    let funnel = funnel(
        small_config(),
        CannedGenerator::default(),
        well_priced_hits().into_iter().take(2).collect(),
    );
    let mut session = funnel.start_session("chasing unpaid invoices", "freelancers");

    let verdict = run_through(&funnel, &mut session, FunnelStage::MarketAnalysis).await;

    assert!(verdict.killed);
    assert_eq!(
        verdict.reason.as_deref(),
        Some("Only 2 competitors charging $50+/month found")
    );
    assert_eq!(session.market().unwrap().output.paying_competitors, 2);
}

#[tokio::test]
async fn test_lexical_signals_only_reach_half_credits() {
    // No extractable amounts anywhere; "enterprise" and "per user" are the
    // only evidence of paid products, worth half a credit each.
    let hits = vec![
        hit(
            "NetTerms | Enterprise invoice platform",
            "Built for large finance teams.",
            "https://netterms.io",
        ),
        hit(
            "BillFlow | Billing for agencies",
            "Charge per user with automatic reminders.",
            "https://billflow.dev",
        ),
        hit(
            "PaperTrail | Open source invoice tracker",
            "Self-hosted and free forever.",
            "https://papertrail.sh",
        ),
    ];
    let funnel = funnel(small_config(), CannedGenerator::default(), hits);
    let mut session = funnel.start_session("chasing unpaid invoices", "freelancers");

    let verdict = run_through(&funnel, &mut session, FunnelStage::MarketAnalysis).await;

    assert!(verdict.killed);
    assert_eq!(
        verdict.reason.as_deref(),
        Some("Only 1 competitors charging $50+/month found")
    );

    let output = &session.market().unwrap().output;
    assert_eq!(output.competitors.len(), 3);
    assert!(output.competitors.iter().all(|c| !c.pricing.found));
    assert_eq!(output.average_price, None);
}

#[tokio::test]
async fn test_snippet_pricing_lands_in_competitor_records() {
    let hits = vec![hit(
        "AcmeCollect | Invoice recovery",
        "Plans from $79/mo, enterprise pricing available.",
        "https://acmecollect.com",
    )];
    let funnel = funnel(small_config(), CannedGenerator::default(), hits);
    let mut session = funnel.start_session("chasing unpaid invoices", "freelancers");

    run_through(&funnel, &mut session, FunnelStage::MarketAnalysis).await;

    let competitor = &session.market().unwrap().output.competitors[0];
    assert_eq!(competitor.name, "AcmeCollect");
    assert!(competitor.pricing.found);
    assert_eq!(competitor.pricing.monthly_price, Some(79.0));
    assert_eq!(competitor.pricing.confidence, PriceConfidence::Exact);
    assert_eq!(
        session.market().unwrap().output.average_price,
        Some(79.0)
    );
}

// ── Pain research gates and rigor levels ──────────────────────────────────────

/// Weighted 25 (3·5 + 2·3 + 4), pain 5.5, medium quality: clears the easy
/// profile, misses medium and difficult.
fn moderate_pain_generator() -> CannedGenerator {
    CannedGenerator {
        pain_analysis: r#"{
            "pain_score": 5.5,
            "complaint_breakdown": {"tier_3": 5, "tier_2": 3, "tier_1": 4, "tier_0": 0},
            "quality_rating": "medium",
            "urgency_percentage": 35,
            "emotional_intensity_percentage": 25,
            "key_themes": ["slow payers"]
        }"#
        .into(),
        ..CannedGenerator::default()
    }
}

#[tokio::test]
async fn test_default_medium_gate_kills_moderate_evidence() {
    let funnel = funnel(
        small_config(),
        moderate_pain_generator(),
        well_priced_hits(),
    );
    let mut session = funnel.start_session("chasing unpaid invoices", "freelancers");

    let verdict = funnel
        .run_stage(&mut session, FunnelStage::PainResearch)
        .await
        .unwrap();

    assert!(verdict.killed);
    assert!(verdict.reason.as_deref().unwrap().contains("25/40"));

    // All three rigor levels are evaluated regardless of the gate.
    let evaluations = &session.pain().unwrap().output.evaluations;
    assert_eq!(evaluations.len(), 3);
    assert!(evaluations[&RigorLevel::Easy].passed);
    assert!(!evaluations[&RigorLevel::Medium].passed);
    assert!(!evaluations[&RigorLevel::Difficult].passed);
}

#[tokio::test]
async fn test_toml_kill_level_overlay_relaxes_the_gate() {
    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file.path(), "kill_level = \"easy\"\n").unwrap();
    let config = FunnelConfig {
        pain_query_count: 2,
        ..FunnelConfig::from_toml_file(file.path()).unwrap()
    };
    assert_eq!(config.kill_level, RigorLevel::Easy);

    let funnel = funnel(config, moderate_pain_generator(), well_priced_hits());
    let mut session = funnel.start_session("chasing unpaid invoices", "freelancers");

    let verdict = funnel
        .run_stage(&mut session, FunnelStage::PainResearch)
        .await
        .unwrap();

    // Same evidence, easier gate: the medium profile still fails in the
    // report, but the kill follows the configured level.
    assert!(!verdict.killed);
    let evaluations = &session.pain().unwrap().output.evaluations;
    assert!(!evaluations[&RigorLevel::Medium].passed);
}

// ── Survey gates ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_cheap_panel_kills_survey_on_average() {
    let generator = CannedGenerator {
        survey_panel: panel_json(&[10.0, 20.0, 15.0, 5.0]),
        ..CannedGenerator::default()
    };
    let funnel = funnel(small_config(), generator, well_priced_hits());
    let mut session = funnel.start_session("chasing unpaid invoices", "freelancers");

    let verdict = run_through(&funnel, &mut session, FunnelStage::Survey).await;

    assert!(verdict.killed);
    assert_eq!(
        verdict.reason.as_deref(),
        Some("Average WTP $12.5 is below $50 threshold")
    );
}

#[tokio::test]
async fn test_concentrated_panel_kills_survey_on_percentage() {
    // One big spender drags the average over the bar; the percentage gate
    // still catches that three of four would not pay.
    let generator = CannedGenerator {
        survey_panel: panel_json(&[200.0, 10.0, 10.0, 10.0]),
        ..CannedGenerator::default()
    };
    let funnel = funnel(small_config(), generator, well_priced_hits());
    let mut session = funnel.start_session("chasing unpaid invoices", "freelancers");

    let verdict = run_through(&funnel, &mut session, FunnelStage::Survey).await;

    assert!(verdict.killed);
    assert_eq!(
        verdict.reason.as_deref(),
        Some("Only 25% willing to pay $50+ (need 30%+)")
    );
    let output = &session.survey().unwrap().output;
    assert!((output.average_wtp - 57.5).abs() < 1e-9);
}
