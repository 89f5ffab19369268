//! Staged product-validation funnel
//!
//! Runs a product idea through four evidence-gathering stages, each ending
//! in a kill-or-continue verdict:
//!
//! ```text
//! input → pain_research → market_analysis → content_generation → survey → results
//! ```
//!
//! - `pain_research`: mine the public web for complaints, tier them by
//!   severity, score pain, and evaluate three rigor profiles.
//! - `market_analysis`: discover competitors, extract monthly pricing from
//!   free text, count who actually charges, score the opportunity.
//! - `content_generation`: draft landing page copy and score its predicted
//!   conversion and messaging effectiveness.
//! - `survey`: simulate a willingness-to-pay panel and aggregate it.
//!
//! A kill verdict is advice for the final GO / NO-GO recommendation; it
//! never blocks navigating to or running a later stage. Every external call
//! is metered into a per-session cost ledger.
//!
//! The deterministic core (threshold evaluation, pricing extraction,
//! competitor counting, kill policy) is pure and fully testable offline;
//! the three collaborator traits (`TextGenerator`, `SearchProvider`,
//! `ContentScraper`) isolate all I/O.

pub mod clients;
pub mod competitors;
pub mod config;
pub mod contracts;
pub mod error;
pub mod evidence;
pub mod ledger;
pub mod pipeline;
pub mod policy;
pub mod pricing;
pub mod progress;
pub mod prompts;
pub mod session;
pub mod stages;
pub mod state_machine;
pub mod thresholds;
pub mod validate;

// Re-export the driver types
pub use pipeline::{Funnel, FunnelSummary, StageVerdict};
pub use session::{PipelineSession, StoredVerdict};
pub use state_machine::{FunnelStage, NavigationRecord, StageMachine};

// Re-export the deterministic core
pub use competitors::{average_price, count_paying, CompetitorRecord, PAYING_COMPETITOR_FLOOR};
pub use evidence::{EvidenceBreakdown, QualityMetrics, QualityRating};
pub use policy::{first_kill, KillRule, Verdict};
pub use pricing::{extract_pricing, PriceConfidence, PricingInfo};
pub use thresholds::{
    evaluate_thresholds, PainMetrics, RigorLevel, ThresholdEvaluation, ThresholdProfile,
    ThresholdSettings,
};

// Re-export the collaborator seam and configuration
pub use clients::{
    ClientSet, ContentScraper, Generation, GenerationRequest, ScrapedPage, SearchHit,
    SearchProvider, TextGenerator,
};
pub use config::FunnelConfig;
pub use error::{FunnelError, Service};
pub use ledger::{CostLedger, CostSnapshot, TokenUsage};
pub use progress::{LogProgress, NullProgress, ProgressSink};
pub use stages::{ContentOutput, MarketOutput, PainResearchOutput, StageResult, SurveyOutput};
