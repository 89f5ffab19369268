//! Cost accounting for collaborator calls.
//!
//! Every generation, search, and scrape has a price; the ledger attributes
//! each charge to the stage that incurred it so the results view can show
//! where the money went. Rates:
//!
//! ```text
//! generation input    $0.003  per 1K tokens
//! generation output   $0.015  per 1K tokens
//! search query        $0.0003 per query
//! scraped page        $0.01   per page
//! ```
//!
//! Cache hits on generation are recorded as $0 — a replayed response costs
//! nothing, and pretending otherwise would make the ledger overstate spend.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state_machine::FunnelStage;

/// Dollars per 1K input tokens sent to the generation endpoint.
pub const INPUT_TOKEN_COST_PER_1K: f64 = 0.003;

/// Dollars per 1K output tokens returned by the generation endpoint.
pub const OUTPUT_TOKEN_COST_PER_1K: f64 = 0.015;

/// Dollars per search query.
pub const SEARCH_QUERY_COST: f64 = 0.0003;

/// Dollars per scraped page.
pub const SCRAPE_PAGE_COST: f64 = 0.01;

/// Token counts reported by the generation endpoint for one call.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    /// Dollar cost of this call.
    pub fn cost(&self) -> f64 {
        (self.input_tokens as f64 / 1000.0) * INPUT_TOKEN_COST_PER_1K
            + (self.output_tokens as f64 / 1000.0) * OUTPUT_TOKEN_COST_PER_1K
    }
}

/// Accumulates dollar amounts per stage.
#[derive(Debug, Clone, Default)]
pub struct CostLedger {
    per_stage: BTreeMap<FunnelStage, f64>,
    total: f64,
}

impl CostLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a charge against `stage`. Zero-amount records are accepted —
    /// cache hits are booked at $0 so call counts stay auditable elsewhere
    /// without inflating spend.
    pub fn record(&mut self, stage: FunnelStage, amount: f64) {
        if amount < 0.0 {
            tracing::warn!(%stage, amount, "Ignoring negative cost record");
            return;
        }

        tracing::debug!(%stage, amount, "Recording cost");

        *self.per_stage.entry(stage).or_insert(0.0) += amount;
        self.total += amount;
    }

    /// Total charged against one stage so far.
    pub fn stage_total(&self, stage: FunnelStage) -> f64 {
        self.per_stage.get(&stage).copied().unwrap_or(0.0)
    }

    /// Total across all stages.
    pub fn total(&self) -> f64 {
        self.total
    }

    /// Point-in-time copy for reporting.
    pub fn snapshot(&self) -> CostSnapshot {
        CostSnapshot {
            per_stage: self.per_stage.clone(),
            total: self.total,
            captured_at: Utc::now(),
        }
    }

    pub fn reset(&mut self) {
        self.per_stage.clear();
        self.total = 0.0;
    }
}

/// Immutable, serializable copy of the ledger at one moment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostSnapshot {
    pub per_stage: BTreeMap<FunnelStage, f64>,
    pub total: f64,
    pub captured_at: DateTime<Utc>,
}

impl fmt::Display for CostSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (stage, amount) in &self.per_stage {
            writeln!(f, "  {:<20} ${:.4}", stage.to_string(), amount)?;
        }
        write!(f, "  {:<20} ${:.4}", "total", self.total)
    }
}
