//! Tiered evidence model — breakdown counts, weighted scoring, quality ordinals.
//!
//! Evidence items (complaint snippets) are classified by an external
//! collaborator into ordinal severity tiers:
//!
//! | Tier | Meaning                          | Weight |
//! |------|----------------------------------|--------|
//! | 3    | High-impact, specific complaint  | 3      |
//! | 2    | Clear pain, less specific        | 2      |
//! | 1    | Mild or indirect signal          | 1      |
//! | 0    | Not valid evidence               | 0      |
//!
//! The weighted score is `3*tier3 + 2*tier2 + 1*tier1` — derived from the
//! breakdown, never stored independently of it.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Counts of classified evidence items per tier.
///
/// Invariant: when a total is reported alongside a breakdown,
/// `tier3 + tier2 + tier1 + tier0 == total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EvidenceBreakdown {
    #[serde(rename = "tier_3", alias = "tier3", default)]
    pub tier3: u32,
    #[serde(rename = "tier_2", alias = "tier2", default)]
    pub tier2: u32,
    #[serde(rename = "tier_1", alias = "tier1", default)]
    pub tier1: u32,
    #[serde(rename = "tier_0", alias = "tier0", default)]
    pub tier0: u32,
}

impl EvidenceBreakdown {
    pub fn new(tier3: u32, tier2: u32, tier1: u32, tier0: u32) -> Self {
        Self {
            tier3,
            tier2,
            tier1,
            tier0,
        }
    }

    /// Breakdown for `n` unclassified items: everything lands in tier 1.
    ///
    /// Used when the classifier returned no breakdown at all, so the raw
    /// item count becomes the weighted score.
    pub fn all_tier1(n: u32) -> Self {
        Self {
            tier1: n,
            ..Self::default()
        }
    }

    pub fn total(&self) -> u32 {
        self.tier3 + self.tier2 + self.tier1 + self.tier0
    }

    /// `3*tier3 + 2*tier2 + 1*tier1`. Tier 0 contributes nothing.
    pub fn weighted_score(&self) -> u32 {
        3 * self.tier3 + 2 * self.tier2 + self.tier1
    }

    /// Whether the breakdown accounts for a reported total.
    pub fn accounts_for(&self, total: u32) -> bool {
        total == 0 || self.total() == total
    }
}

impl fmt::Display for EvidenceBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t3={} t2={} t1={} t0={} (weighted {})",
            self.tier3,
            self.tier2,
            self.tier1,
            self.tier0,
            self.weighted_score()
        )
    }
}

/// Externally supplied ordinal quality label. Consumed as-is, never
/// recomputed locally.
///
/// Variant order gives the ordinal: `Low < Medium < High`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum QualityRating {
    Low,
    Medium,
    High,
}

impl QualityRating {
    /// Parse a free-text label from a collaborator payload.
    ///
    /// Unknown or missing labels normalize to `Medium` — the documented
    /// default for this field.
    pub fn parse(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "low" => Self::Low,
            "high" => Self::High,
            _ => Self::Medium,
        }
    }

    pub fn at_least(self, required: QualityRating) -> bool {
        self >= required
    }
}

impl Default for QualityRating {
    fn default() -> Self {
        Self::Medium
    }
}

impl fmt::Display for QualityRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Quality metrics reported by the evidence classifier.
///
/// Every field has a documented default (see `Default`) applied by the
/// contract normalization layer when the collaborator omits it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QualityMetrics {
    /// Share of items classified tier 3, in `[0, 1]`.
    pub high_impact_ratio: f64,
    /// Classifier's own confidence in the classification, in `[0, 1]`.
    pub quality_score: f64,
    /// Percent of items expressing urgency, `[0, 100]`.
    pub urgency_pct: f64,
    /// Percent of items with strong emotional language, `[0, 100]`.
    pub emotional_pct: f64,
    pub quality_rating: QualityRating,
}

impl Default for QualityMetrics {
    fn default() -> Self {
        Self {
            high_impact_ratio: 0.0,
            quality_score: 0.5,
            urgency_pct: 30.0,
            emotional_pct: 20.0,
            quality_rating: QualityRating::Medium,
        }
    }
}
