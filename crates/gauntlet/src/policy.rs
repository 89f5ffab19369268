//! Kill-decision policy — ordered rule tables, one first-match engine.
//!
//! Every stage's kill logic is an ordered list of independent checks; the
//! first check that fires produces the verdict and the only reason the
//! user sees, even when several gates are failing at once. Keeping the
//! tables as data makes the ordering auditable and each rule testable in
//! isolation.
//!
//! Stage rule tables, in evaluation order:
//!
//! ```text
//! pain_research      kill-gate threshold level failed
//! market_analysis    paying competitors < floor
//!                    average price below minimum
//!                    opportunity score too low
//! content_generation predicted conversion below minimum
//!                    messaging score too low
//! survey             no responses
//!                    average willingness-to-pay below minimum
//!                    too few respondents at the price point
//! ```

use std::fmt;

use crate::competitors::PAYING_COMPETITOR_FLOOR;
use crate::thresholds::ThresholdEvaluation;

/// A single named kill check. Returns `Some(reason)` to kill.
pub struct KillRule<C> {
    pub name: &'static str,
    pub check: fn(&C) -> Option<String>,
}

/// Outcome of running a rule table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Continue,
    Kill {
        /// Name of the rule that fired.
        rule: &'static str,
        reason: String,
    },
}

impl Verdict {
    pub fn is_kill(&self) -> bool {
        matches!(self, Self::Kill { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Continue => None,
            Self::Kill { reason, .. } => Some(reason),
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continue => write!(f, "CONTINUE"),
            Self::Kill { reason, .. } => write!(f, "KILL: {reason}"),
        }
    }
}

/// Run an ordered rule table; the first rule that fires wins.
pub fn first_kill<C>(rules: &[KillRule<C>], ctx: &C) -> Verdict {
    for rule in rules {
        if let Some(reason) = (rule.check)(ctx) {
            tracing::debug!(rule = rule.name, %reason, "Kill rule fired");
            return Verdict::Kill {
                rule: rule.name,
                reason,
            };
        }
    }
    Verdict::Continue
}

// ---------------------------------------------------------------------------
// Pain research
// ---------------------------------------------------------------------------

/// Gate inputs for the pain-research stage: the evaluation of whichever
/// rigor level is configured as the kill gate.
pub struct PainGates {
    pub gate_evaluation: ThresholdEvaluation,
}

pub fn pain_rules() -> Vec<KillRule<PainGates>> {
    vec![KillRule {
        name: "kill_gate_threshold",
        check: |ctx| {
            if ctx.gate_evaluation.passed {
                None
            } else {
                Some(ctx.gate_evaluation.reason())
            }
        },
    }]
}

// ---------------------------------------------------------------------------
// Market analysis
// ---------------------------------------------------------------------------

/// Gate inputs for the market-analysis stage.
pub struct MarketGates {
    pub paying_competitors: u32,
    pub min_price: f64,
    /// Mean extracted price; `None` when nothing was extracted.
    pub average_price: Option<f64>,
    pub opportunity_score: f64,
    pub min_opportunity: f64,
}

pub fn market_rules() -> Vec<KillRule<MarketGates>> {
    vec![
        KillRule {
            name: "insufficient_paying_competitors",
            check: |ctx| {
                (ctx.paying_competitors < PAYING_COMPETITOR_FLOOR).then(|| {
                    format!(
                        "Only {} competitors charging ${}+/month found",
                        ctx.paying_competitors, ctx.min_price
                    )
                })
            },
        },
        KillRule {
            name: "low_average_price",
            check: |ctx| {
                ctx.average_price
                    .filter(|avg| *avg < ctx.min_price)
                    .map(|avg| {
                        format!(
                            "Average market pricing ${avg} is below ${} threshold",
                            ctx.min_price
                        )
                    })
            },
        },
        KillRule {
            name: "low_opportunity_score",
            check: |ctx| {
                (ctx.opportunity_score < ctx.min_opportunity).then(|| {
                    format!(
                        "Low market opportunity score: {}/10",
                        ctx.opportunity_score
                    )
                })
            },
        },
    ]
}

// ---------------------------------------------------------------------------
// Content generation
// ---------------------------------------------------------------------------

/// Gate inputs for the content-generation stage.
pub struct ContentGates {
    /// Predicted conversion as a fraction in `[0, 1]`.
    pub predicted_conversion: f64,
    pub min_conversion: f64,
    pub messaging_score: f64,
    pub min_messaging: f64,
}

pub fn content_rules() -> Vec<KillRule<ContentGates>> {
    vec![
        KillRule {
            name: "low_predicted_conversion",
            check: |ctx| {
                (ctx.predicted_conversion < ctx.min_conversion).then(|| {
                    format!(
                        "Predicted conversion rate {:.1}% is below {:.1}% threshold",
                        ctx.predicted_conversion * 100.0,
                        ctx.min_conversion * 100.0
                    )
                })
            },
        },
        KillRule {
            name: "low_messaging_score",
            check: |ctx| {
                (ctx.messaging_score < ctx.min_messaging).then(|| {
                    format!(
                        "Messaging effectiveness score {}/10 is too low",
                        ctx.messaging_score
                    )
                })
            },
        },
    ]
}

// ---------------------------------------------------------------------------
// Survey
// ---------------------------------------------------------------------------

/// Gate inputs for the survey stage.
pub struct SurveyGates {
    pub response_count: usize,
    pub average_wtp: f64,
    pub min_wtp: f64,
    /// Percent of respondents willing to pay at least `min_wtp`.
    pub pct_willing: f64,
    pub min_pct_willing: f64,
}

pub fn survey_rules() -> Vec<KillRule<SurveyGates>> {
    vec![
        KillRule {
            name: "no_responses",
            check: |ctx| {
                (ctx.response_count == 0).then(|| "No survey responses to analyze".to_string())
            },
        },
        KillRule {
            name: "low_average_wtp",
            check: |ctx| {
                (ctx.average_wtp < ctx.min_wtp).then(|| {
                    format!(
                        "Average WTP ${} is below ${} threshold",
                        ctx.average_wtp, ctx.min_wtp
                    )
                })
            },
        },
        KillRule {
            name: "too_few_willing",
            check: |ctx| {
                (ctx.pct_willing < ctx.min_pct_willing).then(|| {
                    format!(
                        "Only {}% willing to pay ${}+ (need {}%+)",
                        ctx.pct_willing, ctx.min_wtp, ctx.min_pct_willing
                    )
                })
            },
        },
    ]
}
