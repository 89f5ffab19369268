//! Paying-competitor counting — a three-tier confidence cascade.
//!
//! Pricing in free text is sparse and inconsistently formatted, so a single
//! strict extractor would systematically under-count and trigger false
//! kills on markets where competitors simply don't publish prices. The
//! counter therefore cascades:
//!
//! ```text
//! 1. extracted price ≥ min        → +1.0   (full credit)
//! 2. pricing mentioned:
//!      bare amount ≥ min in text  → +1.0
//!      the word "pricing" appears → +0.5
//! 3. still below the kill floor   → lexical paid-product signals, +0.5 each
//! ```
//!
//! The final count is the floor of the running total.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::pricing::PricingInfo;

/// Kill floor for the paying-competitor gate; also the trigger for the
/// step-3 lexical backstop.
pub const PAYING_COMPETITOR_FLOOR: u32 = 3;

/// Lexical signals that a competitor sells a paid product even when no
/// amount could be extracted.
const PAID_SIGNAL_TERMS: [&str; 8] = [
    "enterprise",
    "business pricing",
    "professional plan",
    "team plan",
    "premium",
    "per user",
    "per month",
    "subscription",
];

static DOLLAR_AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$(\d+(?:\.\d+)?)").unwrap());

/// One competitor as assembled from search results (and optional scraped
/// page content, prepended into `raw_text`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitorRecord {
    pub name: String,
    /// Concatenation of all text known about this competitor.
    pub raw_text: String,
    pub link: String,
    /// Upstream flag: the source text talks about pricing at all.
    pub pricing_mentioned: bool,
    pub pricing: PricingInfo,
}

impl CompetitorRecord {
    /// Extracted monthly price, when the extractor found one.
    pub fn monthly_price(&self) -> Option<f64> {
        self.pricing.monthly_price.filter(|_| self.pricing.found)
    }
}

/// Whether `text` contains any bare dollar amount at or above `min`.
///
/// Unlike the extractor, this scan has no upper plausibility bound: a
/// "$50,000 contract" mention is still evidence of a paying market.
fn has_amount_at_least(text: &str, min: f64) -> bool {
    DOLLAR_AMOUNT.captures_iter(text).any(|caps| {
        caps.get(1)
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .is_some_and(|amount| amount >= min)
    })
}

fn has_paid_signal(text: &str) -> bool {
    let lower = text.to_lowercase();
    PAID_SIGNAL_TERMS.iter().any(|term| lower.contains(term))
}

/// Count competitors charging at least `min_price` per month.
///
/// Returns the floor of the credit total; half credits only materialize in
/// pairs. The count is non-decreasing as competitors with valid pricing
/// are appended.
pub fn count_paying(competitors: &[CompetitorRecord], min_price: f64) -> u32 {
    let mut total = 0.0_f64;
    let mut counted = vec![false; competitors.len()];

    for (i, competitor) in competitors.iter().enumerate() {
        if competitor.monthly_price().is_some_and(|price| price >= min_price) {
            total += 1.0;
            counted[i] = true;
        } else if competitor.pricing_mentioned {
            // Extraction missed the bar (or missed entirely) but the source
            // says pricing exists — scan for any qualifying amount.
            if has_amount_at_least(&competitor.raw_text, min_price) {
                total += 1.0;
                counted[i] = true;
            } else if competitor.raw_text.to_lowercase().contains("pricing") {
                total += 0.5;
                counted[i] = true;
            }
        }
    }

    // Low-confidence backstop: only when the confident passes left us below
    // the kill floor do lexical signals contribute.
    if total < f64::from(PAYING_COMPETITOR_FLOOR) {
        for (i, competitor) in competitors.iter().enumerate() {
            if !counted[i] && has_paid_signal(&competitor.raw_text) {
                total += 0.5;
            }
        }
    }

    let count = total.floor() as u32;
    tracing::debug!(
        competitors = competitors.len(),
        min_price,
        credit_total = total,
        count,
        "Counted paying competitors"
    );
    count
}

/// Mean extracted monthly price across competitors with a found price.
pub fn average_price(competitors: &[CompetitorRecord]) -> Option<f64> {
    let prices: Vec<f64> = competitors.iter().filter_map(|c| c.monthly_price()).collect();
    if prices.is_empty() {
        return None;
    }
    Some(prices.iter().sum::<f64>() / prices.len() as f64)
}
