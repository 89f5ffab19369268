//! Monthly-price extraction from free-text competitor copy.
//!
//! An ordered cascade of numeric patterns, most specific first, applied to
//! whatever text is available for a competitor (scraped page content when
//! present, then description/title/snippet). The first match inside the
//! plausibility band `[5, 10000]` wins; out-of-band matches are treated as
//! noise and the cascade continues. When no pattern matches but the source
//! flagged the text as mentioning pricing, a bare dollar-amount scan runs
//! as a low-confidence fallback.
//!
//! Best-effort by design: missed real prices and unrelated dollar amounts
//! are both accepted risks. The plausibility band favors precision; the
//! breadth of pattern variants favors recall.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Lower bound of the plausible monthly-price band, USD.
pub const MIN_PLAUSIBLE_PRICE: f64 = 5.0;
/// Upper bound of the plausible monthly-price band, USD.
pub const MAX_PLAUSIBLE_PRICE: f64 = 10_000.0;

/// How confident the extractor is in a price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceConfidence {
    /// A specific pricing pattern matched.
    Exact,
    /// Only the bare-dollar fallback matched.
    Estimated,
    /// No amount extracted; credited from lexical signals alone.
    PartialCredit,
    /// Nothing found.
    None,
}

impl fmt::Display for PriceConfidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Estimated => write!(f, "estimated"),
            Self::PartialCredit => write!(f, "partial_credit"),
            Self::None => write!(f, "none"),
        }
    }
}

/// Result of a pricing extraction. An extraction miss is a valid outcome,
/// not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingInfo {
    pub found: bool,
    pub monthly_price: Option<f64>,
    /// Pricing model label, e.g. `"Subscription"`. The `(estimated)` suffix
    /// marks fallback extractions.
    pub pricing_model: Option<String>,
    pub confidence: PriceConfidence,
}

impl PricingInfo {
    pub fn none() -> Self {
        Self {
            found: false,
            monthly_price: None,
            pricing_model: None,
            confidence: PriceConfidence::None,
        }
    }

    fn exact(price: f64) -> Self {
        Self {
            found: true,
            monthly_price: Some(price),
            pricing_model: Some("Subscription".into()),
            confidence: PriceConfidence::Exact,
        }
    }

    fn estimated(price: f64) -> Self {
        Self {
            found: true,
            monthly_price: Some(price),
            pricing_model: Some("Subscription (estimated)".into()),
            confidence: PriceConfidence::Estimated,
        }
    }
}

struct PriceRule {
    name: &'static str,
    pattern: Regex,
}

fn rule(name: &'static str, pattern: &str) -> PriceRule {
    PriceRule {
        name,
        pattern: Regex::new(pattern).unwrap(),
    }
}

/// The ordered pattern table. Order is significant: specific monthly-price
/// phrasings come before loose "starting at" variants, which come before
/// ranges and generic "costs $X" forms.
static PRICE_RULES: LazyLock<Vec<PriceRule>> = LazyLock::new(|| {
    vec![
        rule("per_month", r"(?i)\$(\d+(?:\.\d+)?)\s*(?:per\s+)?month"),
        rule("slash_mo", r"(?i)\$(\d+(?:\.\d+)?)\s*/\s*mo(?:nth)?\b"),
        rule("usd_month", r"(?i)(\d+(?:\.\d+)?)\s*USD\s*(?:per\s+)?month"),
        rule("per_user", r"(?i)\$(\d+(?:\.\d+)?)\s*(?:per\s+)?user"),
        rule("from", r"(?i)from\s+\$(\d+(?:\.\d+)?)"),
        rule("starting_at", r"(?i)starting\s+at\s+\$(\d+(?:\.\d+)?)"),
        rule("plans_from", r"(?i)plans?\s+from\s+\$(\d+(?:\.\d+)?)"),
        rule("starts_at", r"(?i)starts?\s+at\s+\$(\d+(?:\.\d+)?)"),
        rule(
            "pricing_starts_at",
            r"(?i)pricing\s+starts?\s+at\s+\$(\d+(?:\.\d+)?)",
        ),
        // Ranges credit the lower bound.
        rule("range", r"(?i)\$(\d+(?:\.\d+)?)\s*-\s*\$(\d+(?:\.\d+)?)"),
        rule(
            "between_range",
            r"(?i)between\s+\$(\d+(?:\.\d+)?)\s+and\s+\$(\d+(?:\.\d+)?)",
        ),
        rule("costs", r"(?i)costs?\s+\$(\d+(?:\.\d+)?)"),
        rule("priced_at", r"(?i)priced\s+at\s+\$(\d+(?:\.\d+)?)"),
        rule("for_per", r"(?i)\$(\d+(?:\.\d+)?)\s*(?:for|per)\b"),
    ]
});

static BARE_DOLLAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$(\d+(?:\.\d+)?)").unwrap());

/// Whether an extracted amount falls inside the plausibility band.
pub fn plausible_price(price: f64) -> bool {
    (MIN_PLAUSIBLE_PRICE..=MAX_PLAUSIBLE_PRICE).contains(&price)
}

/// Run the extraction cascade over `text`.
///
/// `pricing_mentioned` is the upstream source's flag that the text talks
/// about pricing at all; it enables the bare-dollar fallback. Idempotent —
/// the same text always yields the same result.
pub fn extract_pricing(text: &str, pricing_mentioned: bool) -> PricingInfo {
    for rule in PRICE_RULES.iter() {
        let Some(caps) = rule.pattern.captures(text) else {
            continue;
        };
        let Some(price) = caps.get(1).and_then(|m| m.as_str().parse::<f64>().ok()) else {
            continue;
        };
        if plausible_price(price) {
            tracing::debug!(rule = rule.name, price, "Extracted monthly price");
            return PricingInfo::exact(price);
        }
    }

    if pricing_mentioned {
        for caps in BARE_DOLLAR.captures_iter(text) {
            let Some(price) = caps.get(1).and_then(|m| m.as_str().parse::<f64>().ok()) else {
                continue;
            };
            if plausible_price(price) {
                tracing::debug!(price, "Estimated monthly price from bare dollar amount");
                return PricingInfo::estimated(price);
            }
        }
    }

    PricingInfo::none()
}
