//! Structured collaborator response contracts and normalization.
//!
//! Every structured payload the text generator produces is parsed into a
//! typed contract before any stage consumes it, through exactly one
//! normalization point per contract. Malformed or missing fields are
//! replaced with documented defaults and the contract is flagged
//! `schema_valid = false` when the payload as a whole could not be parsed —
//! downstream math runs on defaults rather than crashing, and the flag
//! keeps the degradation visible.
//!
//! ## Defaults
//!
//! ```text
//! pain_score                5
//! weighted complaint score  breakdown weights, else raw complaint count
//! complaint breakdown       all items tier 1
//! quality_rating            medium
//! high_impact_ratio         0.0
//! quality_score             0.5
//! urgency                   30%
//! emotional intensity       20%
//! opportunity_score         5
//! predicted conversion      0.02, clamped to [0, 1]
//! messaging score           5, clamped to [1, 10]
//! survey responses          empty list
//! ```
//!
//! JSON is recovered from prose responses via fenced ```json blocks first,
//! then first-`{`-to-last-`}` (or `[`..`]` for arrays).

use serde::{Deserialize, Serialize};

use crate::evidence::{EvidenceBreakdown, QualityMetrics, QualityRating};
use crate::thresholds::PainMetrics;

/// Survey questions used when question generation fails or returns nothing.
pub const DEFAULT_SURVEY_QUESTIONS: [&str; 5] = [
    "How much would you pay monthly for this solution?",
    "What do you currently use to solve this problem?",
    "What is the biggest frustration with your current approach?",
    "Which feature would make this a must-have for you?",
    "How soon do you need this problem solved?",
];

// ---------------------------------------------------------------------------
// JSON recovery
// ---------------------------------------------------------------------------

/// Pull a JSON object out of a prose response.
pub fn extract_json_block(text: &str) -> Option<&str> {
    // Look for ```json ... ``` fenced blocks
    if let Some(start) = text.find("```json") {
        let json_start = start + 7;
        if let Some(end) = text[json_start..].find("```") {
            return Some(text[json_start..json_start + end].trim());
        }
    }

    // Look for first { to last }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end > start {
        Some(&text[start..=end])
    } else {
        None
    }
}

/// Pull a JSON array out of a prose response.
pub fn extract_json_array(text: &str) -> Option<&str> {
    if let Some(start) = text.find("```json") {
        let json_start = start + 7;
        if let Some(end) = text[json_start..].find("```") {
            let inner = text[json_start..json_start + end].trim();
            if inner.starts_with('[') {
                return Some(inner);
            }
        }
    }

    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end > start {
        Some(&text[start..=end])
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Pain analysis contract
// ---------------------------------------------------------------------------

/// Wire shape of the pain-analysis response. Every field optional; the
/// normalizer decides what missing means.
#[derive(Debug, Deserialize)]
struct RawPainAnalysis {
    #[serde(default)]
    pain_score: Option<f64>,
    #[serde(default, alias = "weighted_complaints")]
    weighted_complaint_score: Option<u32>,
    #[serde(default)]
    complaint_breakdown: Option<EvidenceBreakdown>,
    #[serde(default)]
    quality_rating: Option<String>,
    #[serde(default)]
    high_impact_ratio: Option<f64>,
    #[serde(default)]
    quality_score: Option<f64>,
    #[serde(default, alias = "urgency_pct")]
    urgency_percentage: Option<f64>,
    #[serde(default, alias = "emotional_pct")]
    emotional_intensity_percentage: Option<f64>,
    #[serde(default)]
    key_themes: Vec<String>,
}

/// Normalized pain-analysis result.
#[derive(Debug, Clone, Serialize)]
pub struct PainAnalysis {
    /// Number of complaint snippets fed into the analysis.
    pub complaints_analyzed: u32,
    pub breakdown: EvidenceBreakdown,
    /// Weighted complaint score; falls back to breakdown weights, then to
    /// the raw complaint count.
    pub weighted_score: u32,
    /// 1–10 severity score.
    pub pain_score: f64,
    pub quality: QualityMetrics,
    pub key_themes: Vec<String>,
    /// False when the response contained no parseable JSON object.
    pub schema_valid: bool,
}

impl PainAnalysis {
    /// Parse and normalize a generator response. Never fails: an
    /// unparseable payload yields an all-defaults analysis with
    /// `schema_valid = false`.
    pub fn from_response(raw: &str, complaints_analyzed: u32) -> Self {
        let parsed = extract_json_block(raw)
            .and_then(|json| serde_json::from_str::<RawPainAnalysis>(json).ok());

        let Some(raw_analysis) = parsed else {
            tracing::warn!(
                complaints_analyzed,
                "Pain analysis response had no parseable JSON; using defaults"
            );
            return Self::defaults(complaints_analyzed);
        };

        let breakdown = raw_analysis
            .complaint_breakdown
            .unwrap_or_else(|| EvidenceBreakdown::all_tier1(complaints_analyzed));

        // When the payload omitted the breakdown too, `breakdown` is
        // all-tier-1 and this weight equals the raw complaint count.
        let weighted_score = raw_analysis
            .weighted_complaint_score
            .unwrap_or_else(|| breakdown.weighted_score());

        let defaults = QualityMetrics::default();
        let quality = QualityMetrics {
            high_impact_ratio: raw_analysis
                .high_impact_ratio
                .unwrap_or(defaults.high_impact_ratio)
                .clamp(0.0, 1.0),
            quality_score: raw_analysis
                .quality_score
                .unwrap_or(defaults.quality_score)
                .clamp(0.0, 1.0),
            urgency_pct: raw_analysis
                .urgency_percentage
                .unwrap_or(defaults.urgency_pct)
                .clamp(0.0, 100.0),
            emotional_pct: raw_analysis
                .emotional_intensity_percentage
                .unwrap_or(defaults.emotional_pct)
                .clamp(0.0, 100.0),
            quality_rating: raw_analysis
                .quality_rating
                .as_deref()
                .map(QualityRating::parse)
                .unwrap_or_default(),
        };

        Self {
            complaints_analyzed,
            breakdown,
            weighted_score,
            pain_score: raw_analysis.pain_score.unwrap_or(5.0).clamp(0.0, 10.0),
            quality,
            key_themes: raw_analysis.key_themes,
            schema_valid: true,
        }
    }

    fn defaults(complaints_analyzed: u32) -> Self {
        let breakdown = EvidenceBreakdown::all_tier1(complaints_analyzed);
        let weighted_score = breakdown.weighted_score();
        Self {
            complaints_analyzed,
            breakdown,
            weighted_score,
            pain_score: 5.0,
            quality: QualityMetrics::default(),
            key_themes: Vec::new(),
            schema_valid: false,
        }
    }

    /// The slice of this analysis that threshold evaluation reads.
    pub fn metrics(&self) -> PainMetrics {
        PainMetrics {
            weighted_score: self.weighted_score,
            pain_score: self.pain_score,
            quality_rating: self.quality.quality_rating,
            urgency_pct: self.quality.urgency_pct,
            emotional_pct: self.quality.emotional_pct,
        }
    }
}

// ---------------------------------------------------------------------------
// Market assessment contract
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawMarketAssessment {
    #[serde(default, alias = "opportunity")]
    opportunity_score: Option<f64>,
    #[serde(default, alias = "gaps")]
    market_gaps: Vec<String>,
    #[serde(default)]
    reasoning: Option<String>,
}

/// Normalized market opportunity assessment.
#[derive(Debug, Clone, Serialize)]
pub struct MarketAssessment {
    /// 1–10 opportunity score; defaults to 5 when absent.
    pub opportunity_score: f64,
    pub market_gaps: Vec<String>,
    pub reasoning: String,
    pub schema_valid: bool,
}

impl MarketAssessment {
    pub fn from_response(raw: &str) -> Self {
        let parsed = extract_json_block(raw)
            .and_then(|json| serde_json::from_str::<RawMarketAssessment>(json).ok());

        let Some(raw_assessment) = parsed else {
            tracing::warn!("Market assessment response had no parseable JSON; using defaults");
            return Self {
                opportunity_score: 5.0,
                market_gaps: Vec::new(),
                reasoning: String::new(),
                schema_valid: false,
            };
        };

        Self {
            opportunity_score: raw_assessment
                .opportunity_score
                .unwrap_or(5.0)
                .clamp(0.0, 10.0),
            market_gaps: raw_assessment.market_gaps,
            reasoning: raw_assessment.reasoning.unwrap_or_default(),
            schema_valid: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Landing page contract
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawLandingPage {
    #[serde(default)]
    headline: Option<String>,
    #[serde(default)]
    subheadline: Option<String>,
    #[serde(default, alias = "bullets")]
    benefits: Vec<String>,
    #[serde(default, alias = "cta")]
    call_to_action: Option<String>,
    #[serde(default)]
    faq: Vec<FaqItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaqItem {
    pub question: String,
    pub answer: String,
}

/// Normalized landing-page copy.
#[derive(Debug, Clone, Serialize)]
pub struct LandingPage {
    pub headline: String,
    pub subheadline: String,
    /// Benefit bullets; padded to three when the generator returns fewer.
    pub benefits: Vec<String>,
    pub call_to_action: String,
    pub faq: Vec<FaqItem>,
    pub schema_valid: bool,
}

impl LandingPage {
    /// Parse and normalize, falling back to a deterministic topic-derived
    /// page so the evaluation step always has something to score.
    pub fn from_response(raw: &str, topic: &str) -> Self {
        let parsed = extract_json_block(raw)
            .and_then(|json| serde_json::from_str::<RawLandingPage>(json).ok());

        let Some(raw_page) = parsed else {
            tracing::warn!(topic, "Landing page response had no parseable JSON; using fallback");
            return Self::fallback(topic);
        };

        let fallback = Self::fallback(topic);
        let mut benefits = raw_page.benefits;
        benefits.retain(|b| !b.trim().is_empty());
        for filler in fallback.benefits.iter().skip(benefits.len()) {
            benefits.push(filler.clone());
        }
        benefits.truncate(3);

        Self {
            headline: raw_page
                .headline
                .filter(|h| !h.trim().is_empty())
                .unwrap_or(fallback.headline),
            subheadline: raw_page
                .subheadline
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(fallback.subheadline),
            benefits,
            call_to_action: raw_page
                .call_to_action
                .filter(|c| !c.trim().is_empty())
                .unwrap_or(fallback.call_to_action),
            faq: raw_page.faq,
            schema_valid: true,
        }
    }

    fn fallback(topic: &str) -> Self {
        Self {
            headline: format!("Stop struggling with {topic}"),
            subheadline: format!("A focused tool that handles {topic} so you don't have to"),
            benefits: vec![
                "Set up in minutes, not weeks".to_string(),
                "Replaces the spreadsheets and manual workarounds".to_string(),
                "Priced for small teams".to_string(),
            ],
            call_to_action: "Join the early access list".to_string(),
            faq: Vec::new(),
            schema_valid: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Content evaluation contract
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawContentEvaluation {
    #[serde(default, alias = "conversion_rate")]
    predicted_conversion_rate: Option<f64>,
    #[serde(default, alias = "messaging_effectiveness")]
    messaging_score: Option<f64>,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    weaknesses: Vec<String>,
}

/// Normalized messaging evaluation of a landing page.
#[derive(Debug, Clone, Serialize)]
pub struct ContentEvaluation {
    /// Predicted visitor→signup conversion as a fraction in `[0, 1]`.
    pub predicted_conversion_rate: f64,
    /// Messaging effectiveness on the 1–10 scale.
    pub messaging_score: f64,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub schema_valid: bool,
}

impl ContentEvaluation {
    pub fn from_response(raw: &str) -> Self {
        let parsed = extract_json_block(raw)
            .and_then(|json| serde_json::from_str::<RawContentEvaluation>(json).ok());

        let Some(raw_eval) = parsed else {
            tracing::warn!("Content evaluation response had no parseable JSON; using defaults");
            return Self {
                predicted_conversion_rate: 0.02,
                messaging_score: 5.0,
                strengths: Vec::new(),
                weaknesses: Vec::new(),
                schema_valid: false,
            };
        };

        // Generators sometimes answer in percent; 2 means 2%, not 200%.
        let conversion = match raw_eval.predicted_conversion_rate {
            Some(rate) if rate > 1.0 => rate / 100.0,
            Some(rate) => rate,
            None => 0.02,
        };

        Self {
            predicted_conversion_rate: conversion.clamp(0.0, 1.0),
            messaging_score: raw_eval.messaging_score.unwrap_or(5.0).clamp(1.0, 10.0),
            strengths: raw_eval.strengths,
            weaknesses: raw_eval.weaknesses,
            schema_valid: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Survey contracts
// ---------------------------------------------------------------------------

/// One simulated respondent's answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyResponse {
    #[serde(default = "unknown_persona")]
    pub persona: String,
    /// Dollars per month; 0 when the respondent would not pay.
    #[serde(default)]
    pub willingness_to_pay: f64,
    #[serde(default)]
    pub current_solution: String,
    #[serde(default)]
    pub must_have_feature: Option<String>,
}

fn unknown_persona() -> String {
    "unknown".to_string()
}

/// Parse simulated survey responses. Unparseable payloads yield an empty
/// list; the survey kill rules treat that as zero respondents.
pub fn parse_survey_responses(raw: &str) -> Vec<SurveyResponse> {
    let Some(json) = extract_json_array(raw) else {
        tracing::warn!("Survey response payload had no parseable JSON array");
        return Vec::new();
    };

    match serde_json::from_str::<Vec<SurveyResponse>>(json) {
        Ok(mut responses) => {
            for response in &mut responses {
                if response.willingness_to_pay < 0.0 {
                    response.willingness_to_pay = 0.0;
                }
            }
            responses
        }
        Err(err) => {
            tracing::warn!(%err, "Survey responses failed to deserialize");
            Vec::new()
        }
    }
}

// ---------------------------------------------------------------------------
// List parsing (queries, questions)
// ---------------------------------------------------------------------------

/// Parse a list of short strings (search queries, survey questions) from a
/// generator response. Tries a JSON string array first, then falls back to
/// one-item-per-line with bullets, numbering, and quotes stripped.
pub fn parse_string_list(raw: &str) -> Vec<String> {
    if let Some(json) = extract_json_array(raw) {
        if let Ok(items) = serde_json::from_str::<Vec<String>>(json) {
            return dedupe_nonempty(items);
        }
    }

    let lines = raw
        .lines()
        .map(|line| {
            line.trim()
                .trim_start_matches(['-', '*', '•'])
                .trim_start_matches(|c: char| c.is_ascii_digit())
                .trim_start_matches(['.', ')', ':'])
                .trim()
                .trim_matches('"')
                .to_string()
        })
        .collect();
    dedupe_nonempty(lines)
}

fn dedupe_nonempty(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty() && item.len() > 3)
        .filter(|item| seen.insert(item.to_lowercase()))
        .collect()
}
