//! Multi-level threshold evaluation — three rigor profiles, one verdict each.
//!
//! Pain-research metrics are scored against three named profiles:
//!
//! ```text
//! easy       → "is there a market at all"        (weighted + pain only)
//! medium     → "is this a strong opportunity"    (+ quality ordinal gate)
//! difficult  → "is this an exceptional problem"  (+ urgency/emotional gates)
//! ```
//!
//! Profiles are evaluated independently from raw thresholds: a higher
//! profile passing while a lower one fails is possible on inconsistent
//! inputs and is deliberately not guarded against. Each failed gate yields
//! one human-readable unmet-criterion string, ordered: complaints, pain
//! score, quality, urgency, emotional.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::evidence::QualityRating;

/// Named rigor level of a threshold profile.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RigorLevel {
    Easy,
    Medium,
    Difficult,
}

impl RigorLevel {
    pub const ALL: [RigorLevel; 3] = [Self::Easy, Self::Medium, Self::Difficult];

    /// Long-form label used in summaries.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Easy => "Easy (Market Exists)",
            Self::Medium => "Medium (Strong Opportunity)",
            Self::Difficult => "Difficult (Exceptional Problem)",
        }
    }
}

impl fmt::Display for RigorLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Easy => write!(f, "easy"),
            Self::Medium => write!(f, "medium"),
            Self::Difficult => write!(f, "difficult"),
        }
    }
}

/// Minimum metric values required to pass one rigor level.
///
/// Immutable configuration, loaded once. Optional gates (`quality_required`,
/// `urgency_required`, `emotional_required`) are skipped when `None`.
///
/// Which level a profile drives is decided by the slot it occupies in
/// `ThresholdSettings`, not by anything in the profile itself. A profile
/// table given in config must state both required numbers; the optional
/// gates default to off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdProfile {
    /// Required weighted complaint score.
    pub complaints_required: u32,
    /// Required pain score, on the 1–10 scale.
    pub pain_score_required: f64,
    pub quality_required: Option<QualityRating>,
    /// Required urgency percentage.
    pub urgency_required: Option<f64>,
    /// Required emotional-intensity percentage.
    pub emotional_required: Option<f64>,
}

impl ThresholdProfile {
    /// Built-in profile for a rigor level.
    pub fn for_level(level: RigorLevel) -> Self {
        match level {
            RigorLevel::Easy => Self {
                complaints_required: 20,
                pain_score_required: 5.0,
                quality_required: None,
                urgency_required: None,
                emotional_required: None,
            },
            RigorLevel::Medium => Self {
                complaints_required: 40,
                pain_score_required: 6.0,
                quality_required: Some(QualityRating::Medium),
                urgency_required: None,
                emotional_required: None,
            },
            RigorLevel::Difficult => Self {
                complaints_required: 80,
                pain_score_required: 8.0,
                quality_required: Some(QualityRating::High),
                urgency_required: Some(40.0),
                emotional_required: Some(30.0),
            },
        }
    }
}

/// The three profiles the evaluator runs against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdSettings {
    pub easy: ThresholdProfile,
    pub medium: ThresholdProfile,
    pub difficult: ThresholdProfile,
}

impl Default for ThresholdSettings {
    fn default() -> Self {
        Self {
            easy: ThresholdProfile::for_level(RigorLevel::Easy),
            medium: ThresholdProfile::for_level(RigorLevel::Medium),
            difficult: ThresholdProfile::for_level(RigorLevel::Difficult),
        }
    }
}

impl ThresholdSettings {
    pub fn profile(&self, level: RigorLevel) -> &ThresholdProfile {
        match level {
            RigorLevel::Easy => &self.easy,
            RigorLevel::Medium => &self.medium,
            RigorLevel::Difficult => &self.difficult,
        }
    }
}

/// The evaluator's input: normalized pain-research metrics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PainMetrics {
    /// Weighted complaint score (`3*t3 + 2*t2 + t1`).
    pub weighted_score: u32,
    /// Pain score on the 1–10 scale.
    pub pain_score: f64,
    pub quality_rating: QualityRating,
    pub urgency_pct: f64,
    pub emotional_pct: f64,
}

/// Outcome of evaluating one profile. Created fresh per call, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdEvaluation {
    pub level: RigorLevel,
    pub passed: bool,
    /// One string per failed gate, ordered: complaints, pain, quality,
    /// urgency, emotional. Empty when `passed`.
    pub unmet_reasons: Vec<String>,
    /// The profile the metrics were judged against.
    pub criteria: ThresholdProfile,
}

impl ThresholdEvaluation {
    /// All unmet reasons as one display string.
    pub fn reason(&self) -> String {
        self.unmet_reasons.join(" | ")
    }
}

/// Evaluate metrics against all three rigor profiles.
///
/// Pure function: no side effects, no error conditions, always returns
/// exactly three evaluations. Defaulted inputs (the normalization layer's
/// job) guarantee every gate can be computed.
pub fn evaluate_thresholds(
    metrics: &PainMetrics,
    settings: &ThresholdSettings,
) -> BTreeMap<RigorLevel, ThresholdEvaluation> {
    // Keyed by the settings slot: a config overlay that changes gate
    // numbers for one level must not shuffle evaluations between levels.
    RigorLevel::ALL
        .into_iter()
        .map(|level| {
            (
                level,
                evaluate_profile(level, metrics, settings.profile(level)),
            )
        })
        .collect()
}

fn evaluate_profile(
    level: RigorLevel,
    metrics: &PainMetrics,
    profile: &ThresholdProfile,
) -> ThresholdEvaluation {
    let mut unmet = Vec::new();

    if metrics.weighted_score < profile.complaints_required {
        unmet.push(format!(
            "Weighted complaints: {}/{}",
            metrics.weighted_score, profile.complaints_required
        ));
    }

    if metrics.pain_score < profile.pain_score_required {
        unmet.push(format!(
            "Pain score: {}/{}",
            metrics.pain_score, profile.pain_score_required
        ));
    }

    if let Some(required) = profile.quality_required {
        if !metrics.quality_rating.at_least(required) {
            unmet.push(format!(
                "Quality: {} (need {})",
                metrics.quality_rating,
                quality_requirement_label(required)
            ));
        }
    }

    if let Some(required) = profile.urgency_required {
        if metrics.urgency_pct < required {
            unmet.push(format!(
                "Urgency: {}%/{}%",
                metrics.urgency_pct, required
            ));
        }
    }

    if let Some(required) = profile.emotional_required {
        if metrics.emotional_pct < required {
            unmet.push(format!(
                "Emotional: {}%/{}%",
                metrics.emotional_pct, required
            ));
        }
    }

    let evaluation = ThresholdEvaluation {
        level,
        passed: unmet.is_empty(),
        unmet_reasons: unmet,
        criteria: profile.clone(),
    };

    tracing::debug!(
        level = %evaluation.level,
        passed = evaluation.passed,
        weighted = metrics.weighted_score,
        pain = metrics.pain_score,
        "Threshold evaluation"
    );

    evaluation
}

fn quality_requirement_label(required: QualityRating) -> &'static str {
    match required {
        QualityRating::Low => "low+",
        QualityRating::Medium => "medium+",
        QualityRating::High => "high",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(weighted: u32, pain: f64, quality: QualityRating) -> PainMetrics {
        PainMetrics {
            weighted_score: weighted,
            pain_score: pain,
            quality_rating: quality,
            urgency_pct: 30.0,
            emotional_pct: 20.0,
        }
    }

    // -- Profile defaults --

    #[test]
    fn test_default_profiles() {
        let settings = ThresholdSettings::default();
        assert_eq!(settings.medium.complaints_required, 40);
        assert_eq!(settings.medium.pain_score_required, 6.0);
        assert_eq!(settings.medium.quality_required, Some(QualityRating::Medium));
        assert_eq!(settings.easy.quality_required, None);
        assert_eq!(settings.difficult.quality_required, Some(QualityRating::High));
        assert_eq!(settings.difficult.urgency_required, Some(40.0));
    }

    // -- Representative evidence profiles --

    #[test]
    fn test_strong_evidence_passes_medium() {
        // {tier3:20, tier2:25, tier1:15} → weighted 110, pain 8, quality high
        let m = metrics(110, 8.0, QualityRating::High);
        let evals = evaluate_thresholds(&m, &ThresholdSettings::default());

        let medium = &evals[&RigorLevel::Medium];
        assert!(medium.passed);
        assert!(medium.unmet_reasons.is_empty());
        assert!(evals[&RigorLevel::Easy].passed);
    }

    #[test]
    fn test_weak_evidence_fails_medium_citing_counts() {
        // {tier3:2, tier2:8, tier1:20} → weighted 38, pain 4, quality low
        let m = metrics(38, 4.0, QualityRating::Low);
        let evals = evaluate_thresholds(&m, &ThresholdSettings::default());

        let medium = &evals[&RigorLevel::Medium];
        assert!(!medium.passed);
        assert!(medium.reason().contains("38/40"));
        assert!(medium.reason().contains("Pain score: 4/6"));
        assert!(medium.reason().contains("Quality: low (need medium+)"));
    }

    // -- Gate mechanics --

    #[test]
    fn test_unmet_reasons_are_ordered() {
        let m = PainMetrics {
            weighted_score: 10,
            pain_score: 2.0,
            quality_rating: QualityRating::Low,
            urgency_pct: 5.0,
            emotional_pct: 5.0,
        };
        let eval = evaluate_profile(
            RigorLevel::Difficult,
            &m,
            &ThresholdProfile::for_level(RigorLevel::Difficult),
        );
        assert_eq!(eval.unmet_reasons.len(), 5);
        assert!(eval.unmet_reasons[0].starts_with("Weighted complaints"));
        assert!(eval.unmet_reasons[1].starts_with("Pain score"));
        assert!(eval.unmet_reasons[2].starts_with("Quality"));
        assert!(eval.unmet_reasons[3].starts_with("Urgency"));
        assert!(eval.unmet_reasons[4].starts_with("Emotional"));
    }

    #[test]
    fn test_quality_gate_skipped_for_easy() {
        let m = metrics(25, 6.0, QualityRating::Low);
        let evals = evaluate_thresholds(&m, &ThresholdSettings::default());
        assert!(evals[&RigorLevel::Easy].passed);
        assert!(!evals[&RigorLevel::Medium].passed);
    }

    #[test]
    fn test_medium_quality_accepts_medium_and_high() {
        for quality in [QualityRating::Medium, QualityRating::High] {
            let m = metrics(50, 7.0, quality);
            let eval = evaluate_profile(
                RigorLevel::Medium,
                &m,
                &ThresholdProfile::for_level(RigorLevel::Medium),
            );
            assert!(eval.passed, "medium profile should accept {quality}");
        }
    }

    #[test]
    fn test_difficult_requires_exactly_high() {
        let mut m = metrics(100, 9.0, QualityRating::Medium);
        m.urgency_pct = 50.0;
        m.emotional_pct = 40.0;
        let eval = evaluate_profile(
            RigorLevel::Difficult,
            &m,
            &ThresholdProfile::for_level(RigorLevel::Difficult),
        );
        assert!(!eval.passed);
        assert_eq!(eval.unmet_reasons, vec!["Quality: medium (need high)"]);
    }

    #[test]
    fn test_difficult_percentage_gates() {
        let m = PainMetrics {
            weighted_score: 100,
            pain_score: 9.0,
            quality_rating: QualityRating::High,
            urgency_pct: 10.0,
            emotional_pct: 5.0,
        };
        let eval = evaluate_profile(
            RigorLevel::Difficult,
            &m,
            &ThresholdProfile::for_level(RigorLevel::Difficult),
        );
        assert!(!eval.passed);
        assert!(eval.reason().contains("Urgency: 10%/40%"));
        assert!(eval.reason().contains("Emotional: 5%/30%"));
    }

    #[test]
    fn test_boundary_values_pass() {
        // Gates are >=, not >.
        let m = metrics(40, 6.0, QualityRating::Medium);
        let eval = evaluate_profile(
            RigorLevel::Medium,
            &m,
            &ThresholdProfile::for_level(RigorLevel::Medium),
        );
        assert!(eval.passed);
    }

    #[test]
    fn test_levels_evaluated_independently() {
        // Inconsistent configuration: easy stricter than medium. The
        // evaluator doesn't second-guess it — each level stands alone.
        let mut settings = ThresholdSettings::default();
        settings.easy.complaints_required = 500;
        let m = metrics(110, 8.0, QualityRating::High);
        let evals = evaluate_thresholds(&m, &settings);
        assert!(!evals[&RigorLevel::Easy].passed);
        assert!(evals[&RigorLevel::Medium].passed);
    }

    #[test]
    fn test_raising_threshold_never_flips_fail_to_pass() {
        let m = metrics(38, 5.0, QualityRating::Medium);
        let level = RigorLevel::Medium;
        let mut profile = ThresholdProfile::for_level(level);

        let mut last_passed = evaluate_profile(level, &m, &profile).passed;
        for bump in 1..=50 {
            profile.complaints_required = 40 + bump;
            let passed = evaluate_profile(level, &m, &profile).passed;
            assert!(!(passed && !last_passed), "raising a threshold flipped fail→pass");
            last_passed = passed;
        }

        profile = ThresholdProfile::for_level(level);
        last_passed = evaluate_profile(level, &m, &profile).passed;
        for bump in 1..=10 {
            profile.pain_score_required = 6.0 + f64::from(bump);
            let passed = evaluate_profile(level, &m, &profile).passed;
            assert!(!(passed && !last_passed));
            last_passed = passed;
        }
    }

    #[test]
    fn test_always_returns_three_evaluations() {
        let m = metrics(0, 0.0, QualityRating::Low);
        let evals = evaluate_thresholds(&m, &ThresholdSettings::default());
        assert_eq!(evals.len(), 3);
        for level in RigorLevel::ALL {
            assert!(evals.contains_key(&level));
        }
    }

    #[test]
    fn test_evaluation_snapshot_carries_criteria() {
        let m = metrics(10, 3.0, QualityRating::Low);
        let evals = evaluate_thresholds(&m, &ThresholdSettings::default());
        assert_eq!(evals[&RigorLevel::Medium].criteria.complaints_required, 40);
    }

    #[test]
    fn test_settings_toml_overlay() {
        let settings: ThresholdSettings = toml::from_str(
            r#"
            [medium]
            complaints_required = 55
            pain_score_required = 6.0
            quality_required = "medium"
            "#,
        )
        .unwrap();
        assert_eq!(settings.medium.complaints_required, 55);
        // Levels without a table keep the built-in profiles.
        assert_eq!(settings.easy.complaints_required, 20);
        assert_eq!(settings.difficult.complaints_required, 80);
    }

    #[test]
    fn test_overlaid_profile_stays_in_its_slot() {
        let settings: ThresholdSettings = toml::from_str(
            r#"
            [easy]
            complaints_required = 10
            pain_score_required = 3.0
            "#,
        )
        .unwrap();
        // Optional gates not named in the table are off.
        assert_eq!(settings.easy.quality_required, None);

        let m = metrics(15, 4.0, QualityRating::Low);
        let evals = evaluate_thresholds(&m, &settings);

        assert_eq!(evals.len(), 3);
        assert_eq!(evals[&RigorLevel::Easy].level, RigorLevel::Easy);
        assert!(evals[&RigorLevel::Easy].passed);
        assert!(!evals[&RigorLevel::Medium].passed);
    }

    #[test]
    fn test_incomplete_profile_table_is_rejected() {
        // A present table must state both required numbers.
        let result: Result<ThresholdSettings, _> = toml::from_str(
            r#"
            [medium]
            complaints_required = 55
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_rigor_level_display() {
        assert_eq!(RigorLevel::Easy.to_string(), "easy");
        assert_eq!(
            RigorLevel::Difficult.display_name(),
            "Difficult (Exceptional Problem)"
        );
    }
}
