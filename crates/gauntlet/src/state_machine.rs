//! Funnel stage model — canonical order, free navigation, audit log.
//!
//! The funnel is linear:
//!
//! ```text
//! input → pain_research → market_analysis → content_generation → survey → results
//! ```
//!
//! Navigation, however, is deliberately free: every visited-or-completed
//! stage stays reachable forwards and backwards, and a kill verdict informs
//! the recommendation without ever blocking movement — the user can inspect
//! hypothetical downstream stages after an upstream kill. What *is* guarded
//! is execution: a stage can only run once the stage it reads data from has
//! produced output (see `required_upstream`).
//!
//! Every navigation is recorded so a session's path can be replayed and
//! audited.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// The funnel stages, in canonical order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FunnelStage {
    /// Collecting the problem description and target audience.
    Input,
    /// Searching for and scoring complaint evidence.
    PainResearch,
    /// Competitor discovery, pricing extraction, opportunity scoring.
    MarketAnalysis,
    /// Landing-page copy generation and messaging evaluation.
    ContentGeneration,
    /// Willingness-to-pay survey simulation and aggregation.
    Survey,
    /// Aggregated verdicts, costs, and the GO / NO-GO recommendation.
    Results,
}

impl FunnelStage {
    pub const ALL: [FunnelStage; 6] = [
        Self::Input,
        Self::PainResearch,
        Self::MarketAnalysis,
        Self::ContentGeneration,
        Self::Survey,
        Self::Results,
    ];

    /// The four stages that execute work (as opposed to the navigation-only
    /// `input` and `results` endpoints).
    pub const EXECUTABLE: [FunnelStage; 4] = [
        Self::PainResearch,
        Self::MarketAnalysis,
        Self::ContentGeneration,
        Self::Survey,
    ];

    /// Position in the canonical order, 0-based.
    pub fn position(self) -> usize {
        match self {
            Self::Input => 0,
            Self::PainResearch => 1,
            Self::MarketAnalysis => 2,
            Self::ContentGeneration => 3,
            Self::Survey => 4,
            Self::Results => 5,
        }
    }

    /// Next stage in canonical order.
    pub fn next(self) -> Option<FunnelStage> {
        match self {
            Self::Input => Some(Self::PainResearch),
            Self::PainResearch => Some(Self::MarketAnalysis),
            Self::MarketAnalysis => Some(Self::ContentGeneration),
            Self::ContentGeneration => Some(Self::Survey),
            Self::Survey => Some(Self::Results),
            Self::Results => None,
        }
    }

    /// The stage whose output this stage reads. Execution requires that
    /// stage to have produced a result; navigation does not.
    pub fn required_upstream(self) -> Option<FunnelStage> {
        match self {
            Self::MarketAnalysis => Some(Self::PainResearch),
            Self::ContentGeneration => Some(Self::MarketAnalysis),
            Self::Survey => Some(Self::ContentGeneration),
            Self::Input | Self::PainResearch | Self::Results => None,
        }
    }

    /// Human-readable label used in kill reasons and summaries.
    pub fn label(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::PainResearch => "pain research",
            Self::MarketAnalysis => "market analysis",
            Self::ContentGeneration => "content generation",
            Self::Survey => "survey",
            Self::Results => "results",
        }
    }
}

impl fmt::Display for FunnelStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => write!(f, "input"),
            Self::PainResearch => write!(f, "pain_research"),
            Self::MarketAnalysis => write!(f, "market_analysis"),
            Self::ContentGeneration => write!(f, "content_generation"),
            Self::Survey => write!(f, "survey"),
            Self::Results => write!(f, "results"),
        }
    }
}

/// One recorded navigation step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationRecord {
    pub from: FunnelStage,
    pub to: FunnelStage,
    /// Milliseconds since the machine was created.
    pub elapsed_ms: u64,
    /// Optional context about why this navigation happened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Tracks the current stage and the full navigation history.
///
/// All moves are legal (free navigation is a design requirement, not an
/// oversight); the value of the machine is the audit trail and the
/// canonical-order helpers.
pub struct StageMachine {
    current: FunnelStage,
    created_at: Instant,
    navigations: Vec<NavigationRecord>,
}

impl StageMachine {
    pub fn new() -> Self {
        Self {
            current: FunnelStage::Input,
            created_at: Instant::now(),
            navigations: Vec::new(),
        }
    }

    pub fn current(&self) -> FunnelStage {
        self.current
    }

    /// Move to `to`, recording the step. Self-moves are recorded too —
    /// re-running a stage is a real event worth auditing.
    pub fn goto(&mut self, to: FunnelStage, reason: Option<&str>) {
        let record = NavigationRecord {
            from: self.current,
            to,
            elapsed_ms: self.created_at.elapsed().as_millis() as u64,
            reason: reason.map(String::from),
        };

        tracing::debug!(from = %self.current, to = %to, "Stage navigation");

        self.navigations.push(record);
        self.current = to;
    }

    /// Whether `stage` has ever been the current stage.
    pub fn visited(&self, stage: FunnelStage) -> bool {
        stage == FunnelStage::Input
            || self.current == stage
            || self.navigations.iter().any(|n| n.to == stage)
    }

    pub fn navigations(&self) -> &[NavigationRecord] {
        &self.navigations
    }

    /// One-line history summary.
    pub fn summary(&self) -> String {
        let path: Vec<String> = std::iter::once(FunnelStage::Input.to_string())
            .chain(self.navigations.iter().map(|n| n.to.to_string()))
            .collect();
        format!("{} ({} moves)", path.join(" → "), self.navigations.len())
    }
}

impl Default for StageMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_at_input() {
        let machine = StageMachine::new();
        assert_eq!(machine.current(), FunnelStage::Input);
        assert!(machine.navigations().is_empty());
    }

    #[test]
    fn test_canonical_order() {
        let mut stage = FunnelStage::Input;
        let mut seen = vec![stage];
        while let Some(next) = stage.next() {
            seen.push(next);
            stage = next;
        }
        assert_eq!(seen, FunnelStage::ALL);
        assert_eq!(FunnelStage::Results.next(), None);
    }

    #[test]
    fn test_positions_are_ordered() {
        for pair in FunnelStage::ALL.windows(2) {
            assert!(pair[0].position() < pair[1].position());
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_forward_walk_is_recorded() {
        let mut machine = StageMachine::new();
        machine.goto(FunnelStage::PainResearch, Some("run"));
        machine.goto(FunnelStage::MarketAnalysis, Some("run"));
        machine.goto(FunnelStage::Results, None);

        assert_eq!(machine.current(), FunnelStage::Results);
        assert_eq!(machine.navigations().len(), 3);
        assert_eq!(machine.navigations()[0].from, FunnelStage::Input);
        assert_eq!(machine.navigations()[0].to, FunnelStage::PainResearch);
        assert_eq!(machine.navigations()[0].reason.as_deref(), Some("run"));
    }

    #[test]
    fn test_backward_jump_is_free() {
        let mut machine = StageMachine::new();
        machine.goto(FunnelStage::Survey, None);
        machine.goto(FunnelStage::PainResearch, Some("revisit"));
        assert_eq!(machine.current(), FunnelStage::PainResearch);
    }

    #[test]
    fn test_forward_jump_is_free() {
        // Kill verdicts never block navigation; neither does skipping.
        let mut machine = StageMachine::new();
        machine.goto(FunnelStage::Results, Some("peek at summary"));
        assert_eq!(machine.current(), FunnelStage::Results);
    }

    #[test]
    fn test_visited_tracking() {
        let mut machine = StageMachine::new();
        assert!(machine.visited(FunnelStage::Input));
        assert!(!machine.visited(FunnelStage::Survey));

        machine.goto(FunnelStage::PainResearch, None);
        machine.goto(FunnelStage::MarketAnalysis, None);
        machine.goto(FunnelStage::PainResearch, None);

        assert!(machine.visited(FunnelStage::PainResearch));
        assert!(machine.visited(FunnelStage::MarketAnalysis));
        assert!(!machine.visited(FunnelStage::ContentGeneration));
    }

    #[test]
    fn test_required_upstream_chain() {
        assert_eq!(FunnelStage::PainResearch.required_upstream(), None);
        assert_eq!(
            FunnelStage::MarketAnalysis.required_upstream(),
            Some(FunnelStage::PainResearch)
        );
        assert_eq!(
            FunnelStage::Survey.required_upstream(),
            Some(FunnelStage::ContentGeneration)
        );
        assert_eq!(FunnelStage::Results.required_upstream(), None);
    }

    #[test]
    fn test_stage_display_and_label() {
        assert_eq!(FunnelStage::PainResearch.to_string(), "pain_research");
        assert_eq!(FunnelStage::PainResearch.label(), "pain research");
        assert_eq!(FunnelStage::ContentGeneration.label(), "content generation");
    }

    #[test]
    fn test_stage_serde_roundtrip() {
        for stage in FunnelStage::ALL {
            let json = serde_json::to_string(&stage).unwrap();
            let restored: FunnelStage = serde_json::from_str(&json).unwrap();
            assert_eq!(restored, stage);
        }
        assert_eq!(
            serde_json::to_string(&FunnelStage::MarketAnalysis).unwrap(),
            "\"market_analysis\""
        );
    }

    #[test]
    fn test_navigation_record_serde_roundtrip() {
        let record = NavigationRecord {
            from: FunnelStage::PainResearch,
            to: FunnelStage::MarketAnalysis,
            elapsed_ms: 1234,
            reason: Some("run".into()),
        };
        let json = serde_json::to_string(&record).unwrap();
        let restored: NavigationRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.from, FunnelStage::PainResearch);
        assert_eq!(restored.to, FunnelStage::MarketAnalysis);
        assert_eq!(restored.elapsed_ms, 1234);
    }

    #[test]
    fn test_summary() {
        let mut machine = StageMachine::new();
        machine.goto(FunnelStage::PainResearch, None);
        machine.goto(FunnelStage::Results, None);
        let summary = machine.summary();
        assert!(summary.contains("input → pain_research → results"));
        assert!(summary.contains("2 moves"));
    }
}
