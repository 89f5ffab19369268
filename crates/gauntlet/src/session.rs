//! A validation session — one idea, one navigation history, one ledger.
//!
//! The session owns everything that accumulates while an idea moves through
//! the funnel: the problem/audience inputs, the stage machine, the per-stage
//! results, and the cost ledger. It enforces the *execution* ordering (a
//! stage can only run once its upstream stage has produced output) while
//! leaving *navigation* completely free — a killed stage's result is data,
//! not a barrier.

use chrono::{DateTime, Utc};

use crate::error::FunnelError;
use crate::ledger::{CostLedger, CostSnapshot};
use crate::stages::{
    ContentOutput, MarketOutput, PainResearchOutput, StageResult, SurveyOutput,
};
use crate::state_machine::{FunnelStage, NavigationRecord, StageMachine};

/// Type-erased view of one stored stage result, for summaries and probes
/// that do not care about the stage's concrete output.
#[derive(Debug, Clone, Copy)]
pub struct StoredVerdict<'a> {
    pub stage: FunnelStage,
    pub killed: bool,
    pub reason: Option<&'a str>,
    pub cost: f64,
}

pub struct PipelineSession {
    problem_description: String,
    target_audience: String,
    machine: StageMachine,
    ledger: CostLedger,
    started_at: DateTime<Utc>,
    pain: Option<StageResult<PainResearchOutput>>,
    market: Option<StageResult<MarketOutput>>,
    content: Option<StageResult<ContentOutput>>,
    survey: Option<StageResult<SurveyOutput>>,
}

impl PipelineSession {
    pub fn new(problem_description: impl Into<String>, target_audience: impl Into<String>) -> Self {
        Self {
            problem_description: problem_description.into(),
            target_audience: target_audience.into(),
            machine: StageMachine::new(),
            ledger: CostLedger::new(),
            started_at: Utc::now(),
            pain: None,
            market: None,
            content: None,
            survey: None,
        }
    }

    pub fn problem_description(&self) -> &str {
        &self.problem_description
    }

    pub fn target_audience(&self) -> &str {
        &self.target_audience
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn current_stage(&self) -> FunnelStage {
        self.machine.current()
    }

    /// Navigate to any stage. Always legal; recorded in the audit log.
    pub fn goto(&mut self, stage: FunnelStage, reason: Option<&str>) {
        self.machine.goto(stage, reason);
    }

    pub fn navigations(&self) -> &[NavigationRecord] {
        self.machine.navigations()
    }

    pub fn navigation_summary(&self) -> String {
        self.machine.summary()
    }

    pub fn ledger(&self) -> &CostLedger {
        &self.ledger
    }

    pub(crate) fn ledger_mut(&mut self) -> &mut CostLedger {
        &mut self.ledger
    }

    pub fn total_cost(&self) -> f64 {
        self.ledger.total()
    }

    pub fn cost_snapshot(&self) -> CostSnapshot {
        self.ledger.snapshot()
    }

    /// Check that `stage` may execute right now. Navigation is never the
    /// issue — this guards the data dependency between stages.
    pub fn can_run(&self, stage: FunnelStage) -> Result<(), FunnelError> {
        if !FunnelStage::EXECUTABLE.contains(&stage) {
            return Err(FunnelError::NotExecutable(stage));
        }
        if let Some(requires) = stage.required_upstream() {
            if !self.has_output(requires) {
                return Err(FunnelError::MissingUpstream { stage, requires });
            }
        }
        Ok(())
    }

    /// Whether `stage` has a stored result. A killed result counts: the
    /// downstream stage reads its partial output, kill or not.
    pub fn has_output(&self, stage: FunnelStage) -> bool {
        self.stored(stage).is_some()
    }

    pub fn stored(&self, stage: FunnelStage) -> Option<StoredVerdict<'_>> {
        fn view<T>(result: &StageResult<T>) -> StoredVerdict<'_> {
            StoredVerdict {
                stage: result.stage,
                killed: result.killed,
                reason: result.reason(),
                cost: result.cost_incurred,
            }
        }

        match stage {
            FunnelStage::PainResearch => self.pain.as_ref().map(view),
            FunnelStage::MarketAnalysis => self.market.as_ref().map(view),
            FunnelStage::ContentGeneration => self.content.as_ref().map(view),
            FunnelStage::Survey => self.survey.as_ref().map(view),
            FunnelStage::Input | FunnelStage::Results => None,
        }
    }

    pub fn pain(&self) -> Option<&StageResult<PainResearchOutput>> {
        self.pain.as_ref()
    }

    pub fn market(&self) -> Option<&StageResult<MarketOutput>> {
        self.market.as_ref()
    }

    pub fn content(&self) -> Option<&StageResult<ContentOutput>> {
        self.content.as_ref()
    }

    pub fn survey(&self) -> Option<&StageResult<SurveyOutput>> {
        self.survey.as_ref()
    }

    pub(crate) fn store_pain(&mut self, result: StageResult<PainResearchOutput>) {
        self.pain = Some(result);
    }

    pub(crate) fn store_market(&mut self, result: StageResult<MarketOutput>) {
        self.market = Some(result);
    }

    pub(crate) fn store_content(&mut self, result: StageResult<ContentOutput>) {
        self.content = Some(result);
    }

    pub(crate) fn store_survey(&mut self, result: StageResult<SurveyOutput>) {
        self.survey = Some(result);
    }

    /// Whether any executed stage recorded a kill verdict.
    pub fn any_killed(&self) -> bool {
        FunnelStage::EXECUTABLE
            .iter()
            .filter_map(|stage| self.stored(*stage))
            .any(|stored| stored.killed)
    }

    /// Start over with the same idea: results, costs, and navigation history
    /// are discarded and the session returns to the input stage.
    pub fn restart(&mut self) {
        tracing::info!(
            discarded_cost = self.ledger.total(),
            path = %self.machine.summary(),
            "Session restarted"
        );
        self.machine = StageMachine::new();
        self.ledger = CostLedger::new();
        self.started_at = Utc::now();
        self.pain = None;
        self.market = None;
        self.content = None;
        self.survey = None;
    }
}
