//! The funnel driver — runs stages against a session and aggregates the
//! final summary.
//!
//! `Funnel` owns the configuration, the collaborator clients, and the
//! progress sink; sessions stay outside it so one funnel can serve several
//! ideas in sequence. `run_stage` is the single execution entry point: it
//! checks the data dependency, records the navigation, runs the stage, and
//! stores the result. `run_all` walks the four executable stages in
//! canonical order and finishes on the results summary.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::clients::ClientSet;
use crate::config::FunnelConfig;
use crate::error::FunnelError;
use crate::ledger::CostSnapshot;
use crate::progress::{NullProgress, ProgressSink};
use crate::session::PipelineSession;
use crate::stages::{content_gen, market_analysis, pain_research, survey};
use crate::state_machine::FunnelStage;

pub struct Funnel {
    config: FunnelConfig,
    clients: ClientSet,
    progress: Arc<dyn ProgressSink>,
}

impl Funnel {
    pub fn new(config: FunnelConfig, clients: ClientSet) -> Self {
        Self {
            config,
            clients,
            progress: Arc::new(NullProgress),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &FunnelConfig {
        &self.config
    }

    pub fn start_session(
        &self,
        problem_description: impl Into<String>,
        target_audience: impl Into<String>,
    ) -> PipelineSession {
        let session = PipelineSession::new(problem_description, target_audience);
        tracing::info!(
            problem = session.problem_description(),
            audience = session.target_audience(),
            "Session started"
        );
        session
    }

    /// Run one stage. Fails only when the stage is not executable or its
    /// upstream data is missing; collaborator failures are absorbed into a
    /// killed result, not returned here.
    pub async fn run_stage(
        &self,
        session: &mut PipelineSession,
        stage: FunnelStage,
    ) -> Result<StageVerdict, FunnelError> {
        session.can_run(stage)?;
        session.goto(stage, Some("execute"));

        // Owned copies so the ledger can be borrowed mutably during the run.
        let problem = session.problem_description().to_string();
        let audience = session.target_audience().to_string();
        let progress = self.progress.as_ref();

        match stage {
            FunnelStage::PainResearch => {
                let result = pain_research::run(
                    &self.config,
                    &self.clients,
                    progress,
                    session.ledger_mut(),
                    &problem,
                    &audience,
                )
                .await;
                session.store_pain(result);
            }
            FunnelStage::MarketAnalysis => {
                let result = market_analysis::run(
                    &self.config,
                    &self.clients,
                    progress,
                    session.ledger_mut(),
                    &problem,
                    &audience,
                )
                .await;
                session.store_market(result);
            }
            FunnelStage::ContentGeneration => {
                let themes = pain_themes(session);
                let gaps = market_gaps(session);
                let result = content_gen::run(
                    &self.config,
                    &self.clients,
                    progress,
                    session.ledger_mut(),
                    &problem,
                    &audience,
                    &themes,
                    &gaps,
                )
                .await;
                session.store_content(result);
            }
            FunnelStage::Survey => {
                let headline = session
                    .content()
                    .map(|r| r.output.headline().to_string())
                    .unwrap_or_default();
                let result = survey::run(
                    &self.config,
                    &self.clients,
                    progress,
                    session.ledger_mut(),
                    &problem,
                    &audience,
                    &headline,
                )
                .await;
                session.store_survey(result);
            }
            // can_run already rejected these.
            FunnelStage::Input | FunnelStage::Results => {
                return Err(FunnelError::NotExecutable(stage));
            }
        }

        let verdict = StageVerdict::for_stage(session, stage);
        tracing::info!(
            %stage,
            killed = verdict.killed,
            cost = verdict.cost,
            "Stage finished"
        );
        Ok(verdict)
    }

    /// Run the whole funnel in canonical order and land on the results
    /// summary. A kill only stops the walk when `stop_on_kill` is set;
    /// otherwise later stages still run so the summary covers all four.
    pub async fn run_all(&self, session: &mut PipelineSession) -> FunnelSummary {
        for stage in FunnelStage::EXECUTABLE {
            let verdict = match self.run_stage(session, stage).await {
                Ok(verdict) => verdict,
                Err(err) => {
                    tracing::error!(%stage, error = %err, "Stage refused to run; stopping");
                    break;
                }
            };
            if verdict.killed && self.config.stop_on_kill {
                tracing::info!(%stage, "Kill verdict with stop_on_kill set; stopping early");
                break;
            }
        }

        session.goto(FunnelStage::Results, Some("summary"));
        self.summarize(session)
    }

    /// Aggregate the session into the results summary. Valid at any point;
    /// stages that have not run appear as not-executed rows.
    pub fn summarize(&self, session: &PipelineSession) -> FunnelSummary {
        let stages: Vec<StageVerdict> = FunnelStage::EXECUTABLE
            .iter()
            .map(|stage| StageVerdict::for_stage(session, *stage))
            .collect();

        let first_kill = stages.iter().find(|v| v.killed);
        let executed = stages.iter().filter(|v| v.executed).count();

        let (overall_go, recommendation) = match first_kill {
            Some(verdict) => (
                false,
                format!(
                    "NO-GO (killed at {}): {}",
                    verdict.stage.label(),
                    verdict.reason.as_deref().unwrap_or("no reason recorded")
                ),
            ),
            None if executed == FunnelStage::EXECUTABLE.len() => {
                (true, "GO: all validation gates passed".to_string())
            }
            None => (
                false,
                format!(
                    "INCOMPLETE: {executed} of {} stages run, no kill so far",
                    FunnelStage::EXECUTABLE.len()
                ),
            ),
        };

        FunnelSummary {
            problem: session.problem_description().to_string(),
            audience: session.target_audience().to_string(),
            stages,
            overall_go,
            recommendation,
            costs: session.cost_snapshot(),
        }
    }
}

/// One row of the results table.
#[derive(Debug, Clone, Serialize)]
pub struct StageVerdict {
    pub stage: FunnelStage,
    pub executed: bool,
    pub killed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub cost: f64,
}

impl StageVerdict {
    fn for_stage(session: &PipelineSession, stage: FunnelStage) -> Self {
        match session.stored(stage) {
            Some(stored) => Self {
                stage,
                executed: true,
                killed: stored.killed,
                reason: stored.reason.map(String::from),
                cost: stored.cost,
            },
            None => Self {
                stage,
                executed: false,
                killed: false,
                reason: None,
                cost: 0.0,
            },
        }
    }
}

/// Final aggregation of a session: verdict table, GO / NO-GO, costs.
#[derive(Debug, Clone, Serialize)]
pub struct FunnelSummary {
    pub problem: String,
    pub audience: String,
    pub stages: Vec<StageVerdict>,
    /// True only when all four stages ran and none killed.
    pub overall_go: bool,
    pub recommendation: String,
    pub costs: CostSnapshot,
}

impl fmt::Display for FunnelSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Idea: {}", self.problem)?;
        writeln!(f, "Audience: {}", self.audience)?;
        writeln!(f)?;
        writeln!(f, "{:<20} {:<10} {:>9}  reason", "stage", "verdict", "cost")?;
        for verdict in &self.stages {
            let outcome = if !verdict.executed {
                "skipped"
            } else if verdict.killed {
                "KILL"
            } else {
                "pass"
            };
            writeln!(
                f,
                "{:<20} {:<10} {:>9.4}  {}",
                verdict.stage.to_string(),
                outcome,
                verdict.cost,
                verdict.reason.as_deref().unwrap_or("-")
            )?;
        }
        writeln!(f)?;
        writeln!(f, "Total cost: ${:.4}", self.costs.total)?;
        write!(f, "{}", self.recommendation)
    }
}

fn pain_themes(session: &PipelineSession) -> Vec<String> {
    session
        .pain()
        .and_then(|r| r.output.analysis.as_ref())
        .map(|a| a.key_themes.clone())
        .unwrap_or_default()
}

fn market_gaps(session: &PipelineSession) -> Vec<String> {
    session
        .market()
        .and_then(|r| r.output.assessment.as_ref())
        .map(|a| a.market_gaps.clone())
        .unwrap_or_default()
}
