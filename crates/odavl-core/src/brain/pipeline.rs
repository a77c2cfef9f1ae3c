//! The decision pipeline ("Brain").
//!
//! `Idle -> RunningAnalysis -> RunningRemediation -> RunningVerification ->
//! Fusing -> Done`, with `Failed` reachable from any running state. Skipped
//! stages are not entered; their results are empty placeholders.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, Instrument};
use uuid::Uuid;

use super::config::BrainConfig;
use super::fusion::{fuse, FusionInputs};
use super::report::PipelineReport;
use crate::baseline::{Baseline, BaselineStore};
use crate::domain::{
    AnalysisRequest, AutopilotResult, GuardianReport, InsightResult, OdavlError, Result,
};
use crate::jsonl;
use crate::memory::{Correction, MemoryEntry, PatternQuery};
use crate::metrics::METRICS;
use crate::obs;
use crate::protocol::{AnalysisProtocol, PatternMemoryProtocol};
use crate::registry::{AdapterRegistry, REMEDIATION_PROTOCOL, VERIFICATION_PROTOCOL};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    RunningAnalysis,
    RunningRemediation,
    RunningVerification,
    Fusing,
    Done,
    Failed,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::RunningAnalysis => "running_analysis",
            Self::RunningRemediation => "running_remediation",
            Self::RunningVerification => "running_verification",
            Self::Fusing => "fusing",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: PipelineState,
    pub to: PipelineState,
    pub at: DateTime<Utc>,
}

/// One line of the per-cycle telemetry stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryRecord {
    pub cycle_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub workspace: String,
    pub launch_score: f64,
    pub ready_for_release: bool,
    pub total_issues: usize,
    pub new_issues: usize,
    pub fixes_applied: usize,
    pub tests_passed: u32,
    pub tests_failed: u32,
    pub duration_ms: u64,
}

impl TelemetryRecord {
    fn from_report(cycle_id: Uuid, workspace: &Path, report: &PipelineReport) -> Self {
        Self {
            cycle_id,
            timestamp: Utc::now(),
            workspace: workspace.display().to_string(),
            launch_score: report.launch_score,
            ready_for_release: report.ready_for_release,
            total_issues: report.metrics.total_issues,
            new_issues: report.metrics.new_issues,
            fixes_applied: report.metrics.fixes_applied,
            tests_passed: report.metrics.tests_passed,
            tests_failed: report.metrics.tests_failed,
            duration_ms: report.total_duration_ms,
        }
    }
}

/// Runs one detection/remediation/verification cycle and fuses the result.
pub struct DecisionPipeline {
    registry: Arc<AdapterRegistry>,
    analysis: Arc<AnalysisProtocol>,
    memory: Arc<PatternMemoryProtocol>,
    config: BrainConfig,
    state: PipelineState,
    transitions: Vec<StateTransition>,
    cycle_id: Uuid,
}

impl DecisionPipeline {
    pub fn new(
        registry: Arc<AdapterRegistry>,
        analysis: Arc<AnalysisProtocol>,
        memory: Arc<PatternMemoryProtocol>,
        config: BrainConfig,
    ) -> Self {
        Self {
            registry,
            analysis,
            memory,
            config,
            state: PipelineState::Idle,
            transitions: Vec::new(),
            cycle_id: Uuid::nil(),
        }
    }

    pub fn config(&self) -> &BrainConfig {
        &self.config
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Transitions of the most recent cycle.
    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    fn transition(&mut self, to: PipelineState) {
        let from = self.state;
        obs::emit_transition(&self.cycle_id.to_string(), from.as_str(), to.as_str());
        self.transitions.push(StateTransition {
            from,
            to,
            at: Utc::now(),
        });
        self.state = to;
    }

    fn fail(&mut self, err: OdavlError) -> OdavlError {
        obs::emit_pipeline_failed(&self.cycle_id.to_string(), &err);
        self.transition(PipelineState::Failed);
        err
    }

    /// Run a full cycle for `request`. Always ends in `Done` or `Failed`.
    pub async fn run(&mut self, request: &AnalysisRequest) -> Result<PipelineReport> {
        self.cycle_id = Uuid::new_v4();
        self.state = PipelineState::Idle;
        self.transitions.clear();
        METRICS.inc_pipeline_runs();

        let span = obs::cycle_span(
            &self.cycle_id.to_string(),
            &request.workspace.display().to_string(),
        );
        let outcome = self.run_stages(request).instrument(span).await;
        match outcome {
            Ok(report) => Ok(report),
            Err(err) => Err(self.fail(err)),
        }
    }

    async fn run_stages(&mut self, request: &AnalysisRequest) -> Result<PipelineReport> {
        self.transition(PipelineState::RunningAnalysis);
        let insight = self.analysis.request_analysis(request).await?;

        let autopilot = if self.config.skip_autopilot {
            info!("remediation skipped by configuration");
            AutopilotResult::skipped()
        } else {
            self.transition(PipelineState::RunningRemediation);
            self.remediate(&insight).await?
        };

        let guardian = if self.config.skip_guardian {
            info!("verification skipped by configuration");
            GuardianReport::skipped()
        } else {
            self.transition(PipelineState::RunningVerification);
            self.verify(request, &autopilot).await?
        };

        self.transition(PipelineState::Fusing);
        let baseline = self.load_baseline(&request.workspace).await?;
        let memory = self.query_memory(&insight).await;
        let inputs = FusionInputs {
            workspace: Some(request.workspace.clone()),
            insight,
            autopilot,
            guardian,
            baseline,
            memory,
        };
        let report = fuse(&inputs, &self.config);

        if self.config.learn_from_outcomes {
            self.write_back(&report).await;
        }
        if let Some(path) = self.config.telemetry_path_in(&request.workspace) {
            let record = TelemetryRecord::from_report(self.cycle_id, &request.workspace, &report);
            if let Err(e) = jsonl::append(&path, &record).await {
                obs::emit_best_effort_failure("telemetry", &e);
            }
        }

        self.transition(PipelineState::Done);
        obs::emit_pipeline_finished(
            &self.cycle_id.to_string(),
            report.launch_score,
            report.ready_for_release,
            report.total_duration_ms,
        );
        METRICS.flush();
        Ok(report)
    }

    async fn remediate(&self, insight: &InsightResult) -> Result<AutopilotResult> {
        let adapter = self.registry.remediation().ensure()?;
        METRICS.inc_adapter_invocations();
        adapter
            .remediate(insight)
            .await
            .map_err(|e| OdavlError::adapter_failed(REMEDIATION_PROTOCOL, &e))
    }

    async fn verify(
        &self,
        request: &AnalysisRequest,
        autopilot: &AutopilotResult,
    ) -> Result<GuardianReport> {
        let adapter = self.registry.verification().ensure()?;
        METRICS.inc_adapter_invocations();
        adapter
            .verify(request, autopilot)
            .await
            .map_err(|e| OdavlError::adapter_failed(VERIFICATION_PROTOCOL, &e))
    }

    /// A missing baseline is "no baseline"; any other failure is fatal.
    async fn load_baseline(&self, workspace: &Path) -> Result<Option<Baseline>> {
        let store = BaselineStore::new(workspace);
        match store.load(&self.config.baseline).await {
            Ok(baseline) => Ok(Some(baseline)),
            Err(OdavlError::BaselineNotFound { name }) => {
                info!(baseline = %name, "no baseline; every issue counts as new");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn query_memory(&self, insight: &InsightResult) -> Vec<MemoryEntry> {
        let types: BTreeSet<&str> = insight.issues.iter().map(|i| i.issue_type.as_str()).collect();
        if types.is_empty() {
            return Vec::new();
        }
        match self.memory.query(&PatternQuery::for_types(types)).await {
            Ok(result) => result.entries,
            Err(e) => {
                obs::emit_best_effort_failure("pattern_memory.query", &e);
                Vec::new()
            }
        }
    }

    /// Record one correction per applied fix. Skipped when there is no
    /// verification evidence.
    async fn write_back(&self, report: &PipelineReport) {
        if report.autopilot.skipped || report.autopilot.fixes.is_empty() {
            return;
        }
        if report.guardian.stage_skipped {
            return;
        }
        let success = report.guardian.failed == 0 && report.guardian.launch_ready;
        let confidence = report.launch_score / 100.0;

        for fix in &report.autopilot.fixes {
            let correction = Correction {
                error_type: fix.fix_type.clone(),
                fix: Some(fix.description.clone()),
                success,
                confidence,
            };
            if let Err(e) = self.memory.learn_from_correction(correction).await {
                obs::emit_best_effort_failure("pattern_memory.learn", &e);
                return;
            }
        }
        if let Err(e) = self.memory.flush().await {
            obs::emit_best_effort_failure("pattern_memory.flush", &e);
        }
    }
}
