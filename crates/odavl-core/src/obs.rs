//! Structured observability hooks for ODAVL lifecycle events.
//!
//! This module provides:
//! - Cycle-scoped tracing spans via `PipelineSpan` RAII guard
//! - Emission functions for analysis requests, cache outcomes, pipeline
//!   transitions, memory rotation and best-effort failures
//!
//! Events are emitted at `info!` level unless noted otherwise. Filtering and
//! JSON output are configured through [`crate::telemetry::init_tracing`].

use tracing::{info, warn};

/// RAII guard that enters a cycle-scoped tracing span for one pipeline run.
///
/// # Example
///
/// ```ignore
/// let _span = PipelineSpan::enter("2f1c...", "/repo");
/// // All tracing calls are now associated with this cycle.
/// ```
pub struct PipelineSpan {
    _span: tracing::span::EnteredSpan,
}

impl PipelineSpan {
    pub fn enter(cycle_id: &str, workspace: &str) -> Self {
        Self {
            _span: cycle_span(cycle_id, workspace).entered(),
        }
    }
}

/// Cycle span for async code, attached with `tracing::Instrument`.
pub fn cycle_span(cycle_id: &str, workspace: &str) -> tracing::Span {
    tracing::info_span!("odavl.cycle", cycle_id = %cycle_id, workspace = %workspace)
}

/// Emit event: analysis requested through the protocol façade.
pub fn emit_analysis_requested(call_id: &str, workspace: &str, detectors: usize) {
    info!(
        event = "analysis.requested",
        call_id = %call_id,
        workspace = %workspace,
        detectors = detectors,
    );
}

pub fn emit_cache_hit(namespace: &str, key: &str) {
    tracing::debug!(event = "cache.hit", namespace = %namespace, key = %short(key));
}

pub fn emit_cache_miss(namespace: &str, key: &str) {
    tracing::debug!(event = "cache.miss", namespace = %namespace, key = %short(key));
}

/// Emit event: pipeline moved between states.
pub fn emit_transition(cycle_id: &str, from: &str, to: &str) {
    info!(event = "pipeline.transition", cycle_id = %cycle_id, from = %from, to = %to);
}

/// Emit event: pipeline cycle finished with score and decision.
pub fn emit_pipeline_finished(cycle_id: &str, launch_score: f64, ready: bool, duration_ms: u64) {
    info!(
        event = "pipeline.finished",
        cycle_id = %cycle_id,
        launch_score = launch_score,
        ready_for_release = ready,
        duration_ms = duration_ms,
    );
}

/// Emit event: pipeline terminated in the `Failed` state (warning level).
pub fn emit_pipeline_failed(cycle_id: &str, error: &dyn std::fmt::Display) {
    warn!(event = "pipeline.failed", cycle_id = %cycle_id, error = %error);
}

/// Emit event: memory file rotated to stay under its byte budget.
pub fn emit_memory_rotated(before: usize, after: usize, bytes: usize) {
    info!(
        event = "memory.rotated",
        entries_before = before,
        entries_after = after,
        bytes = bytes,
    );
}

/// Emit event: an optional subsystem failed and the primary flow continued.
pub fn emit_best_effort_failure(subsystem: &str, error: &dyn std::fmt::Display) {
    warn!(event = "best_effort.failed", subsystem = %subsystem, error = %error);
}

fn short(key: &str) -> &str {
    &key[..12.min(key.len())]
}
