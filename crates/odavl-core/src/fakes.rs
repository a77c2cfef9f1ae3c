//! In-memory adapters for tests and downstream integration harnesses.
//!
//! Provides `CountingAnalysisAdapter`, `StaticRemediationAdapter`,
//! `StaticVerificationAdapter`, `InMemoryPatternMemory` and `FailingAdapter`
//! that satisfy the adapter contracts without touching the filesystem.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::{AnalysisRequest, AutopilotResult, GuardianReport, InsightResult, Issue};
use crate::memory::{
    apply_correction, Correction, MemoryEntry, PatternQuery, PatternQueryResult,
};
use crate::protocol::adapters::{
    AnalysisAdapter, PatternMemoryAdapter, RemediationAdapter, VerificationAdapter,
};

// ---------------------------------------------------------------------------
// CountingAnalysisAdapter
// ---------------------------------------------------------------------------

/// Returns a fixed issue list and counts real invocations.
#[derive(Debug, Default)]
pub struct CountingAnalysisAdapter {
    issues: Mutex<Vec<Issue>>,
    calls: AtomicUsize,
    initialized: AtomicBool,
}

impl CountingAnalysisAdapter {
    pub fn new(issues: Vec<Issue>) -> Self {
        Self {
            issues: Mutex::new(issues),
            ..Self::default()
        }
    }

    /// Replace the issues returned by subsequent calls.
    pub fn set_issues(&self, issues: Vec<Issue>) {
        *self.issues.lock().unwrap_or_else(|p| p.into_inner()) = issues;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn was_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisAdapter for CountingAnalysisAdapter {
    async fn initialize(&self) -> anyhow::Result<()> {
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn analyze(&self, request: &AnalysisRequest) -> anyhow::Result<InsightResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let issues = self.issues.lock().unwrap_or_else(|p| p.into_inner()).clone();
        let files = issues
            .iter()
            .map(|i| i.file.as_str())
            .collect::<std::collections::BTreeSet<_>>()
            .len() as u32;
        Ok(InsightResult {
            issues,
            files_analyzed: files,
            detectors: request.normalized_detectors(),
            duration_ms: 5,
        })
    }
}

// ---------------------------------------------------------------------------
// StaticRemediationAdapter / StaticVerificationAdapter
// ---------------------------------------------------------------------------

/// Returns a fixed remediation result.
#[derive(Debug, Default)]
pub struct StaticRemediationAdapter {
    result: AutopilotResult,
    calls: AtomicUsize,
}

impl StaticRemediationAdapter {
    pub fn new(result: AutopilotResult) -> Self {
        Self {
            result,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemediationAdapter for StaticRemediationAdapter {
    async fn remediate(&self, _insight: &InsightResult) -> anyhow::Result<AutopilotResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.result.clone())
    }
}

/// Returns a fixed verification report.
#[derive(Debug, Default)]
pub struct StaticVerificationAdapter {
    report: GuardianReport,
    calls: AtomicUsize,
}

impl StaticVerificationAdapter {
    pub fn new(report: GuardianReport) -> Self {
        Self {
            report,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VerificationAdapter for StaticVerificationAdapter {
    async fn verify(
        &self,
        _request: &AnalysisRequest,
        _autopilot: &AutopilotResult,
    ) -> anyhow::Result<GuardianReport> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.report.clone())
    }
}

// ---------------------------------------------------------------------------
// InMemoryPatternMemory
// ---------------------------------------------------------------------------

/// Pattern memory held in a `Vec`, applying corrections immediately.
#[derive(Debug, Default)]
pub struct InMemoryPatternMemory {
    entries: Mutex<Vec<MemoryEntry>>,
    flushes: AtomicUsize,
}

impl InMemoryPatternMemory {
    pub fn with_entries(entries: Vec<MemoryEntry>) -> Self {
        Self {
            entries: Mutex::new(entries),
            flushes: AtomicUsize::new(0),
        }
    }

    pub fn entries(&self) -> Vec<MemoryEntry> {
        self.entries.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn flushes(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PatternMemoryAdapter for InMemoryPatternMemory {
    async fn query(&self, query: &PatternQuery) -> anyhow::Result<PatternQueryResult> {
        let entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        Ok(PatternQueryResult {
            entries: query.apply(entries.iter()),
        })
    }

    async fn learn_from_correction(&self, correction: Correction) -> anyhow::Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        apply_correction(&mut entries, &correction, Utc::now());
        Ok(())
    }

    async fn flush(&self) -> anyhow::Result<()> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FailingAdapter
// ---------------------------------------------------------------------------

/// Fails every operation of every adapter trait with `message`.
#[derive(Debug, Clone)]
pub struct FailingAdapter {
    message: String,
}

impl FailingAdapter {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    fn err(&self) -> anyhow::Error {
        anyhow::anyhow!("{}", self.message)
    }
}

#[async_trait]
impl AnalysisAdapter for FailingAdapter {
    async fn analyze(&self, _request: &AnalysisRequest) -> anyhow::Result<InsightResult> {
        Err(self.err())
    }
}

#[async_trait]
impl RemediationAdapter for FailingAdapter {
    async fn remediate(&self, _insight: &InsightResult) -> anyhow::Result<AutopilotResult> {
        Err(self.err())
    }
}

#[async_trait]
impl VerificationAdapter for FailingAdapter {
    async fn verify(
        &self,
        _request: &AnalysisRequest,
        _autopilot: &AutopilotResult,
    ) -> anyhow::Result<GuardianReport> {
        Err(self.err())
    }
}

#[async_trait]
impl PatternMemoryAdapter for FailingAdapter {
    async fn query(&self, _query: &PatternQuery) -> anyhow::Result<PatternQueryResult> {
        Err(self.err())
    }

    async fn learn_from_correction(&self, _correction: Correction) -> anyhow::Result<()> {
        Err(self.err())
    }

    async fn flush(&self) -> anyhow::Result<()> {
        Err(self.err())
    }
}
