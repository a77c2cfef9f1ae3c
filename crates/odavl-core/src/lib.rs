//! ODAVL decision core.
//!
//! Connects the detection (Insight), remediation (Autopilot) and verification
//! (Guardian) stages through typed adapters and fuses their outputs into one
//! explainable deploy decision.
//!
//! Construction order at process start:
//!
//! ```no_run
//! use std::sync::Arc;
//! use odavl_core::{
//!     AdapterRegistry, AnalysisProtocol, BrainConfig, DecisionPipeline, FilePatternMemory,
//!     GlobalCache, MemoryManager, PatternMemoryProtocol,
//! };
//! use odavl_core::fakes::{CountingAnalysisAdapter, StaticRemediationAdapter, StaticVerificationAdapter};
//!
//! # async fn bootstrap(workspace: &std::path::Path) -> odavl_core::Result<()> {
//! let registry = AdapterRegistry::builder()
//!     .with_analysis(Arc::new(CountingAnalysisAdapter::default()))
//!     .with_remediation(Arc::new(StaticRemediationAdapter::default()))
//!     .with_verification(Arc::new(StaticVerificationAdapter::default()))
//!     .with_pattern_memory(Arc::new(FilePatternMemory::new(MemoryManager::for_workspace(workspace))))
//!     .bootstrap()
//!     .await?;
//! let analysis = Arc::new(AnalysisProtocol::new(registry.clone(), Arc::new(GlobalCache::new())));
//! let memory = Arc::new(PatternMemoryProtocol::new(registry.clone()));
//! let config = BrainConfig::from_workspace(workspace)?;
//! let mut pipeline = DecisionPipeline::new(registry, analysis, memory, config);
//! # let _ = &mut pipeline;
//! # Ok(())
//! # }
//! ```

pub mod baseline;
pub mod brain;
pub mod cache;
pub mod domain;
pub mod fakes;
pub mod fingerprint;
pub mod git;
pub mod jsonl;
pub mod memory;
pub mod metrics;
pub mod obs;
pub mod protocol;
pub mod registry;
pub mod storage;
pub mod telemetry;

pub use baseline::{
    count_by_severity, Baseline, BaselineDiff, BaselineMatcher, BaselineMeta, BaselineMetadata,
    BaselineStore, DiffSummary, DEFAULT_BASELINE,
};
pub use brain::{
    fuse, render_report_md, BrainConfig, DecisionPipeline, DecisionPolicy, DeployCondition,
    FusedMetrics, FusionInputs, FusionWeights, PipelineReport, PipelineState, ScoreFactor,
    StateTransition, TelemetryRecord,
};
pub use cache::{cache_key, CacheStats, GlobalCache};
pub use domain::{
    AnalysisOptions, AnalysisRequest, AutopilotResult, Fix, GuardianReport, InsightResult, Issue,
    OdavlError, Result, Severity, SeverityCounts, TestResult, TestStatus,
};
pub use fingerprint::{fingerprint, normalize_message, Fingerprint, FingerprintEngine};
pub use git::{head_commit, short_sha};
pub use memory::{
    Correction, FilePatternMemory, MemoryConfig, MemoryEntry, MemoryError, MemoryManager,
    PatternQuery, PatternQueryResult,
};
pub use protocol::{
    AnalysisAdapter, AnalysisProtocol, EventHandler, PatternMemoryAdapter, PatternMemoryProtocol,
    ProtocolEvent, ProtocolEventBus, ProtocolEventKind, RemediationAdapter, VerificationAdapter,
};
pub use registry::{AdapterRegistry, AdapterSlot, RegistryBuilder};
pub use telemetry::init_tracing;

/// Crate version, kept in lockstep with the workspace version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
