//! Decision layer: configuration, policy, fusion, pipeline and reporting.

pub mod config;
pub mod fusion;
pub mod pipeline;
pub mod policy;
pub mod report;

pub use config::BrainConfig;
pub use fusion::{fuse, FusedMetrics, FusionInputs, FusionWeights, ScoreFactor};
pub use pipeline::{DecisionPipeline, PipelineState, StateTransition, TelemetryRecord};
pub use policy::{DecisionPolicy, DeployCondition};
pub use report::{render_report_md, PipelineReport};
