//! Baselines: named snapshots of accepted issues and the diff against them.

pub mod matcher;
pub mod store;

pub use matcher::{count_by_severity, BaselineDiff, BaselineMatcher, DiffSummary};
pub use store::{
    validate_name, Baseline, BaselineMeta, BaselineMetadata, BaselineStore, BASELINE_VERSION,
    DEFAULT_BASELINE,
};
