//! Domain models for ODAVL.
//!
//! Canonical definitions for the records exchanged between stages:
//! - `Issue`: a detector finding (Insight)
//! - `Fix`: an applied remediation (Autopilot)
//! - `GuardianReport`: aggregate verification outcome (Guardian)

pub mod digest;
pub mod error;
pub mod insight;
pub mod issue;
pub mod remediation;
pub mod verification;

pub use error::{OdavlError, Result};
pub use insight::{AnalysisOptions, AnalysisRequest, InsightResult};
pub use issue::{Issue, Severity, SeverityCounts};
pub use remediation::{AutopilotResult, Fix};
pub use verification::{GuardianReport, TestResult, TestStatus};
