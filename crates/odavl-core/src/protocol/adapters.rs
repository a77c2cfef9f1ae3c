//! Collaborator interfaces consumed by the core.
//!
//! Detectors, remediation recipes and test runners live outside this crate.
//! They plug in by implementing one of these traits and being registered in
//! an [`AdapterRegistry`](crate::registry::AdapterRegistry) at bootstrap.
//! Failures are reported as `anyhow::Error`; the façades turn them into
//! [`OdavlError::AdapterExecutionFailed`](crate::OdavlError::AdapterExecutionFailed).

use async_trait::async_trait;

use crate::domain::{AnalysisRequest, AutopilotResult, GuardianReport, InsightResult};
use crate::memory::{Correction, PatternQuery, PatternQueryResult};

/// Detection stage: runs detectors and reports issues.
#[async_trait]
pub trait AnalysisAdapter: Send + Sync {
    /// One-time setup, called by `RegistryBuilder::bootstrap`.
    async fn initialize(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn analyze(&self, request: &AnalysisRequest) -> anyhow::Result<InsightResult>;
}

/// Learned-pattern store.
#[async_trait]
pub trait PatternMemoryAdapter: Send + Sync {
    async fn initialize(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn query(&self, query: &PatternQuery) -> anyhow::Result<PatternQueryResult>;

    async fn learn_from_correction(&self, correction: Correction) -> anyhow::Result<()>;

    /// Persist anything buffered by `learn_from_correction`.
    async fn flush(&self) -> anyhow::Result<()>;
}

/// Remediation stage: applies fixes for detected issues.
#[async_trait]
pub trait RemediationAdapter: Send + Sync {
    async fn initialize(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn remediate(&self, insight: &InsightResult) -> anyhow::Result<AutopilotResult>;
}

/// Verification stage: runs tests against the (possibly remediated) workspace.
#[async_trait]
pub trait VerificationAdapter: Send + Sync {
    async fn initialize(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn verify(
        &self,
        request: &AnalysisRequest,
        autopilot: &AutopilotResult,
    ) -> anyhow::Result<GuardianReport>;
}
