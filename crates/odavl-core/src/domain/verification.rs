//! Verification-stage ("Guardian") record types.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    Passed,
    Failed,
    Skipped,
}

/// Result of a single verification check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub name: String,
    pub status: TestStatus,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TestResult {
    pub fn passed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: TestStatus::Passed,
            duration_ms: 0,
            message: None,
        }
    }

    pub fn failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: TestStatus::Failed,
            duration_ms: 0,
            message: Some(message.into()),
        }
    }
}

/// Aggregate output of the verification stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GuardianReport {
    pub passed: u32,
    pub failed: u32,
    #[serde(default)]
    pub skipped: u32,

    /// Verification stage's own go/no-go hint.
    pub launch_ready: bool,

    #[serde(default)]
    pub tests: Vec<TestResult>,

    #[serde(default)]
    pub duration_ms: u64,

    /// True when the stage was short-circuited by configuration.
    #[serde(default)]
    pub stage_skipped: bool,
}

impl GuardianReport {
    /// Build a report from individual results, deriving the counts.
    pub fn from_tests(tests: Vec<TestResult>) -> Self {
        let count = |s: TestStatus| tests.iter().filter(|t| t.status == s).count() as u32;
        let passed = count(TestStatus::Passed);
        let failed = count(TestStatus::Failed);
        let skipped = count(TestStatus::Skipped);
        Self {
            passed,
            failed,
            skipped,
            launch_ready: failed == 0,
            tests,
            duration_ms: 0,
            stage_skipped: false,
        }
    }

    /// Empty report standing in for a skipped stage.
    pub fn skipped() -> Self {
        Self {
            stage_skipped: true,
            ..Self::default()
        }
    }

    /// `passed / (passed + failed)`, or `None` when nothing was executed.
    pub fn pass_ratio(&self) -> Option<f64> {
        let executed = self.passed + self.failed;
        if executed == 0 {
            None
        } else {
            Some(f64::from(self.passed) / f64::from(executed))
        }
    }
}
