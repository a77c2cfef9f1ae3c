//! Analysis request and detection-stage result types.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::issue::{Issue, SeverityCounts};

/// Option flags that change what a detector reports.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOptions {
    /// Restrict analysis to these files (empty = whole workspace).
    #[serde(default)]
    pub files: Vec<String>,

    /// Report low-severity style findings as well.
    #[serde(default)]
    pub include_low: bool,

    /// Upper bound on reported issues, if any.
    #[serde(default)]
    pub max_issues: Option<u32>,
}

/// A request to run detectors over a workspace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub workspace: PathBuf,
    pub detectors: Vec<String>,
    #[serde(default)]
    pub options: AnalysisOptions,
}

impl AnalysisRequest {
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
            detectors: Vec::new(),
            options: AnalysisOptions::default(),
        }
    }

    pub fn with_detector(mut self, detector: impl Into<String>) -> Self {
        self.detectors.push(detector.into());
        self
    }

    pub fn with_options(mut self, options: AnalysisOptions) -> Self {
        self.options = options;
        self
    }

    /// Detector names sorted and de-duplicated. Order of the request list
    /// carries no meaning.
    pub fn normalized_detectors(&self) -> Vec<String> {
        self.detectors
            .iter()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Output of the detection stage ("Insight").
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InsightResult {
    pub issues: Vec<Issue>,
    #[serde(default)]
    pub files_analyzed: u32,
    #[serde(default)]
    pub detectors: Vec<String>,
    #[serde(default)]
    pub duration_ms: u64,
}

impl InsightResult {
    pub fn new(issues: Vec<Issue>) -> Self {
        Self {
            issues,
            ..Self::default()
        }
    }

    pub fn severity_counts(&self) -> SeverityCounts {
        SeverityCounts::from_issues(&self.issues)
    }
}
