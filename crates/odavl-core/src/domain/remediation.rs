//! Remediation-stage ("Autopilot") record types.

use serde::{Deserialize, Serialize};

/// A fix applied by the remediation stage. Immutable once recorded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Fix {
    /// File that was modified (relative to workspace root).
    pub file: String,

    pub lines_changed: u32,

    /// Fix category; matches the issue type it addresses.
    #[serde(rename = "type")]
    pub fix_type: String,

    pub description: String,

    /// Digest attesting the applied change, when the recipe produced one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attestation_hash: Option<String>,
}

impl Fix {
    pub fn new(
        file: impl Into<String>,
        lines_changed: u32,
        fix_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            lines_changed,
            fix_type: fix_type.into(),
            description: description.into(),
            attestation_hash: None,
        }
    }

    pub fn with_attestation(mut self, hash: impl Into<String>) -> Self {
        self.attestation_hash = Some(hash.into());
        self
    }
}

/// Output of the remediation stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AutopilotResult {
    pub fixes: Vec<Fix>,

    /// Recipes that were attempted but rolled back.
    #[serde(default)]
    pub failed_fixes: u32,

    #[serde(default)]
    pub duration_ms: u64,

    /// True when the stage was short-circuited by configuration.
    #[serde(default)]
    pub skipped: bool,
}

impl AutopilotResult {
    /// Empty result standing in for a skipped stage.
    pub fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }

    pub fn total_lines_changed(&self) -> u32 {
        self.fixes.iter().map(|f| f.lines_changed).sum()
    }
}
