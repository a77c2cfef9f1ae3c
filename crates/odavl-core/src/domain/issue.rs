//! Issues reported by the detection stage.

use serde::{Deserialize, Serialize};

/// Issue severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single finding from a detector.
///
/// `line` and `column` are display-only: they drift between runs and take no
/// part in identity. See [`crate::fingerprint`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    /// Source file, ideally relative to the workspace root.
    pub file: String,

    /// Line number (1-indexed).
    pub line: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,

    pub severity: Severity,

    /// Issue category (e.g. "sql-injection", "unused-import").
    #[serde(rename = "type")]
    pub issue_type: String,

    /// Detector that produced the issue (e.g. "typescript", "security").
    pub detector: String,

    pub message: String,

    /// Suggested fix, if the detector offered one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix: Option<String>,
}

impl Issue {
    pub fn new(
        file: impl Into<String>,
        line: u32,
        severity: Severity,
        issue_type: impl Into<String>,
        detector: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            line,
            column: None,
            severity,
            issue_type: issue_type.into(),
            detector: detector.into(),
            message: message.into(),
            fix: None,
        }
    }

    pub fn with_column(mut self, column: u32) -> Self {
        self.column = Some(column);
        self
    }

    pub fn with_fix(mut self, fix: impl Into<String>) -> Self {
        self.fix = Some(fix.into());
        self
    }
}

/// Per-severity tallies.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl SeverityCounts {
    /// Tally `issues` by severity.
    pub fn from_issues<'a>(issues: impl IntoIterator<Item = &'a Issue>) -> Self {
        let mut counts = Self::default();
        for issue in issues {
            counts.add(issue.severity);
        }
        counts
    }

    pub fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
        }
    }

    pub fn get(&self, severity: Severity) -> usize {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
        }
    }

    pub fn total(&self) -> usize {
        self.critical + self.high + self.medium + self.low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn test_issue_wire_format_uses_type_and_camel_case() {
        let issue = Issue::new(
            "src/a.ts",
            12,
            Severity::Critical,
            "sql-injection",
            "security",
            "Unsanitized input reaches query",
        )
        .with_column(4);

        let json = serde_json::to_value(&issue).expect("serialize");
        assert_eq!(json["type"], "sql-injection");
        assert_eq!(json["severity"], "critical");
        assert_eq!(json["column"], 4);
        assert!(json.get("fix").is_none());
    }

    #[test]
    fn test_issue_parses_without_optional_fields() {
        let json = r#"{"file":"a.py","line":3,"severity":"low","type":"style","detector":"pylint","message":"x"}"#;
        let issue: Issue = serde_json::from_str(json).expect("deserialize");
        assert!(issue.column.is_none());
        assert!(issue.fix.is_none());
        assert_eq!(issue.severity, Severity::Low);
    }

    #[test]
    fn test_severity_counts() {
        let issues = vec![
            Issue::new("a", 1, Severity::Critical, "t", "d", "m"),
            Issue::new("a", 2, Severity::High, "t", "d", "m"),
            Issue::new("b", 3, Severity::High, "t", "d", "m"),
        ];
        let counts = SeverityCounts::from_issues(&issues);
        assert_eq!(counts.critical, 1);
        assert_eq!(counts.high, 2);
        assert_eq!(counts.get(Severity::Medium), 0);
        assert_eq!(counts.total(), 3);
    }
}
