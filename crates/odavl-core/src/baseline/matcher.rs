//! Fingerprint-based diff of current issues against a baseline.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::store::Baseline;
use crate::domain::{Issue, SeverityCounts};
use crate::fingerprint::{Fingerprint, FingerprintEngine};

/// Per-partition severity tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub new: SeverityCounts,
    pub resolved: SeverityCounts,
    pub persisting: SeverityCounts,
}

impl DiffSummary {
    /// Issues still present in the current run (`new + persisting`).
    pub fn unresolved(&self) -> SeverityCounts {
        SeverityCounts {
            critical: self.new.critical + self.persisting.critical,
            high: self.new.high + self.persisting.high,
            medium: self.new.medium + self.persisting.medium,
            low: self.new.low + self.persisting.low,
        }
    }
}

/// Partition of baseline and current issues by fingerprint membership.
///
/// `persisting` holds the current occurrences, so line numbers are fresh.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineDiff {
    pub new: Vec<Issue>,
    pub resolved: Vec<Issue>,
    pub persisting: Vec<Issue>,
    pub summary: DiffSummary,
}

impl BaselineDiff {
    pub fn has_regressions(&self) -> bool {
        !self.new.is_empty()
    }
}

/// Tally `issues` by severity.
pub fn count_by_severity(issues: &[Issue]) -> SeverityCounts {
    SeverityCounts::from_issues(issues)
}

#[derive(Debug, Clone, Default)]
pub struct BaselineMatcher {
    engine: FingerprintEngine,
}

impl BaselineMatcher {
    pub fn new(engine: FingerprintEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &FingerprintEngine {
        &self.engine
    }

    pub fn diff(&self, baseline: &Baseline, current: &[Issue]) -> BaselineDiff {
        self.diff_issues(&baseline.issues, current)
    }

    /// Partition `baseline` and `current`. Input order is preserved within
    /// each partition.
    pub fn diff_issues(&self, baseline: &[Issue], current: &[Issue]) -> BaselineDiff {
        let baseline_fps: HashSet<Fingerprint> =
            baseline.iter().map(|i| self.engine.fingerprint(i)).collect();
        let current_fps: HashSet<Fingerprint> =
            current.iter().map(|i| self.engine.fingerprint(i)).collect();

        let (persisting, new): (Vec<Issue>, Vec<Issue>) = current
            .iter()
            .cloned()
            .partition(|i| baseline_fps.contains(&self.engine.fingerprint(i)));
        let resolved: Vec<Issue> = baseline
            .iter()
            .filter(|i| !current_fps.contains(&self.engine.fingerprint(i)))
            .cloned()
            .collect();

        let summary = DiffSummary {
            new: count_by_severity(&new),
            resolved: count_by_severity(&resolved),
            persisting: count_by_severity(&persisting),
        };
        BaselineDiff {
            new,
            resolved,
            persisting,
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Severity;

    fn issue(file: &str, line: u32, severity: Severity, ty: &str, msg: &str) -> Issue {
        Issue::new(file, line, severity, ty, "security", msg)
    }

    #[test]
    fn test_line_drift_is_persisting_with_fresh_line() {
        let matcher = BaselineMatcher::default();
        let old = vec![issue("a.ts", 10, Severity::High, "xss", "unescaped output")];
        let cur = vec![issue("a.ts", 42, Severity::High, "xss", "unescaped output")];
        let diff = matcher.diff_issues(&old, &cur);
        assert!(diff.new.is_empty());
        assert!(diff.resolved.is_empty());
        assert_eq!(diff.persisting[0].line, 42);
    }

    #[test]
    fn test_resolved_and_new() {
        let matcher = BaselineMatcher::default();
        let old = vec![issue("a.ts", 1, Severity::Low, "style", "x")];
        let cur = vec![issue("b.ts", 1, Severity::Medium, "style", "x")];
        let diff = matcher.diff_issues(&old, &cur);
        assert_eq!(diff.new.len(), 1);
        assert_eq!(diff.resolved.len(), 1);
        assert_eq!(diff.summary.new.medium, 1);
        assert_eq!(diff.summary.resolved.low, 1);
        assert!(diff.has_regressions());
        assert_eq!(diff.summary.unresolved().total(), 1);
    }

    #[test]
    fn test_empty_baseline_makes_everything_new() {
        let matcher = BaselineMatcher::default();
        let cur = vec![
            issue("a.ts", 1, Severity::Critical, "sql-injection", "q"),
            issue("a.ts", 2, Severity::High, "xss", "o"),
        ];
        let diff = matcher.diff_issues(&[], &cur);
        assert_eq!(diff.new, cur);
        assert_eq!(diff.summary.new.critical, 1);
    }
}
