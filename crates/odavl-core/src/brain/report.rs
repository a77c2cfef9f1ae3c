//! Pipeline report and its Markdown rendering.

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use super::fusion::{FusedMetrics, ScoreFactor};
use crate::baseline::DiffSummary;
use crate::domain::{AutopilotResult, GuardianReport, InsightResult, SeverityCounts};

/// The single output artifact of a decision cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    pub insight: InsightResult,
    pub autopilot: AutopilotResult,
    pub guardian: GuardianReport,
    pub launch_score: f64,
    pub ready_for_release: bool,
    pub recommendations: Vec<String>,
    /// Sum of the stage durations recorded in the inputs.
    pub total_duration_ms: u64,
    pub metrics: FusedMetrics,
    pub factors: Vec<ScoreFactor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<DiffSummary>,
    #[serde(default)]
    pub violations: Vec<String>,
}

fn counts_cell(c: &SeverityCounts) -> String {
    format!("{} / {} / {} / {}", c.critical, c.high, c.medium, c.low)
}

/// Render `report` as Markdown for humans.
pub fn render_report_md(report: &PipelineReport) -> String {
    let mut md = String::new();
    let verdict = if report.ready_for_release {
        "READY"
    } else {
        "NOT READY"
    };
    let _ = writeln!(md, "# ODAVL Decision Report\n");
    let _ = writeln!(md, "**Decision:** {verdict}  ");
    let _ = writeln!(md, "**Launch score:** {:.1} / 100  ", report.launch_score);
    let _ = writeln!(md, "**Duration:** {} ms\n", report.total_duration_ms);

    let m = &report.metrics;
    let _ = writeln!(md, "## Signals\n");
    let _ = writeln!(md, "| Signal | Value |");
    let _ = writeln!(md, "|---|---|");
    let _ = writeln!(md, "| Issues (current) | {} |", m.total_issues);
    let _ = writeln!(
        md,
        "| Unresolved (crit / high / med / low) | {} |",
        counts_cell(&m.unresolved)
    );
    if m.baseline_used {
        let _ = writeln!(md, "| New vs baseline | {} |", m.new_issues);
        let _ = writeln!(md, "| Resolved vs baseline | {} |", m.resolved_issues);
    } else {
        let _ = writeln!(md, "| Baseline | none |");
    }
    if report.autopilot.skipped {
        let _ = writeln!(md, "| Remediation | skipped |");
    } else {
        let _ = writeln!(
            md,
            "| Fixes applied / failed | {} / {} |",
            m.fixes_applied, m.failed_fixes
        );
    }
    match m.pass_ratio {
        Some(ratio) => {
            let _ = writeln!(
                md,
                "| Verification | {} passed, {} failed ({:.1}%) |",
                m.tests_passed,
                m.tests_failed,
                ratio * 100.0
            );
        }
        None if report.guardian.stage_skipped => {
            let _ = writeln!(md, "| Verification | skipped |");
        }
        None => {
            let _ = writeln!(md, "| Verification | no checks executed |");
        }
    }
    if let Some(c) = m.memory_confidence {
        let _ = writeln!(
            md,
            "| Memory confidence | {:.0}% ({} samples) |",
            c * 100.0,
            m.memory_samples
        );
    }

    if let Some(diff) = &report.diff {
        let _ = writeln!(md, "\n## Baseline diff (crit / high / med / low)\n");
        let _ = writeln!(md, "| Partition | Counts |");
        let _ = writeln!(md, "|---|---|");
        let _ = writeln!(md, "| New | {} |", counts_cell(&diff.new));
        let _ = writeln!(md, "| Persisting | {} |", counts_cell(&diff.persisting));
        let _ = writeln!(md, "| Resolved | {} |", counts_cell(&diff.resolved));
    }

    if !report.factors.is_empty() {
        let _ = writeln!(md, "\n## Score factors\n");
        for f in &report.factors {
            let _ = writeln!(md, "- `{}` {:+.1}: {}", f.name, f.delta, f.detail);
        }
    }

    let _ = writeln!(md, "\n## Recommendations\n");
    for (i, rec) in report.recommendations.iter().enumerate() {
        let _ = writeln!(md, "{}. {rec}", i + 1);
    }
    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::config::BrainConfig;
    use crate::brain::fusion::{fuse, FusionInputs};
    use crate::domain::{Issue, Severity};

    #[test]
    fn test_markdown_contains_decision_and_recommendations() {
        let inputs = FusionInputs {
            insight: InsightResult::new(vec![Issue::new(
                "a.ts",
                1,
                Severity::Critical,
                "sql-injection",
                "security",
                "query built from input",
            )]),
            ..FusionInputs::default()
        };
        let report = fuse(&inputs, &BrainConfig::default());
        let md = render_report_md(&report);
        assert!(md.contains("NOT READY"));
        assert!(md.contains("75.0 / 100"));
        assert!(md.contains("| Baseline | none |"));
        assert!(md.contains("1. Resolve critical issues"));
    }

    #[test]
    fn test_report_json_uses_camel_case() {
        let report = fuse(&FusionInputs::default(), &BrainConfig::default());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["launchScore"], 100.0);
        assert_eq!(json["readyForRelease"], true);
        assert!(json.get("diff").is_none());
    }
}
