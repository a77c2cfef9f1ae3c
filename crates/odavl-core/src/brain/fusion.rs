//! Fusion: combine stage outputs into one launch score and decision.
//!
//! [`fuse`] is pure. Given the same inputs and configuration it produces the
//! same [`PipelineReport`], byte for byte once serialized.
//!
//! Score = `base`, minus per-severity penalties for every unresolved issue,
//! minus `verification * (1 - pass_ratio)` when verification ran, minus
//! `failed_fix` per failed remediation, plus `memory * (2c - 1)` where `c` is
//! the `timesSeen`-weighted mean confidence of memory entries matching an
//! unresolved issue type. Clamped to `[0, 100]`, rounded to one decimal.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::config::BrainConfig;
use super::report::PipelineReport;
use crate::baseline::{Baseline, BaselineMatcher, DiffSummary};
use crate::domain::{AutopilotResult, GuardianReport, InsightResult, Issue, SeverityCounts};
use crate::fingerprint::FingerprintEngine;
use crate::memory::MemoryEntry;

/// Score weights. Every penalty is a positive magnitude.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionWeights {
    pub base: f64,
    pub critical: f64,
    pub high: f64,
    pub medium: f64,
    pub low: f64,
    /// Penalty at a 0% verification pass ratio.
    pub verification: f64,
    pub failed_fix: f64,
    /// Maximum swing, up or down, from memory confidence.
    pub memory: f64,
    pub release_threshold: f64,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            base: 100.0,
            critical: 25.0,
            high: 5.0,
            medium: 1.0,
            low: 0.25,
            verification: 30.0,
            failed_fix: 2.0,
            memory: 10.0,
            release_threshold: 80.0,
        }
    }
}

impl FusionWeights {
    pub fn validate(&self) -> Result<(), String> {
        let penalties = [
            ("critical", self.critical),
            ("high", self.high),
            ("medium", self.medium),
            ("low", self.low),
            ("verification", self.verification),
            ("failed_fix", self.failed_fix),
            ("memory", self.memory),
        ];
        for (name, value) in penalties {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("fusion weight {name} must be a non-negative number"));
            }
        }
        if !(0.0..=100.0).contains(&self.release_threshold) {
            return Err("release_threshold must be within 0..=100".to_string());
        }
        if !self.base.is_finite() {
            return Err("base must be finite".to_string());
        }
        Ok(())
    }
}

/// Everything fusion reads. Serializable so recorded cycles can be replayed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FusionInputs {
    /// Workspace root used to relativize issue paths before fingerprinting.
    #[serde(default)]
    pub workspace: Option<PathBuf>,
    pub insight: InsightResult,
    #[serde(default)]
    pub autopilot: AutopilotResult,
    #[serde(default)]
    pub guardian: GuardianReport,
    #[serde(default)]
    pub baseline: Option<Baseline>,
    #[serde(default)]
    pub memory: Vec<MemoryEntry>,
}

/// Intermediate metrics derived from the inputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FusedMetrics {
    pub total_issues: usize,
    /// Issues in the current run (new + persisting).
    pub unresolved: SeverityCounts,
    pub new_issues: usize,
    pub resolved_issues: usize,
    pub baseline_used: bool,
    pub fixes_applied: usize,
    pub failed_fixes: u32,
    pub verification_ran: bool,
    pub pass_ratio: Option<f64>,
    pub tests_passed: u32,
    pub tests_failed: u32,
    pub guardian_launch_ready: bool,
    pub memory_confidence: Option<f64>,
    /// Sum of `timesSeen` over the matching memory entries.
    pub memory_samples: u64,
}

/// Signed contribution of one signal to the launch score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreFactor {
    pub name: String,
    pub delta: f64,
    pub detail: String,
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Weighted mean of `avgConfidence` over entries whose type is in `types`.
pub fn memory_confidence(memory: &[MemoryEntry], types: &BTreeSet<&str>) -> (Option<f64>, u64) {
    let mut weight = 0u64;
    let mut sum = 0.0;
    for entry in memory.iter().filter(|e| types.contains(e.error_type.as_str())) {
        weight += entry.times_seen;
        sum += entry.avg_confidence.clamp(0.0, 1.0) * entry.times_seen as f64;
    }
    if weight == 0 {
        (None, 0)
    } else {
        (Some(sum / weight as f64), weight)
    }
}

/// Derive metrics from the stage outputs.
pub fn compute_metrics(inputs: &FusionInputs) -> (FusedMetrics, Option<DiffSummary>, Vec<Issue>) {
    let engine = inputs
        .workspace
        .as_ref()
        .map(|root| FingerprintEngine::with_root(root))
        .unwrap_or_default();
    let matcher = BaselineMatcher::new(engine);

    let current = &inputs.insight.issues;
    let (unresolved_issues, new_issues, resolved, diff) = match &inputs.baseline {
        Some(baseline) => {
            let d = matcher.diff(baseline, current);
            let mut unresolved = d.new.clone();
            unresolved.extend(d.persisting.iter().cloned());
            (unresolved, d.new.len(), d.resolved.len(), Some(d.summary))
        }
        None => (current.clone(), current.len(), 0, None),
    };

    let types: BTreeSet<&str> = unresolved_issues
        .iter()
        .map(|i| i.issue_type.as_str())
        .collect();
    let (memory_confidence, memory_samples) = memory_confidence(&inputs.memory, &types);

    let guardian = &inputs.guardian;
    let verification_ran = !guardian.stage_skipped && guardian.passed + guardian.failed > 0;
    let metrics = FusedMetrics {
        total_issues: current.len(),
        unresolved: SeverityCounts::from_issues(&unresolved_issues),
        new_issues,
        resolved_issues: resolved,
        baseline_used: inputs.baseline.is_some(),
        fixes_applied: inputs.autopilot.fixes.len(),
        failed_fixes: inputs.autopilot.failed_fixes,
        verification_ran,
        pass_ratio: if verification_ran { guardian.pass_ratio() } else { None },
        tests_passed: guardian.passed,
        tests_failed: guardian.failed,
        guardian_launch_ready: !guardian.stage_skipped && guardian.launch_ready,
        memory_confidence,
        memory_samples,
    };
    (metrics, diff, unresolved_issues)
}

/// Score contributions in a fixed order. Zero-weight signals are omitted.
pub fn score_factors(metrics: &FusedMetrics, w: &FusionWeights) -> Vec<ScoreFactor> {
    let mut factors = Vec::new();
    let severities = [
        ("unresolved_critical", "critical", metrics.unresolved.critical, w.critical),
        ("unresolved_high", "high", metrics.unresolved.high, w.high),
        ("unresolved_medium", "medium", metrics.unresolved.medium, w.medium),
        ("unresolved_low", "low", metrics.unresolved.low, w.low),
    ];
    for (name, label, count, weight) in severities {
        if count > 0 && weight > 0.0 {
            factors.push(ScoreFactor {
                name: name.to_string(),
                delta: -(count as f64) * weight,
                detail: format!("{count} unresolved {label} issue(s)"),
            });
        }
    }

    if let Some(ratio) = metrics.pass_ratio {
        let delta = -w.verification * (1.0 - ratio);
        if delta != 0.0 {
            factors.push(ScoreFactor {
                name: "verification".to_string(),
                delta,
                detail: format!(
                    "{} of {} verification check(s) failed",
                    metrics.tests_failed,
                    metrics.tests_passed + metrics.tests_failed
                ),
            });
        }
    }

    if metrics.failed_fixes > 0 && w.failed_fix > 0.0 {
        factors.push(ScoreFactor {
            name: "failed_fixes".to_string(),
            delta: -f64::from(metrics.failed_fixes) * w.failed_fix,
            detail: format!("{} remediation attempt(s) failed", metrics.failed_fixes),
        });
    }

    if let Some(confidence) = metrics.memory_confidence {
        let delta = w.memory * (2.0 * confidence - 1.0);
        if delta != 0.0 {
            factors.push(ScoreFactor {
                name: "memory_confidence".to_string(),
                delta,
                detail: format!(
                    "historical fix confidence {:.0}% over {} outcome(s)",
                    confidence * 100.0,
                    metrics.memory_samples
                ),
            });
        }
    }
    factors
}

fn recommendation(factor: &ScoreFactor) -> String {
    let action = match factor.name.as_str() {
        "unresolved_critical" => "Resolve critical issues before release",
        "unresolved_high" => "Address high-severity issues",
        "unresolved_medium" => "Reduce medium-severity issues",
        "unresolved_low" => "Clean up low-severity issues",
        "verification" => "Fix failing verification checks",
        "failed_fixes" => "Review remediation recipes that failed",
        "memory_confidence" => "Review fixes with a poor track record",
        _ => "Investigate",
    };
    format!("{action}: {} ({:+.1} points)", factor.detail, factor.delta)
}

/// Human-readable guidance, most damaging signal first.
pub fn recommendations(factors: &[ScoreFactor], violations: &[String]) -> Vec<String> {
    let mut negative: Vec<&ScoreFactor> = factors.iter().filter(|f| f.delta < 0.0).collect();
    negative.sort_by(|a, b| {
        b.delta
            .abs()
            .total_cmp(&a.delta.abs())
            .then_with(|| a.name.cmp(&b.name))
    });

    let mut out: Vec<String> = negative.into_iter().map(recommendation).collect();
    out.extend(violations.iter().map(|v| format!("Policy: {v}")));
    if out.is_empty() {
        out.push("Ready for release: no signal reduced the launch score".to_string());
    }
    out
}

/// Fuse stage outputs into a report. Performs no I/O.
pub fn fuse(inputs: &FusionInputs, config: &BrainConfig) -> PipelineReport {
    let weights = &config.fusion;
    let (metrics, diff, _) = compute_metrics(inputs);
    let factors = score_factors(&metrics, weights);

    let raw = weights.base + factors.iter().map(|f| f.delta).sum::<f64>();
    let launch_score = round1(raw.clamp(0.0, 100.0));

    let violations = config.policy.violations(&metrics);
    let ready_for_release = launch_score >= weights.release_threshold && violations.is_empty();
    let recommendations = recommendations(&factors, &violations);

    let total_duration_ms = inputs.insight.duration_ms
        + inputs.autopilot.duration_ms
        + inputs.guardian.duration_ms;

    PipelineReport {
        insight: inputs.insight.clone(),
        autopilot: inputs.autopilot.clone(),
        guardian: inputs.guardian.clone(),
        launch_score,
        ready_for_release,
        recommendations,
        total_duration_ms,
        metrics,
        factors,
        diff,
        violations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Severity, TestResult};
    use chrono::{TimeZone, Utc};

    fn issue(sev: Severity, ty: &str) -> Issue {
        Issue::new("src/a.ts", 1, sev, ty, "security", format!("{ty} found"))
    }

    fn entry(ty: &str, seen: u64, conf: f64) -> MemoryEntry {
        let mut e = MemoryEntry::new(ty, Utc.timestamp_opt(1_700_000_000, 0).unwrap());
        e.times_seen = seen;
        e.avg_confidence = conf;
        e
    }

    #[test]
    fn test_clean_run_scores_full_and_is_ready() {
        let report = fuse(&FusionInputs::default(), &BrainConfig::default());
        assert_eq!(report.launch_score, 100.0);
        assert!(report.ready_for_release);
        assert_eq!(report.recommendations.len(), 1);
        assert!(report.recommendations[0].starts_with("Ready for release"));
    }

    #[test]
    fn test_weights_apply_per_severity() {
        let inputs = FusionInputs {
            insight: InsightResult::new(vec![
                issue(Severity::High, "xss"),
                issue(Severity::Medium, "complexity"),
                issue(Severity::Low, "style"),
                issue(Severity::Low, "naming"),
            ]),
            ..FusionInputs::default()
        };
        let report = fuse(&inputs, &BrainConfig::default());
        // 100 - 5 - 1 - 0.5
        assert_eq!(report.launch_score, 93.5);
        assert!(report.ready_for_release);
        assert!(report.recommendations[0].starts_with("Address high-severity"));
    }

    #[test]
    fn test_critical_blocks_release_via_policy() {
        let inputs = FusionInputs {
            insight: InsightResult::new(vec![issue(Severity::Critical, "sql-injection")]),
            ..FusionInputs::default()
        };
        let report = fuse(&inputs, &BrainConfig::default());
        assert_eq!(report.launch_score, 75.0);
        assert!(!report.ready_for_release);
        assert_eq!(report.violations.len(), 1);
        assert!(report.recommendations.last().unwrap().starts_with("Policy:"));
    }

    #[test]
    fn test_verification_and_failed_fixes() {
        let inputs = FusionInputs {
            autopilot: AutopilotResult {
                failed_fixes: 2,
                ..AutopilotResult::default()
            },
            guardian: GuardianReport::from_tests(vec![
                TestResult::passed("a"),
                TestResult::passed("b"),
                TestResult::passed("c"),
                TestResult::failed("d", "boom"),
            ]),
            ..FusionInputs::default()
        };
        let report = fuse(&inputs, &BrainConfig::default());
        // 100 - 30 * 0.25 - 2 * 2
        assert_eq!(report.launch_score, 88.5);
        assert_eq!(report.factors[0].name, "verification");
        assert!(report.recommendations[0].starts_with("Fix failing verification"));
    }

    #[test]
    fn test_memory_confidence_is_weighted_and_filtered() {
        let memory = vec![
            entry("xss", 3, 1.0),
            entry("xss-other", 100, 0.0),
            entry("style", 1, 0.0),
        ];
        let types: BTreeSet<&str> = ["xss", "style"].into_iter().collect();
        let (conf, samples) = memory_confidence(&memory, &types);
        assert_eq!(samples, 4);
        assert!((conf.unwrap() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_memory_raises_score_for_trusted_fixes() {
        let inputs = FusionInputs {
            insight: InsightResult::new(vec![issue(Severity::High, "xss")]),
            memory: vec![entry("xss", 4, 0.9)],
            ..FusionInputs::default()
        };
        let report = fuse(&inputs, &BrainConfig::default());
        // 100 - 5 + 10 * 0.8
        assert_eq!(report.launch_score, 100.0);
        assert_eq!(report.metrics.memory_confidence, Some(0.9));
    }

    #[test]
    fn test_score_is_clamped() {
        let issues = (0..10).map(|_| issue(Severity::Critical, "sql-injection")).collect();
        let inputs = FusionInputs {
            insight: InsightResult::new(issues),
            ..FusionInputs::default()
        };
        assert_eq!(fuse(&inputs, &BrainConfig::default()).launch_score, 0.0);
    }

    #[test]
    fn test_recommendation_ties_break_by_name() {
        let factors = vec![
            ScoreFactor { name: "unresolved_low".into(), delta: -2.0, detail: "d".into() },
            ScoreFactor { name: "failed_fixes".into(), delta: -2.0, detail: "d".into() },
        ];
        let recs = recommendations(&factors, &[]);
        assert!(recs[0].starts_with("Review remediation"));
        assert!(recs[1].starts_with("Clean up"));
    }
}
