//! Deploy policy: predicates evaluated against fused metrics.

use serde::{Deserialize, Serialize};

use super::fusion::FusedMetrics;

/// One `allow_deploy_if` predicate.
///
/// Serialized with a `type` tag, e.g. `{ type = "max_new_issues", max = 3 }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeployCondition {
    /// At most `max` unresolved critical issues remain.
    MaxUnresolvedCritical { max: usize },
    /// At most `max` issues are new relative to the baseline.
    MaxNewIssues { max: usize },
    /// Verification ran and passed at least this share of executed tests.
    MinPassRatio { min: f64 },
    /// The verification stage reported itself launch-ready.
    GuardianLaunchReady,
    /// At most `max` remediation attempts failed.
    MaxFailedFixes { max: u32 },
}

impl DeployCondition {
    /// `None` when the condition holds, otherwise a reason string.
    pub fn evaluate(&self, m: &FusedMetrics) -> Option<String> {
        match self {
            Self::MaxUnresolvedCritical { max } => (m.unresolved.critical > *max).then(|| {
                format!(
                    "{} unresolved critical issue(s) exceed the allowed {max}",
                    m.unresolved.critical
                )
            }),
            Self::MaxNewIssues { max } => (m.new_issues > *max)
                .then(|| format!("{} new issue(s) exceed the allowed {max}", m.new_issues)),
            Self::MinPassRatio { min } => match m.pass_ratio {
                Some(ratio) if ratio >= *min => None,
                Some(ratio) => Some(format!(
                    "verification pass ratio {:.1}% is below the required {:.1}%",
                    ratio * 100.0,
                    min * 100.0
                )),
                None => Some(format!(
                    "verification did not run; pass ratio of {:.1}% required",
                    min * 100.0
                )),
            },
            Self::GuardianLaunchReady => {
                (!m.guardian_launch_ready).then(|| "verification stage is not launch-ready".to_string())
            }
            Self::MaxFailedFixes { max } => (m.failed_fixes > *max)
                .then(|| format!("{} failed fix(es) exceed the allowed {max}", m.failed_fixes)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionPolicy {
    #[serde(default)]
    pub allow_deploy_if: Vec<DeployCondition>,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self {
            allow_deploy_if: vec![DeployCondition::MaxUnresolvedCritical { max: 0 }],
        }
    }
}

impl DecisionPolicy {
    /// Reasons for every violated condition, in declaration order.
    pub fn violations(&self, metrics: &FusedMetrics) -> Vec<String> {
        self.allow_deploy_if
            .iter()
            .filter_map(|c| c.evaluate(metrics))
            .collect()
    }
}
