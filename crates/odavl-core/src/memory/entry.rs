//! Learned-pattern records and the feedback rule that updates them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Learned statistics for one error category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryEntry {
    pub error_type: String,
    pub times_seen: u64,
    /// Running mean of outcome confidence in `[0, 1]`.
    pub avg_confidence: f64,
    pub last_seen: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_fix: Option<String>,
    #[serde(default)]
    pub successes: u64,
    #[serde(default)]
    pub failures: u64,
}

impl MemoryEntry {
    /// Fresh entry with no recorded outcomes.
    pub fn new(error_type: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            error_type: error_type.into(),
            times_seen: 0,
            avg_confidence: 0.0,
            last_seen: now,
            last_fix: None,
            successes: 0,
            failures: 0,
        }
    }

    /// Fold one outcome into the entry.
    ///
    /// A success contributes the correction's confidence, a failure
    /// contributes zero. A non-finite confidence counts as zero so the mean
    /// always serializes.
    pub fn record(&mut self, correction: &Correction, now: DateTime<Utc>) {
        self.times_seen += 1;
        if correction.success {
            self.successes += 1;
        } else {
            self.failures += 1;
        }
        let sample = if correction.success && correction.confidence.is_finite() {
            correction.confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.avg_confidence += (sample - self.avg_confidence) / self.times_seen as f64;
        self.last_seen = now;
        if let Some(fix) = &correction.fix {
            self.last_fix = Some(fix.clone());
        }
    }

    /// `successes / (successes + failures)`, if any outcome was recorded.
    pub fn success_rate(&self) -> Option<f64> {
        let total = self.successes + self.failures;
        (total > 0).then(|| self.successes as f64 / total as f64)
    }
}

/// Entry shape found in older map-keyed memory files.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyMemoryEntry {
    #[serde(default)]
    pub error_type: Option<String>,
    #[serde(default = "one")]
    pub times_seen: u64,
    #[serde(default)]
    pub avg_confidence: f64,
    pub last_seen: DateTime<Utc>,
    #[serde(default)]
    pub last_fix: Option<String>,
}

fn one() -> u64 {
    1
}

/// Every accepted on-disk layout, resolved once at load.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MemoryFileFormat {
    Array(Vec<MemoryEntry>),
    LegacyMap(BTreeMap<String, LegacyMemoryEntry>),
}

impl MemoryFileFormat {
    pub fn is_legacy(&self) -> bool {
        matches!(self, Self::LegacyMap(_))
    }

    /// Upgrade to the current record list. Legacy keys fill a missing
    /// `errorType`.
    pub fn into_entries(self) -> Vec<MemoryEntry> {
        match self {
            Self::Array(entries) => entries,
            Self::LegacyMap(map) => map
                .into_iter()
                .map(|(key, legacy)| MemoryEntry {
                    error_type: legacy.error_type.unwrap_or(key),
                    times_seen: legacy.times_seen,
                    avg_confidence: legacy.avg_confidence,
                    last_seen: legacy.last_seen,
                    last_fix: legacy.last_fix,
                    successes: 0,
                    failures: 0,
                })
                .collect(),
        }
    }
}

/// An observed outcome of applying a fix for one error category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Correction {
    pub error_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix: Option<String>,
    pub success: bool,
    /// Confidence the producer had in the fix, `[0, 1]`.
    pub confidence: f64,
}

impl Correction {
    pub fn success(error_type: impl Into<String>, confidence: f64) -> Self {
        Self {
            error_type: error_type.into(),
            fix: None,
            success: true,
            confidence,
        }
    }

    pub fn failure(error_type: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            fix: None,
            success: false,
            confidence: 0.0,
        }
    }

    pub fn with_fix(mut self, fix: impl Into<String>) -> Self {
        self.fix = Some(fix.into());
        self
    }
}

/// Pattern lookup criteria. An empty `error_types` list matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternQuery {
    #[serde(default)]
    pub error_types: Vec<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl PatternQuery {
    pub fn for_types<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            error_types: types.into_iter().map(Into::into).collect(),
            limit: None,
        }
    }

    pub fn matches(&self, entry: &MemoryEntry) -> bool {
        self.error_types.is_empty() || self.error_types.iter().any(|t| *t == entry.error_type)
    }

    /// Filter `entries`, most recently seen first, honouring `limit`.
    pub fn apply<'a>(&self, entries: impl IntoIterator<Item = &'a MemoryEntry>) -> Vec<MemoryEntry> {
        let mut hits: Vec<MemoryEntry> = entries
            .into_iter()
            .filter(|e| self.matches(e))
            .cloned()
            .collect();
        hits.sort_by(|a, b| {
            b.last_seen
                .cmp(&a.last_seen)
                .then_with(|| a.error_type.cmp(&b.error_type))
        });
        if let Some(limit) = self.limit {
            hits.truncate(limit);
        }
        hits
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternQueryResult {
    pub entries: Vec<MemoryEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_record_running_mean() {
        let mut entry = MemoryEntry::new("unused-import", t(0));
        entry.record(&Correction::success("unused-import", 0.9), t(1));
        assert!((entry.avg_confidence - 0.9).abs() < 1e-9);

        entry.record(&Correction::failure("unused-import"), t(2));
        assert!((entry.avg_confidence - 0.45).abs() < 1e-9);
        assert_eq!(entry.times_seen, 2);
        assert_eq!(entry.successes, 1);
        assert_eq!(entry.failures, 1);
        assert_eq!(entry.last_seen, t(2));
        assert_eq!(entry.success_rate(), Some(0.5));
    }

    #[test]
    fn test_non_finite_confidence_counts_as_zero() {
        let mut entry = MemoryEntry::new("xss", t(0));
        entry.record(&Correction::success("xss", 0.8), t(1));
        entry.record(&Correction::success("xss", f64::NAN), t(2));
        entry.record(&Correction::success("xss", f64::INFINITY), t(3));
        assert!((entry.avg_confidence - 0.8 / 3.0).abs() < 1e-9);
        assert_eq!(entry.successes, 3);
    }

    #[test]
    fn test_record_keeps_last_fix_when_none_supplied() {
        let mut entry = MemoryEntry::new("x", t(0));
        entry.record(&Correction::success("x", 1.0).with_fix("remove it"), t(1));
        entry.record(&Correction::success("x", 1.0), t(2));
        assert_eq!(entry.last_fix.as_deref(), Some("remove it"));
    }

    #[test]
    fn test_legacy_map_upgrades() {
        let json = r#"{
            "sql-injection": {"timesSeen": 3, "avgConfidence": 0.7, "lastSeen": "2024-01-01T00:00:00Z"},
            "xss": {"errorType": "xss", "lastSeen": "2024-02-01T00:00:00Z", "lastFix": "escape"}
        }"#;
        let format: MemoryFileFormat = serde_json::from_str(json).expect("parse");
        assert!(format.is_legacy());
        let entries = format.into_entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].error_type, "sql-injection");
        assert_eq!(entries[0].times_seen, 3);
        assert_eq!(entries[1].times_seen, 1);
        assert_eq!(entries[1].last_fix.as_deref(), Some("escape"));
    }

    #[test]
    fn test_array_format_without_counters_parses() {
        let json = r#"[{"errorType":"a","timesSeen":2,"avgConfidence":0.5,"lastSeen":"2024-01-01T00:00:00Z"}]"#;
        let format: MemoryFileFormat = serde_json::from_str(json).expect("parse");
        assert!(!format.is_legacy());
        let entries = format.into_entries();
        assert_eq!(entries[0].successes, 0);
        assert!(entries[0].last_fix.is_none());
    }

    #[test]
    fn test_query_filters_and_limits() {
        let entries = vec![
            MemoryEntry::new("a", t(1)),
            MemoryEntry::new("b", t(3)),
            MemoryEntry::new("c", t(2)),
        ];
        let all = PatternQuery::default().apply(&entries);
        let order: Vec<&str> = all.iter().map(|e| e.error_type.as_str()).collect();
        assert_eq!(order, vec!["b", "c", "a"]);

        let q = PatternQuery {
            error_types: vec!["a".into(), "c".into()],
            limit: Some(1),
        };
        let hits = q.apply(&entries);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].error_type, "c");
    }
}
