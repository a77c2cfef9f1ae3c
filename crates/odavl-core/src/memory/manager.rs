//! Size-bounded durable store for learned patterns.
//!
//! One JSON file holds every [`MemoryEntry`]. Saves that would exceed the
//! byte budget rotate the list once, keeping the most recently seen share of
//! entries. Loads accept the legacy map layout and upgrade it in memory; the
//! next save writes the array layout.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::entry::{Correction, MemoryEntry, MemoryFileFormat};
use super::error::{MemoryError, MemoryResult};
use crate::metrics::METRICS;
use crate::obs;
use crate::storage;

pub const DEFAULT_MAX_BYTES: usize = 5 * 1024 * 1024;
pub const DEFAULT_KEEP_RATIO: f64 = 0.8;

/// Byte budget and eviction share for the memory file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub max_bytes: usize,
    /// Share of entries kept by one rotation, in `(0, 1]`.
    pub keep_ratio: f64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
            keep_ratio: DEFAULT_KEEP_RATIO,
        }
    }
}

impl MemoryConfig {
    pub fn validate(&self) -> MemoryResult<()> {
        if self.max_bytes == 0 {
            return Err(MemoryError::InvalidConfig("max_bytes must be > 0".into()));
        }
        if !(self.keep_ratio > 0.0 && self.keep_ratio <= 1.0) {
            return Err(MemoryError::InvalidConfig(format!(
                "keep_ratio must be in (0, 1], got {}",
                self.keep_ratio
            )));
        }
        Ok(())
    }
}

/// Outcome of one rotation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationReport {
    pub before: usize,
    pub after: usize,
    /// Error types of the evicted entries, oldest last.
    pub dropped: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveReport {
    pub entries_written: usize,
    pub bytes_written: usize,
    pub rotation: Option<RotationReport>,
    /// True when the payload is still above the budget after rotating.
    pub over_budget: bool,
}

/// Summary of the stored file for inspection tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub entries: usize,
    pub bytes: u64,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
}

/// Keep the most recently seen `keep_ratio` share of `entries`.
///
/// Sorted by `lastSeen` descending, ties broken by `errorType` ascending so
/// the result is deterministic. Keeps `floor(keep_ratio * n)` entries.
pub fn rotate(mut entries: Vec<MemoryEntry>, keep_ratio: f64) -> (Vec<MemoryEntry>, RotationReport) {
    let before = entries.len();
    entries.sort_by(|a, b| {
        b.last_seen
            .cmp(&a.last_seen)
            .then_with(|| a.error_type.cmp(&b.error_type))
    });
    let keep = keep_count(before, keep_ratio);
    let dropped = entries
        .split_off(keep)
        .into_iter()
        .map(|e| e.error_type)
        .collect();
    let report = RotationReport {
        before,
        after: entries.len(),
        dropped,
    };
    (entries, report)
}

fn keep_count(n: usize, ratio: f64) -> usize {
    // Epsilon guards against 0.8 * n landing just below an integer.
    (((n as f64) * ratio) + 1e-9).floor().min(n as f64) as usize
}

/// Fold `correction` into the matching entry, creating it if needed.
pub fn apply_correction(entries: &mut Vec<MemoryEntry>, correction: &Correction, now: DateTime<Utc>) {
    match entries
        .iter_mut()
        .find(|e| e.error_type == correction.error_type)
    {
        Some(entry) => entry.record(correction, now),
        None => {
            let mut entry = MemoryEntry::new(correction.error_type.clone(), now);
            entry.record(correction, now);
            entries.push(entry);
        }
    }
}

/// Owner of one memory file.
#[derive(Debug, Clone)]
pub struct MemoryManager {
    path: PathBuf,
    config: MemoryConfig,
}

impl MemoryManager {
    pub fn new(path: impl Into<PathBuf>, config: MemoryConfig) -> MemoryResult<Self> {
        config.validate()?;
        Ok(Self {
            path: path.into(),
            config,
        })
    }

    /// Default location `<workspace>/.odavl/memory/patterns.json`.
    pub fn for_workspace(workspace: &Path) -> Self {
        Self {
            path: Self::default_path(workspace),
            config: MemoryConfig::default(),
        }
    }

    pub fn default_path(workspace: &Path) -> PathBuf {
        storage::state_dir(workspace)
            .join("memory")
            .join("patterns.json")
    }

    pub fn with_config(mut self, config: MemoryConfig) -> MemoryResult<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Load entries, treating a damaged file as empty.
    pub async fn load(&self) -> Vec<MemoryEntry> {
        match self.try_load().await {
            Ok(entries) => entries,
            Err(e) => {
                obs::emit_best_effort_failure("memory.load", &e);
                Vec::new()
            }
        }
    }

    /// Load entries, surfacing corruption as [`MemoryError::Corrupt`].
    pub async fn try_load(&self) -> MemoryResult<Vec<MemoryEntry>> {
        let Some(bytes) = storage::read_optional(&self.path).await? else {
            return Ok(Vec::new());
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        let format: MemoryFileFormat =
            serde_json::from_slice(&bytes).map_err(|e| MemoryError::corrupt(&self.path, e))?;
        if format.is_legacy() {
            debug!(path = %self.path.display(), "upgrading legacy map-format memory file");
        }
        Ok(format.into_entries())
    }

    /// Persist `entries`, rotating once if they exceed the byte budget.
    pub async fn save(&self, entries: Vec<MemoryEntry>) -> MemoryResult<SaveReport> {
        let mut payload = serde_json::to_vec(&entries)?;
        let mut written = entries.len();
        let mut rotation = None;

        if payload.len() > self.config.max_bytes {
            let (kept, report) = rotate(entries, self.config.keep_ratio);
            payload = serde_json::to_vec(&kept)?;
            written = kept.len();
            METRICS.inc_rotations();
            obs::emit_memory_rotated(report.before, report.after, payload.len());
            rotation = Some(report);
        }

        let over_budget = payload.len() > self.config.max_bytes;
        if over_budget {
            warn!(
                path = %self.path.display(),
                bytes = payload.len(),
                max_bytes = self.config.max_bytes,
                "memory file still over budget after rotation"
            );
        }

        let bytes_written = payload.len();
        storage::write_atomic(&self.path, payload).await?;
        Ok(SaveReport {
            entries_written: written,
            bytes_written,
            rotation,
            over_budget,
        })
    }

    /// Load, fold in `corrections`, and save.
    pub async fn record_outcomes(
        &self,
        corrections: &[(Correction, DateTime<Utc>)],
    ) -> MemoryResult<SaveReport> {
        let mut entries = self.load().await;
        for (correction, at) in corrections {
            apply_correction(&mut entries, correction, *at);
        }
        self.save(entries).await
    }

    pub async fn stats(&self) -> MemoryResult<MemoryStats> {
        let entries = self.try_load().await?;
        let bytes = match tokio::fs::metadata(&self.path).await {
            Ok(m) => m.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => return Err(e.into()),
        };
        Ok(MemoryStats {
            entries: entries.len(),
            bytes,
            oldest: entries.iter().map(|e| e.last_seen).min(),
            newest: entries.iter().map(|e| e.last_seen).max(),
        })
    }
}
