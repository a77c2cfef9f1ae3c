//! Named baseline snapshots under `<workspace>/.odavl/baselines/`.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{Issue, OdavlError, Result};
use crate::fingerprint::FingerprintEngine;
use crate::storage;

pub const BASELINE_VERSION: u32 = 1;
pub const DEFAULT_BASELINE: &str = "main";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineMetadata {
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_commit: Option<String>,
    pub total_issues: usize,
    pub total_files: usize,
    #[serde(default)]
    pub detectors: Vec<String>,
    #[serde(default)]
    pub auto_created: bool,
}

/// Caller-supplied metadata for [`BaselineStore::create`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BaselineMeta {
    pub git_commit: Option<String>,
    /// Detectors that produced the snapshot. Derived from the issues when empty.
    pub detectors: Vec<String>,
    pub auto_created: bool,
}

/// A persisted snapshot of accepted issues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Baseline {
    pub name: String,
    pub metadata: BaselineMetadata,
    pub issues: Vec<Issue>,
}

#[derive(Serialize, Deserialize)]
struct BaselineFile {
    version: u32,
    metadata: BaselineMetadata,
    issues: Vec<Issue>,
}

/// Validate a baseline name: `[A-Za-z0-9._-]+`, not starting with `.`.
pub fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(OdavlError::InvalidBaselineName(name.to_string()))
    }
}

/// Baseline persistence for one workspace.
#[derive(Debug, Clone)]
pub struct BaselineStore {
    workspace: PathBuf,
}

impl BaselineStore {
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
        }
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub fn dir(&self) -> PathBuf {
        storage::state_dir(&self.workspace).join("baselines")
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir().join(format!("{name}.json"))
    }

    /// Snapshot `issues` under `name`, replacing any previous baseline.
    pub async fn create(&self, name: &str, issues: Vec<Issue>, meta: BaselineMeta) -> Result<Baseline> {
        validate_name(name)?;
        let engine = FingerprintEngine::with_root(&self.workspace);
        let total_files = issues
            .iter()
            .map(|i| engine.relative_path(&i.file))
            .collect::<BTreeSet<_>>()
            .len();
        let detectors = if meta.detectors.is_empty() {
            issues
                .iter()
                .map(|i| i.detector.clone())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        } else {
            meta.detectors
        };

        let baseline = Baseline {
            name: name.to_string(),
            metadata: BaselineMetadata {
                created_at: Utc::now(),
                git_commit: meta.git_commit,
                total_issues: issues.len(),
                total_files,
                detectors,
                auto_created: meta.auto_created,
            },
            issues,
        };

        let file = BaselineFile {
            version: BASELINE_VERSION,
            metadata: baseline.metadata.clone(),
            issues: baseline.issues.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&file)?;
        storage::write_atomic(&self.path_for(name), bytes).await?;
        info!(
            baseline = %name,
            issues = baseline.metadata.total_issues,
            files = total_files,
            "baseline created"
        );
        Ok(baseline)
    }

    /// Load `name`. Missing files are `BaselineNotFound`; unreadable content
    /// is `BaselineCorrupt`.
    pub async fn load(&self, name: &str) -> Result<Baseline> {
        validate_name(name)?;
        let bytes = storage::read_optional(&self.path_for(name))
            .await?
            .ok_or_else(|| OdavlError::BaselineNotFound {
                name: name.to_string(),
            })?;
        let file: BaselineFile =
            serde_json::from_slice(&bytes).map_err(|e| OdavlError::BaselineCorrupt {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        if file.version == 0 || file.version > BASELINE_VERSION {
            return Err(OdavlError::BaselineCorrupt {
                name: name.to_string(),
                reason: format!("unsupported version {}", file.version),
            });
        }
        Ok(Baseline {
            name: name.to_string(),
            metadata: file.metadata,
            issues: file.issues,
        })
    }

    pub async fn exists(&self, name: &str) -> bool {
        validate_name(name).is_ok() && tokio::fs::try_exists(self.path_for(name)).await.unwrap_or(false)
    }

    /// Every stored baseline, sorted by name.
    pub async fn list(&self) -> Result<Vec<Baseline>> {
        let mut dir = match tokio::fs::read_dir(self.dir()).await {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if validate_name(stem).is_ok() {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();

        let mut baselines = Vec::with_capacity(names.len());
        for name in names {
            baselines.push(self.load(&name).await?);
        }
        Ok(baselines)
    }

    pub async fn delete(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        match tokio::fs::remove_file(self.path_for(name)).await {
            Ok(()) => {
                info!(baseline = %name, "baseline deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(OdavlError::BaselineNotFound {
                name: name.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}
