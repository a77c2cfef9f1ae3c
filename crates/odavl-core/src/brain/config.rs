//! Brain configuration, loaded from `<workspace>/.odavl/brain.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::fusion::FusionWeights;
use super::policy::DecisionPolicy;
use crate::baseline::{validate_name, DEFAULT_BASELINE};
use crate::domain::{OdavlError, Result};
use crate::memory::MemoryConfig;
use crate::storage;

/// Decision pipeline settings. Every field has a default, so an empty file
/// is a valid configuration.
///
/// ```toml
/// skip_guardian = true
/// baseline = "release"
///
/// [fusion]
/// critical = 30.0
///
/// [memory]
/// max_bytes = 2097152
///
/// [[policy.allow_deploy_if]]
/// type = "max_new_issues"
/// max = 0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrainConfig {
    pub skip_autopilot: bool,
    pub skip_guardian: bool,
    /// Baseline diffed against; a missing baseline means every issue is new.
    pub baseline: String,
    pub fusion: FusionWeights,
    pub policy: DecisionPolicy,
    /// JSON-lines file receiving one record per cycle. Relative paths are
    /// resolved against the workspace.
    pub telemetry_path: Option<PathBuf>,
    /// Feed fix outcomes back into pattern memory after each cycle.
    pub learn_from_outcomes: bool,
    /// Budget of the file-backed pattern memory.
    pub memory: MemoryConfig,
}

impl Default for BrainConfig {
    fn default() -> Self {
        Self {
            skip_autopilot: false,
            skip_guardian: false,
            baseline: DEFAULT_BASELINE.to_string(),
            fusion: FusionWeights::default(),
            policy: DecisionPolicy::default(),
            telemetry_path: None,
            learn_from_outcomes: true,
            memory: MemoryConfig::default(),
        }
    }
}

impl BrainConfig {
    pub const FILE_NAME: &'static str = "brain.toml";

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| OdavlError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content).map_err(|e| match e {
            OdavlError::InvalidConfig(msg) => {
                OdavlError::InvalidConfig(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    /// `<workspace>/.odavl/brain.toml` when present, defaults otherwise.
    pub fn from_workspace(workspace: &Path) -> Result<Self> {
        let path = storage::state_dir(workspace).join(Self::FILE_NAME);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.fusion.validate().map_err(OdavlError::InvalidConfig)?;
        self.memory
            .validate()
            .map_err(|e| OdavlError::InvalidConfig(e.to_string()))?;
        validate_name(&self.baseline)
            .map_err(|_| OdavlError::InvalidConfig(format!("invalid baseline name {:?}", self.baseline)))
    }

    pub fn with_skip_autopilot(mut self, skip: bool) -> Self {
        self.skip_autopilot = skip;
        self
    }

    pub fn with_skip_guardian(mut self, skip: bool) -> Self {
        self.skip_guardian = skip;
        self
    }

    pub fn with_baseline(mut self, name: impl Into<String>) -> Self {
        self.baseline = name.into();
        self
    }

    pub fn with_telemetry_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.telemetry_path = Some(path.into());
        self
    }

    /// Telemetry path resolved against `workspace`.
    pub fn telemetry_path_in(&self, workspace: &Path) -> Option<PathBuf> {
        self.telemetry_path.as_ref().map(|p| {
            if p.is_absolute() {
                p.clone()
            } else {
                workspace.join(p)
            }
        })
    }
}
