//! Adapter registry: one adapter per protocol slot, shared by every façade.
//!
//! The registry is built once at process start and handed to each component
//! as an `Arc<AdapterRegistry>`. Every holder of that `Arc` observes the same
//! slots, so two independent call sites always resolve the identical adapter
//! instance. There is no global static: tests build their own registry or
//! reset a shared one with [`AdapterRegistry::clear_all`].

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, warn};

use crate::domain::{OdavlError, Result};
use crate::protocol::adapters::{
    AnalysisAdapter, PatternMemoryAdapter, RemediationAdapter, VerificationAdapter,
};

pub const ANALYSIS_PROTOCOL: &str = "analysis";
pub const PATTERN_MEMORY_PROTOCOL: &str = "pattern-memory";
pub const REMEDIATION_PROTOCOL: &str = "remediation";
pub const VERIFICATION_PROTOCOL: &str = "verification";

/// A single-adapter slot. A second `register` replaces the first.
pub struct AdapterSlot<T: ?Sized> {
    protocol: &'static str,
    adapter: RwLock<Option<Arc<T>>>,
}

impl<T: ?Sized> AdapterSlot<T> {
    pub fn new(protocol: &'static str) -> Self {
        Self {
            protocol,
            adapter: RwLock::new(None),
        }
    }

    pub fn protocol(&self) -> &'static str {
        self.protocol
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<Arc<T>>> {
        self.adapter.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<Arc<T>>> {
        self.adapter.write().unwrap_or_else(|p| p.into_inner())
    }

    /// Register `adapter`, replacing any previous one (last writer wins).
    pub fn register(&self, adapter: Arc<T>) {
        let mut slot = self.write();
        if slot.is_some() {
            warn!(protocol = self.protocol, "replacing registered adapter");
        } else {
            debug!(protocol = self.protocol, "adapter registered");
        }
        *slot = Some(adapter);
    }

    /// The registered adapter, if any. Never fails.
    pub fn get(&self) -> Option<Arc<T>> {
        self.read().clone()
    }

    pub fn clear(&self) {
        *self.write() = None;
    }

    pub fn is_registered(&self) -> bool {
        self.read().is_some()
    }

    /// The registered adapter, or `AdapterNotRegistered`.
    pub fn ensure(&self) -> Result<Arc<T>> {
        self.get()
            .ok_or_else(|| OdavlError::adapter_not_registered(self.protocol))
    }
}

impl<T: ?Sized> std::fmt::Debug for AdapterSlot<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterSlot")
            .field("protocol", &self.protocol)
            .field("registered", &self.read().is_some())
            .finish()
    }
}

/// Adapter slots for every protocol the core consumes.
#[derive(Debug)]
pub struct AdapterRegistry {
    analysis: AdapterSlot<dyn AnalysisAdapter>,
    pattern_memory: AdapterSlot<dyn PatternMemoryAdapter>,
    remediation: AdapterSlot<dyn RemediationAdapter>,
    verification: AdapterSlot<dyn VerificationAdapter>,
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self {
            analysis: AdapterSlot::new(ANALYSIS_PROTOCOL),
            pattern_memory: AdapterSlot::new(PATTERN_MEMORY_PROTOCOL),
            remediation: AdapterSlot::new(REMEDIATION_PROTOCOL),
            verification: AdapterSlot::new(VERIFICATION_PROTOCOL),
        }
    }

    /// Empty registry behind an `Arc`, ready to share.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn analysis(&self) -> &AdapterSlot<dyn AnalysisAdapter> {
        &self.analysis
    }

    pub fn pattern_memory(&self) -> &AdapterSlot<dyn PatternMemoryAdapter> {
        &self.pattern_memory
    }

    pub fn remediation(&self) -> &AdapterSlot<dyn RemediationAdapter> {
        &self.remediation
    }

    pub fn verification(&self) -> &AdapterSlot<dyn VerificationAdapter> {
        &self.verification
    }

    /// Reset every slot.
    pub fn clear_all(&self) {
        self.analysis.clear();
        self.pattern_memory.clear();
        self.remediation.clear();
        self.verification.clear();
    }
}

/// Collects typed adapters and registers them in one step.
#[derive(Default)]
pub struct RegistryBuilder {
    analysis: Option<Arc<dyn AnalysisAdapter>>,
    pattern_memory: Option<Arc<dyn PatternMemoryAdapter>>,
    remediation: Option<Arc<dyn RemediationAdapter>>,
    verification: Option<Arc<dyn VerificationAdapter>>,
}

impl RegistryBuilder {
    pub fn with_analysis(mut self, adapter: Arc<dyn AnalysisAdapter>) -> Self {
        self.analysis = Some(adapter);
        self
    }

    pub fn with_pattern_memory(mut self, adapter: Arc<dyn PatternMemoryAdapter>) -> Self {
        self.pattern_memory = Some(adapter);
        self
    }

    pub fn with_remediation(mut self, adapter: Arc<dyn RemediationAdapter>) -> Self {
        self.remediation = Some(adapter);
        self
    }

    pub fn with_verification(mut self, adapter: Arc<dyn VerificationAdapter>) -> Self {
        self.verification = Some(adapter);
        self
    }

    /// Register adapters without calling `initialize`.
    pub fn build(self) -> Arc<AdapterRegistry> {
        let registry = AdapterRegistry::shared();
        self.register_into(&registry);
        registry
    }

    /// Initialize every adapter, then register them.
    ///
    /// Nothing is registered if any initialization fails.
    pub async fn bootstrap(self) -> Result<Arc<AdapterRegistry>> {
        if let Some(a) = &self.analysis {
            a.initialize()
                .await
                .map_err(|e| OdavlError::adapter_failed(ANALYSIS_PROTOCOL, &e))?;
        }
        if let Some(a) = &self.pattern_memory {
            a.initialize()
                .await
                .map_err(|e| OdavlError::adapter_failed(PATTERN_MEMORY_PROTOCOL, &e))?;
        }
        if let Some(a) = &self.remediation {
            a.initialize()
                .await
                .map_err(|e| OdavlError::adapter_failed(REMEDIATION_PROTOCOL, &e))?;
        }
        if let Some(a) = &self.verification {
            a.initialize()
                .await
                .map_err(|e| OdavlError::adapter_failed(VERIFICATION_PROTOCOL, &e))?;
        }
        Ok(self.build())
    }

    fn register_into(self, registry: &AdapterRegistry) {
        if let Some(a) = self.analysis {
            registry.analysis.register(a);
        }
        if let Some(a) = self.pattern_memory {
            registry.pattern_memory.register(a);
        }
        if let Some(a) = self.remediation {
            registry.remediation.register(a);
        }
        if let Some(a) = self.verification {
            registry.verification.register(a);
        }
    }
}
