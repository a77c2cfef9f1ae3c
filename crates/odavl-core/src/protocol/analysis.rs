//! Analysis façade: cache-fronted access to the registered analysis adapter.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use uuid::Uuid;

use super::adapters::AnalysisAdapter;
use super::events::{ProtocolEventBus, ProtocolEventKind};
use crate::cache::{cache_key, GlobalCache};
use crate::domain::{AnalysisRequest, InsightResult, OdavlError, Result};
use crate::metrics::METRICS;
use crate::obs;
use crate::registry::{AdapterRegistry, ANALYSIS_PROTOCOL};

/// Cache namespace holding analysis results.
pub const ANALYSIS_CACHE_NAMESPACE: &str = "analysis";

/// Lifetime of a cached analysis result.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

const OPERATION: &str = "analyze";

/// Entry point for analysis requests.
///
/// Identical requests within the TTL are served from the cache without
/// invoking the adapter. Events for one call are emitted in the order
/// `before`, then `cache-hit` or `cache-miss`, then `after` (or `error`
/// when the adapter fails).
#[derive(Debug)]
pub struct AnalysisProtocol {
    registry: Arc<AdapterRegistry>,
    cache: Arc<GlobalCache>,
    events: ProtocolEventBus,
    cache_enabled: AtomicBool,
    cache_ttl: Duration,
}

impl AnalysisProtocol {
    pub fn new(registry: Arc<AdapterRegistry>, cache: Arc<GlobalCache>) -> Self {
        Self {
            registry,
            cache,
            events: ProtocolEventBus::new(ANALYSIS_PROTOCOL),
            cache_enabled: AtomicBool::new(true),
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    pub fn events(&self) -> &ProtocolEventBus {
        &self.events
    }

    /// Disabled caching makes every call an unconditional miss.
    pub fn set_cache_enabled(&self, enabled: bool) {
        self.cache_enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn is_cache_enabled(&self) -> bool {
        self.cache_enabled.load(Ordering::SeqCst)
    }

    /// Drop every cached analysis result.
    pub fn clear_cache(&self) {
        self.cache.clear(ANALYSIS_CACHE_NAMESPACE);
    }

    pub fn ensure_adapter(&self) -> Result<Arc<dyn AnalysisAdapter>> {
        self.registry.analysis().ensure()
    }

    pub async fn request_analysis(&self, request: &AnalysisRequest) -> Result<InsightResult> {
        let adapter = self.ensure_adapter()?;
        let key = cache_key(request)?;
        let call_id = Uuid::new_v4();
        let caching = self.is_cache_enabled();

        obs::emit_analysis_requested(
            &call_id.to_string(),
            &request.workspace.display().to_string(),
            request.detectors.len(),
        );
        self.events.emit(
            ProtocolEventKind::Before,
            OPERATION,
            call_id,
            json!({
                "workspace": request.workspace.display().to_string(),
                "detectors": request.normalized_detectors(),
            }),
        );

        if caching {
            if let Some(hit) = self.cache.get::<InsightResult>(ANALYSIS_CACHE_NAMESPACE, &key) {
                METRICS.inc_cache_hits();
                obs::emit_cache_hit(ANALYSIS_CACHE_NAMESPACE, &key);
                self.events
                    .emit(ProtocolEventKind::CacheHit, OPERATION, call_id, json!({ "key": key }));
                self.events.emit(
                    ProtocolEventKind::After,
                    OPERATION,
                    call_id,
                    json!({ "issues": hit.issues.len(), "cached": true }),
                );
                return Ok(hit);
            }
        }

        METRICS.inc_cache_misses();
        obs::emit_cache_miss(ANALYSIS_CACHE_NAMESPACE, &key);
        self.events
            .emit(ProtocolEventKind::CacheMiss, OPERATION, call_id, json!({ "key": key }));

        METRICS.inc_adapter_invocations();
        let result = match adapter.analyze(request).await {
            Ok(result) => result,
            Err(err) => {
                let err = OdavlError::adapter_failed(ANALYSIS_PROTOCOL, &err);
                self.events.emit(
                    ProtocolEventKind::Error,
                    OPERATION,
                    call_id,
                    json!({ "error": err.to_string() }),
                );
                return Err(err);
            }
        };

        if caching {
            self.cache
                .set(ANALYSIS_CACHE_NAMESPACE, &key, result.clone(), self.cache_ttl);
        }
        self.events.emit(
            ProtocolEventKind::After,
            OPERATION,
            call_id,
            json!({ "issues": result.issues.len(), "cached": false }),
        );
        Ok(result)
    }
}
