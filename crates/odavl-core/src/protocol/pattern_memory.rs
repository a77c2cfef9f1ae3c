//! Pattern-memory façade. Never caches; every call reaches the adapter.

use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use super::adapters::PatternMemoryAdapter;
use super::events::{ProtocolEventBus, ProtocolEventKind};
use crate::domain::{OdavlError, Result};
use crate::memory::{Correction, PatternQuery, PatternQueryResult};
use crate::metrics::METRICS;
use crate::registry::{AdapterRegistry, PATTERN_MEMORY_PROTOCOL};

#[derive(Debug)]
pub struct PatternMemoryProtocol {
    registry: Arc<AdapterRegistry>,
    events: ProtocolEventBus,
}

impl PatternMemoryProtocol {
    pub fn new(registry: Arc<AdapterRegistry>) -> Self {
        Self {
            registry,
            events: ProtocolEventBus::new(PATTERN_MEMORY_PROTOCOL),
        }
    }

    pub fn events(&self) -> &ProtocolEventBus {
        &self.events
    }

    pub fn ensure_adapter(&self) -> Result<Arc<dyn PatternMemoryAdapter>> {
        self.registry.pattern_memory().ensure()
    }

    pub async fn query(&self, query: &PatternQuery) -> Result<PatternQueryResult> {
        let adapter = self.ensure_adapter()?;
        let call_id = self.begin("query", json!({ "errorTypes": query.error_types }));
        let outcome = adapter.query(query).await;
        self.finish("query", call_id, outcome, |r| json!({ "entries": r.entries.len() }))
    }

    pub async fn learn_from_correction(&self, correction: Correction) -> Result<()> {
        let adapter = self.ensure_adapter()?;
        let call_id = self.begin(
            "learn_from_correction",
            json!({ "errorType": correction.error_type, "success": correction.success }),
        );
        let outcome = adapter.learn_from_correction(correction).await;
        self.finish("learn_from_correction", call_id, outcome, |_| serde_json::Value::Null)
    }

    pub async fn flush(&self) -> Result<()> {
        let adapter = self.ensure_adapter()?;
        let call_id = self.begin("flush", serde_json::Value::Null);
        let outcome = adapter.flush().await;
        self.finish("flush", call_id, outcome, |_| serde_json::Value::Null)
    }

    fn begin(&self, operation: &str, detail: serde_json::Value) -> Uuid {
        let call_id = Uuid::new_v4();
        METRICS.inc_adapter_invocations();
        self.events
            .emit(ProtocolEventKind::Before, operation, call_id, detail);
        call_id
    }

    fn finish<T>(
        &self,
        operation: &str,
        call_id: Uuid,
        outcome: anyhow::Result<T>,
        describe: impl FnOnce(&T) -> serde_json::Value,
    ) -> Result<T> {
        match outcome {
            Ok(value) => {
                self.events
                    .emit(ProtocolEventKind::After, operation, call_id, describe(&value));
                Ok(value)
            }
            Err(err) => {
                let err = OdavlError::adapter_failed(PATTERN_MEMORY_PROTOCOL, &err);
                self.events.emit(
                    ProtocolEventKind::Error,
                    operation,
                    call_id,
                    json!({ "error": err.to_string() }),
                );
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::InMemoryPatternMemory;
    use crate::protocol::events::ProtocolEvent;
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_missing_adapter_is_explicit() {
        let protocol = PatternMemoryProtocol::new(AdapterRegistry::shared());
        let err = protocol.flush().await.unwrap_err();
        match err {
            OdavlError::AdapterNotRegistered { protocol } => assert_eq!(protocol, "pattern-memory"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_learn_then_query_emits_before_after() {
        let registry = AdapterRegistry::builder()
            .with_pattern_memory(Arc::new(InMemoryPatternMemory::default()))
            .build();
        let protocol = PatternMemoryProtocol::new(registry);
        let kinds = Arc::new(Mutex::new(Vec::new()));
        let sink = kinds.clone();
        protocol.events().on_any(move |e: &ProtocolEvent| -> anyhow::Result<()> {
            sink.lock().unwrap().push(format!("{}:{}", e.operation, e.kind));
            Ok(())
        });

        protocol
            .learn_from_correction(Correction::success("xss", 0.7))
            .await
            .unwrap();
        let result = protocol.query(&PatternQuery::for_types(["xss"])).await.unwrap();
        assert_eq!(result.entries.len(), 1);

        assert_eq!(
            *kinds.lock().unwrap(),
            vec![
                "learn_from_correction:before",
                "learn_from_correction:after",
                "query:before",
                "query:after",
            ]
        );
    }
}
