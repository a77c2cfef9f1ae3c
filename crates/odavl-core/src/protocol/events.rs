//! Synchronous lifecycle events emitted by the protocol façades.
//!
//! Handlers run in registration order on the caller's task. Each invocation
//! is isolated: an `Err` or a panic from one handler is logged at `warn` and
//! the remaining handlers still run. Observers cannot abort the call they
//! observe.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProtocolEventKind {
    Before,
    After,
    Error,
    CacheHit,
    CacheMiss,
}

impl ProtocolEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::After => "after",
            Self::Error => "error",
            Self::CacheHit => "cache-hit",
            Self::CacheMiss => "cache-miss",
        }
    }
}

impl std::fmt::Display for ProtocolEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One lifecycle event. Every event of a single façade call shares `call_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolEvent {
    pub kind: ProtocolEventKind,
    pub protocol: String,
    pub operation: String,
    pub call_id: Uuid,
    #[serde(default)]
    pub detail: serde_json::Value,
}

/// Observer of protocol events.
///
/// Implemented for any `Fn(&ProtocolEvent) -> anyhow::Result<()>` closure.
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &ProtocolEvent) -> anyhow::Result<()>;
}

impl<F> EventHandler for F
where
    F: Fn(&ProtocolEvent) -> anyhow::Result<()> + Send + Sync,
{
    fn handle(&self, event: &ProtocolEvent) -> anyhow::Result<()> {
        self(event)
    }
}

#[derive(Clone)]
struct Subscription {
    kind: Option<ProtocolEventKind>,
    handler: Arc<dyn EventHandler>,
}

/// Ordered handler list for one façade.
pub struct ProtocolEventBus {
    protocol: &'static str,
    subscriptions: RwLock<Vec<Subscription>>,
}

impl std::fmt::Debug for ProtocolEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtocolEventBus")
            .field("protocol", &self.protocol)
            .field("handlers", &self.handler_count())
            .finish()
    }
}

impl ProtocolEventBus {
    pub fn new(protocol: &'static str) -> Self {
        Self {
            protocol,
            subscriptions: RwLock::new(Vec::new()),
        }
    }

    pub fn protocol(&self) -> &'static str {
        self.protocol
    }

    /// Subscribe `handler` to events of one kind.
    pub fn on(&self, kind: ProtocolEventKind, handler: impl EventHandler + 'static) {
        self.subscribe(Some(kind), Arc::new(handler));
    }

    /// Subscribe `handler` to every event.
    pub fn on_any(&self, handler: impl EventHandler + 'static) {
        self.subscribe(None, Arc::new(handler));
    }

    fn subscribe(&self, kind: Option<ProtocolEventKind>, handler: Arc<dyn EventHandler>) {
        self.subscriptions
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .push(Subscription { kind, handler });
    }

    pub fn handler_count(&self) -> usize {
        self.subscriptions
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .len()
    }

    pub fn clear(&self) {
        self.subscriptions
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .clear();
    }

    /// Build and dispatch an event for `operation`.
    pub fn emit(
        &self,
        kind: ProtocolEventKind,
        operation: &str,
        call_id: Uuid,
        detail: serde_json::Value,
    ) {
        let event = ProtocolEvent {
            kind,
            protocol: self.protocol.to_string(),
            operation: operation.to_string(),
            call_id,
            detail,
        };
        self.dispatch(&event);
    }

    /// Invoke every matching handler in registration order.
    pub fn dispatch(&self, event: &ProtocolEvent) {
        // Snapshot so handlers may subscribe without deadlocking.
        let subscriptions: Vec<Subscription> = self
            .subscriptions
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone();

        for (index, sub) in subscriptions.iter().enumerate() {
            if sub.kind.is_some_and(|k| k != event.kind) {
                continue;
            }
            match catch_unwind(AssertUnwindSafe(|| sub.handler.handle(event))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!(
                    protocol = self.protocol,
                    kind = %event.kind,
                    handler = index,
                    error = %format!("{err:#}"),
                    "event handler failed"
                ),
                Err(payload) => warn!(
                    protocol = self.protocol,
                    kind = %event.kind,
                    handler = index,
                    panic = %panic_message(payload.as_ref()),
                    "event handler panicked"
                ),
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<String>>>;

    struct Recorder {
        tag: &'static str,
        log: Log,
    }

    impl EventHandler for Recorder {
        fn handle(&self, event: &ProtocolEvent) -> anyhow::Result<()> {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.tag, event.kind));
            Ok(())
        }
    }

    fn recorder(tag: &'static str, log: &Log) -> Recorder {
        Recorder {
            tag,
            log: log.clone(),
        }
    }

    #[test]
    fn test_handlers_run_in_registration_order() {
        let bus = ProtocolEventBus::new("analysis");
        let log = Log::default();
        bus.on_any(recorder("first", &log));
        bus.on_any(recorder("second", &log));

        bus.emit(ProtocolEventKind::Before, "analyze", Uuid::new_v4(), serde_json::Value::Null);
        assert_eq!(*log.lock().unwrap(), vec!["first:before", "second:before"]);
    }

    #[test]
    fn test_kind_filter() {
        let bus = ProtocolEventBus::new("analysis");
        let log = Log::default();
        bus.on(ProtocolEventKind::CacheHit, recorder("hits", &log));

        let id = Uuid::new_v4();
        bus.emit(ProtocolEventKind::Before, "analyze", id, serde_json::Value::Null);
        bus.emit(ProtocolEventKind::CacheHit, "analyze", id, serde_json::Value::Null);
        assert_eq!(*log.lock().unwrap(), vec!["hits:cache-hit"]);
    }

    #[test]
    fn test_failing_and_panicking_handlers_are_isolated() {
        let bus = ProtocolEventBus::new("analysis");
        let log = Log::default();
        bus.on_any(|_: &ProtocolEvent| -> anyhow::Result<()> { anyhow::bail!("observer broke") });
        bus.on_any(|_: &ProtocolEvent| -> anyhow::Result<()> { panic!("observer panicked") });
        bus.on_any(recorder("survivor", &log));

        bus.emit(ProtocolEventKind::After, "analyze", Uuid::new_v4(), serde_json::Value::Null);
        assert_eq!(*log.lock().unwrap(), vec!["survivor:after"]);
    }

    #[test]
    fn test_event_kind_wire_names() {
        let json = serde_json::to_string(&ProtocolEventKind::CacheMiss).unwrap();
        assert_eq!(json, "\"cache-miss\"");
        assert_eq!(ProtocolEventKind::CacheHit.as_str(), "cache-hit");
    }
}
