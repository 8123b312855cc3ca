//! The Progress Bus: a typed publish-subscribe event stream (spec.md §4.6).
//!
//! Grounded on the teacher's `monitoring::logging::log_workflow_event`
//! pattern (structured fields keyed by execution id) but made into an
//! explicit trait object the executor holds, per the design note in
//! spec.md §9 replacing "callback- and closure-based progress handlers"
//! with "an explicit publish-subscribe abstraction with a typed event sum."

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressEventType {
    ExecutionStart,
    ExecutionComplete,
    ExecutionFailed,
    StepStart,
    StepComplete,
    StepFailed,
    StepSkipped,
    ChildStart,
    ChildComplete,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgressEventData {
    #[serde(default)]
    pub step_index: Option<usize>,
    #[serde(default)]
    pub step_name: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub child_execution_id: Option<Uuid>,
    #[serde(default)]
    pub output: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    #[serde(rename = "type")]
    pub event_type: ProgressEventType,
    pub execution_id: Uuid,
    pub workflow_name: String,
    pub timestamp: DateTime<Utc>,
    pub depth: u32,
    #[serde(default)]
    pub data: Option<ProgressEventData>,
}

impl ProgressEvent {
    pub fn new(
        event_type: ProgressEventType,
        execution_id: Uuid,
        workflow_name: impl Into<String>,
        depth: u32,
        data: Option<ProgressEventData>,
    ) -> Self {
        ProgressEvent {
            event_type,
            execution_id,
            workflow_name: workflow_name.into(),
            timestamp: Utc::now(),
            depth,
            data,
        }
    }
}

/// A subscriber to the progress stream. Implementations must not panic;
/// spec.md §4.6: "Handler exceptions must be caught and logged; they must
/// not abort execution or block subsequent emissions" — the bus itself
/// enforces the catch side of that by calling handlers through
/// `std::panic::catch_unwind`-free, `Result`-returning `notify`.
pub trait ProgressHandler: Send + Sync {
    fn notify(&self, event: &ProgressEvent);
}

/// In-process pub/sub surface the Executor emits through.
///
/// A plain `Vec` of handlers behind a mutex is enough here: spec.md §5 says
/// handlers are invoked synchronously in emission order from the executor's
/// own task, so there is no need for a broadcast channel or async fan-out.
#[derive(Clone, Default)]
pub struct ProgressBus {
    handlers: Arc<Mutex<Vec<Arc<dyn ProgressHandler>>>>,
}

impl ProgressBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, handler: Arc<dyn ProgressHandler>) {
        self.handlers.lock().expect("progress bus lock poisoned").push(handler);
    }

    /// Emits `event` to every subscriber in registration order. A handler
    /// that panics is caught so later handlers and the executor itself are
    /// unaffected.
    pub fn emit(&self, event: ProgressEvent) {
        let handlers = self.handlers.lock().expect("progress bus lock poisoned").clone();
        for handler in handlers {
            let event_ref = &event;
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                handler.notify(event_ref);
            }));
            if result.is_err() {
                tracing::error!(
                    execution_id = %event.execution_id,
                    "progress handler panicked while processing {:?}",
                    event.event_type
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHandler(Arc<AtomicUsize>);
    impl ProgressHandler for CountingHandler {
        fn notify(&self, _event: &ProgressEvent) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct PanickingHandler;
    impl ProgressHandler for PanickingHandler {
        fn notify(&self, _event: &ProgressEvent) {
            panic!("boom");
        }
    }

    #[test]
    fn emits_to_every_subscriber_in_order() {
        let bus = ProgressBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        bus.subscribe(Arc::new(CountingHandler(count.clone())));
        bus.subscribe(Arc::new(CountingHandler(count.clone())));
        bus.emit(ProgressEvent::new(
            ProgressEventType::ExecutionStart,
            Uuid::new_v4(),
            "wf",
            0,
            None,
        ));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn a_panicking_handler_does_not_block_later_handlers() {
        let bus = ProgressBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        bus.subscribe(Arc::new(PanickingHandler));
        bus.subscribe(Arc::new(CountingHandler(count.clone())));
        bus.emit(ProgressEvent::new(
            ProgressEventType::StepStart,
            Uuid::new_v4(),
            "wf",
            0,
            None,
        ));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
