use std::fmt;
use std::sync::Mutex;
use tracing::{error, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Security,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Security => "SECURITY",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives one event per ledger operation. Implementations must swallow
/// their own failures: recording never fails or blocks the operation.
pub trait EventSink {
    fn record(&self, severity: Severity, actor: &str, description: &str);
}

impl<T: EventSink + ?Sized> EventSink for &T {
    fn record(&self, severity: Severity, actor: &str, description: &str) {
        (**self).record(severity, actor, description)
    }
}

/// Forwards events to `tracing` under the `blockmed::audit` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, severity: Severity, actor: &str, description: &str) {
        match severity {
            Severity::Info => info!(target: "blockmed::audit", actor, "{description}"),
            Severity::Warning => warn!(target: "blockmed::audit", actor, "{description}"),
            Severity::Error => error!(target: "blockmed::audit", actor, "{description}"),
            Severity::Security => {
                warn!(target: "blockmed::audit", actor, security = true, "{description}")
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn record(&self, _: Severity, _: &str, _: &str) {}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    pub severity: Severity,
    pub actor: String,
    pub description: String,
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<Event>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn last(&self) -> Option<Event> {
        self.events().pop()
    }
}

impl EventSink for MemorySink {
    fn record(&self, severity: Severity, actor: &str, description: &str) {
        let event = Event {
            severity,
            actor: actor.to_string(),
            description: description.to_string(),
        };
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}
