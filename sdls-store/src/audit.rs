use std::sync::Mutex;

/// One event worth recording: an SA lifecycle transition or a pipeline
/// rejection that populated a Frame Security Report flag.
#[derive(Debug, Clone)]
pub enum AuditAction {
    SaCreated,
    SaRekeyed,
    SaStarted,
    SaStopped,
    SaExpired,
    SaDeleted,
    ApplySucceeded,
    ApplyRejected { reason: &'static str },
    ProcessSucceeded,
    ProcessRejected { reason: &'static str },
}

#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub spi: u16,
    pub action: AuditAction,
}

/// Sink for audit events. Synchronous by construction — every call into
/// this library is a direct, non-suspending call, so nothing here needs to
/// block on an executor (no `tokio::sync::Mutex`, just `std::sync::Mutex`).
pub trait AuditSink {
    fn record(&self, event: AuditEvent);
}

/// Forwards every event to `tracing`.
#[derive(Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent) {
        match &event.action {
            AuditAction::ApplyRejected { reason } | AuditAction::ProcessRejected { reason } => {
                tracing::warn!(spi = event.spi, reason, "sdls pipeline rejected frame");
            }
            other => {
                tracing::debug!(spi = event.spi, action = ?other, "sdls sa event");
            }
        }
    }
}

/// Buffers events in memory for tests and callers that want to drain them
/// directly rather than scrape logs.
#[derive(Debug, Default)]
pub struct InMemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        InMemoryAuditSink {
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn drain(&self) -> Vec<AuditEvent> {
        let mut guard = self.events.lock().expect("audit sink mutex poisoned");
        std::mem::take(&mut guard)
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&self, event: AuditEvent) {
        self.events.lock().expect("audit sink mutex poisoned").push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_sink_drains_in_order() {
        let sink = InMemoryAuditSink::new();
        sink.record(AuditEvent {
            spi: 1,
            action: AuditAction::SaCreated,
        });
        sink.record(AuditEvent {
            spi: 1,
            action: AuditAction::SaStarted,
        });
        let events = sink.drain();
        assert_eq!(events.len(), 2);
        assert!(sink.drain().is_empty());
    }
}
