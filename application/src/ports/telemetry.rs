//! Port for gateway lifecycle telemetry.
//!
//! Every external call emits `call_start`, then zero or more `call_retry`,
//! then exactly one of `call_success` / `call_failure`.
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostics, while this port captures a machine-readable
//! record of every provider call (JSONL in the default adapter).

use serde_json::Value;

/// A structured telemetry event.
pub struct TelemetryEvent {
    /// Event type identifier (e.g., "call_start", "call_retry").
    pub event_type: &'static str,
    /// JSON payload with event-specific data.
    pub payload: Value,
}

impl TelemetryEvent {
    pub const CALL_START: &'static str = "call_start";
    pub const CALL_RETRY: &'static str = "call_retry";
    pub const CALL_SUCCESS: &'static str = "call_success";
    pub const CALL_FAILURE: &'static str = "call_failure";

    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }
}

/// Sink for telemetry events.
///
/// `record` is synchronous and infallible; a sink that cannot write drops
/// the event rather than disturbing the discussion.
pub trait TelemetrySink: Send + Sync {
    fn record(&self, event: TelemetryEvent);
}

/// No-op implementation for tests and when telemetry is disabled.
pub struct NoTelemetry;

impl TelemetrySink for NoTelemetry {
    fn record(&self, _event: TelemetryEvent) {}
}
