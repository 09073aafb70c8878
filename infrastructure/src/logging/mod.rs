//! Logging infrastructure: machine-readable provider call telemetry.
//!
//! Provides [`JsonlTelemetrySink`], a JSONL file writer that implements
//! the [`TelemetrySink`](roundtable_application::TelemetrySink) port.

mod jsonl_telemetry;

pub use jsonl_telemetry::JsonlTelemetrySink;
