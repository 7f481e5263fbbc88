//! Monitoring Module
//!
//! Per-invocation record of action calls, logged by the handler once the
//! invocation ends.

pub mod timeline;

pub use timeline::{CallKind, CallRecord, ExecutionTimeline};
