//! Invocation Timeline
//!
//! Records every `execute`/`check` call made during one invocation, with
//! its wall-clock start, duration and the status it left behind.

use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::action::StatusCode;

/// Kind of action call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Execute,
    Check,
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Execute => f.write_str("execute"),
            Self::Check => f.write_str("check"),
        }
    }
}

/// One recorded action call.
#[derive(Debug, Clone)]
pub struct CallRecord {
    /// Name of the action
    pub action: String,
    pub call: CallKind,
    /// Wall-clock time the call started
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    /// Status after the call returned
    pub outcome: StatusCode,
}

/// A call in progress; finish it with [`ExecutionTimeline::finish`].
#[derive(Debug)]
pub struct CallStart {
    action: String,
    call: CallKind,
    started_at: DateTime<Utc>,
    instant: Instant,
}

/// Calls made during one invocation.
#[derive(Debug, Clone)]
pub struct ExecutionTimeline {
    records: Vec<CallRecord>,
    start_time: Instant,
}

impl ExecutionTimeline {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            start_time: Instant::now(),
        }
    }

    /// Marks the start of a call.
    pub fn start(&self, action: &str, call: CallKind) -> CallStart {
        CallStart {
            action: action.to_string(),
            call,
            started_at: Utc::now(),
            instant: Instant::now(),
        }
    }

    /// Records a finished call.
    pub fn finish(&mut self, start: CallStart, outcome: StatusCode) {
        self.records.push(CallRecord {
            action: start.action,
            call: start.call,
            started_at: start.started_at,
            duration: start.instant.elapsed(),
            outcome,
        });
    }

    pub fn records(&self) -> &[CallRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Time since the timeline was created.
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Total time spent in calls, per action.
    pub fn durations(&self) -> BTreeMap<String, Duration> {
        let mut durations: BTreeMap<String, Duration> = BTreeMap::new();
        for record in &self.records {
            *durations.entry(record.action.clone()).or_default() += record.duration;
        }
        durations
    }

    /// One line per call plus a total.
    pub fn summary(&self) -> String {
        let mut output = String::from("Invocation timeline:\n");

        for record in &self.records {
            output.push_str(&format!(
                "  {} {:<7} {:<40} -> {:<8} ({} ms)\n",
                record.started_at.format("%H:%M:%S%.3f"),
                record.call.to_string(),
                record.action,
                record.outcome.to_string(),
                record.duration.as_millis()
            ));
        }

        output.push_str(&format!(
            "  {} calls, {} ms total",
            self.records.len(),
            self.elapsed().as_millis()
        ));
        output
    }
}

impl Default for ExecutionTimeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_timeline_creation() {
        let timeline = ExecutionTimeline::new();
        assert!(timeline.is_empty());
        assert!(timeline.durations().is_empty());
    }

    #[test]
    fn test_records_calls() {
        let mut timeline = ExecutionTimeline::new();

        let start = timeline.start("demo:action/a", CallKind::Execute);
        thread::sleep(Duration::from_millis(20));
        timeline.finish(start, StatusCode::Running);

        let start = timeline.start("demo:action/a", CallKind::Check);
        timeline.finish(start, StatusCode::Complete);

        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline.records()[0].call, CallKind::Execute);
        assert_eq!(timeline.records()[1].outcome, StatusCode::Complete);
        assert!(timeline.records()[0].duration >= Duration::from_millis(20));
    }

    #[test]
    fn test_durations_sum_per_action() {
        let mut timeline = ExecutionTimeline::new();

        for _ in 0..2 {
            let start = timeline.start("demo:action/a", CallKind::Check);
            thread::sleep(Duration::from_millis(10));
            timeline.finish(start, StatusCode::Running);
        }
        let start = timeline.start("demo:action/b", CallKind::Execute);
        timeline.finish(start, StatusCode::Complete);

        let durations = timeline.durations();
        assert_eq!(durations.len(), 2);
        assert!(durations["demo:action/a"] >= Duration::from_millis(20));
    }

    #[test]
    fn test_summary() {
        let mut timeline = ExecutionTimeline::default();
        let start = timeline.start("demo:action/a", CallKind::Execute);
        timeline.finish(start, StatusCode::Failed);

        let summary = timeline.summary();
        assert!(summary.starts_with("Invocation timeline:"));
        assert!(summary.contains("demo:action/a"));
        assert!(summary.contains("failed"));
        assert!(summary.contains("1 calls"));
    }
}
