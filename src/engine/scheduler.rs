//! Pass Scheduler
//!
//! One pass over the action set:
//! 1. stop with `failure` if any action has already failed;
//! 2. `check()` every running action while time remains;
//! 3. `execute()` every runnable action while time remains;
//! 4. recompute the partitions and choose the next [`FlowControl`].
//!
//! A failure observed in step 2 or 3 ends the pass: calls already made
//! finish, but no further action is started.

use std::fmt;
use std::str::FromStr;

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use crate::action::StatusCode;
use crate::context::Context;
use crate::monitoring::{CallKind, ExecutionTimeline};

use super::budget::TimeBudget;
use super::resolver::ActionSet;

/// Control signal driving re-invocation.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FlowControl {
    /// Call again immediately
    #[default]
    Execute,
    /// Call again after a delay
    Wait,
    /// All actions completed
    Success,
    /// An action failed or the graph deadlocked
    Failure,
}

impl FlowControl {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Execute => "execute",
            Self::Wait => "wait",
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }

    /// `success` and `failure` end the workflow.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failure)
    }
}

impl fmt::Display for FlowControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlowControl {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "execute" => Ok(Self::Execute),
            "wait" => Ok(Self::Wait),
            "success" => Ok(Self::Success),
            "failure" => Ok(Self::Failure),
            other => Err(format!("Invalid flow control: {}", other)),
        }
    }
}

/// Result of one pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PassOutcome {
    pub signal: FlowControl,
    /// Number of `check`/`execute` calls made
    pub calls: usize,
    /// Explanation for a `failure` signal
    pub diagnostic: Option<String>,
}

impl PassOutcome {
    fn new(signal: FlowControl, calls: usize) -> Self {
        Self {
            signal,
            calls,
            diagnostic: None,
        }
    }

    fn with_diagnostic(mut self, diagnostic: String) -> Self {
        self.diagnostic = Some(diagnostic);
        self
    }
}

/// Lists failed actions with the first line of their reasons.
fn failure_report(actions: &ActionSet, context: &Context) -> String {
    actions
        .failed(context)
        .into_iter()
        .filter_map(|index| actions.get(index))
        .map(|action| {
            let reason = action
                .reason(context)
                .and_then(|reason| reason.lines().next())
                .unwrap_or("no reason given");
            format!("Action {} failed: {}", action.name(), reason)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Makes one call and records it on the timeline.
fn call(
    actions: &mut ActionSet,
    index: usize,
    kind: CallKind,
    context: &mut Context,
    timeline: &mut ExecutionTimeline,
) -> StatusCode {
    let Some(action) = actions.get_mut(index) else {
        return StatusCode::Pending;
    };

    let start = timeline.start(action.name(), kind);
    match kind {
        CallKind::Execute => action.execute(context),
        CallKind::Check => action.check(context),
    }

    let outcome = action.status(context);
    timeline.finish(start, outcome);
    outcome
}

/// Calls every action in `indices` while time remains.
///
/// Returns the number of calls made and whether one of them failed.
fn advance(
    actions: &mut ActionSet,
    indices: Vec<usize>,
    kind: CallKind,
    context: &mut Context,
    budget: &dyn TimeBudget,
    timeline: &mut ExecutionTimeline,
) -> (usize, bool) {
    let mut calls = 0;

    for index in indices {
        if budget.timeout_imminent() {
            info!("Timeout imminent, deferring remaining {} calls", kind);
            break;
        }

        calls += 1;
        if call(actions, index, kind, context, timeline) == StatusCode::Failed {
            return (calls, true);
        }
    }

    (calls, false)
}

/// Runs one pass and decides the next control signal.
pub fn run_pass(
    actions: &mut ActionSet,
    context: &mut Context,
    budget: &dyn TimeBudget,
    timeline: &mut ExecutionTimeline,
) -> PassOutcome {
    if !actions.failed(context).is_empty() {
        let report = failure_report(actions, context);
        error!("Failed actions present, not advancing:\n{}", report);
        return PassOutcome::new(FlowControl::Failure, 0).with_diagnostic(report);
    }

    let running = actions.running(context);
    debug!("Checking {} running actions", running.len());
    let (mut calls, mut failed) = advance(
        actions,
        running,
        CallKind::Check,
        context,
        budget,
        timeline,
    );

    if !failed {
        let runnable = actions.runnable(context);
        debug!("Executing {} runnable actions", runnable.len());
        let (executed, execute_failed) = advance(
            actions,
            runnable,
            CallKind::Execute,
            context,
            budget,
            timeline,
        );
        calls += executed;
        failed = execute_failed;
    }

    let progress = actions.progress(context);
    info!("Status: {}", progress);

    if failed || progress.failed > 0 {
        let report = failure_report(actions, context);
        error!("{}", report);
        return PassOutcome::new(FlowControl::Failure, calls).with_diagnostic(report);
    }

    if progress.runnable > 0 {
        return PassOutcome::new(FlowControl::Execute, calls);
    }

    if progress.running > 0 {
        return PassOutcome::new(FlowControl::Wait, calls);
    }

    if progress.pending > 0 {
        let report = actions.deadlock_report(context);
        warn!("{}", report);
        return PassOutcome::new(FlowControl::Failure, calls).with_diagnostic(report);
    }

    info!("All {} actions complete", progress.total);
    PassOutcome::new(FlowControl::Success, calls)
}
