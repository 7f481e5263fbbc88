//! Test Doubles
//!
//! Scripted actions, a recording status sink and a countdown time budget
//! shared by the unit tests of every module.

use std::cell::Cell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;

use crate::action::base::{ActionContext, ActionImpl};
use crate::action::hooks::StatusSink;
use crate::engine::budget::TimeBudget;
use crate::error::BoxError;

/// Kind string the scripted action is registered under in tests.
pub const SCRIPTED_KIND: &str = "TEST::Scripted";

/// What a scripted call does.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Complete,
    Running,
    Fail(String),
    Error(String),
    Panic(String),
    Nothing,
}

/// Behaviour of a scripted action: one step for `execute`, then one step
/// per `check` call. The last check step repeats once the list runs out.
#[derive(Debug, Clone)]
pub struct Script {
    pub execute: Step,
    pub checks: Vec<Step>,
}

impl Script {
    pub fn complete() -> Self {
        Self {
            execute: Step::Complete,
            checks: vec![Step::Complete],
        }
    }

    /// Reports failure through the status API.
    pub fn fail_with(reason: &str) -> Self {
        Self {
            execute: Step::Fail(reason.to_string()),
            checks: vec![Step::Fail(reason.to_string())],
        }
    }

    /// Returns an error from `execute`.
    pub fn error(message: &str) -> Self {
        Self {
            execute: Step::Error(message.to_string()),
            checks: Vec::new(),
        }
    }

    pub fn panic(message: &str) -> Self {
        Self {
            execute: Step::Panic(message.to_string()),
            checks: Vec::new(),
        }
    }

    /// Returns from `execute` without touching the status.
    pub fn silent() -> Self {
        Self {
            execute: Step::Nothing,
            checks: Vec::new(),
        }
    }

    /// Goes running on `execute` and completes on the `checks`-th check.
    pub fn running_then_complete(checks: usize) -> Self {
        let mut steps = vec![Step::Running; checks.saturating_sub(1)];
        steps.push(Step::Complete);
        Self {
            execute: Step::Running,
            checks: steps,
        }
    }

    /// Goes running on `execute` and never finishes.
    pub fn running_forever() -> Self {
        Self {
            execute: Step::Running,
            checks: vec![Step::Running],
        }
    }

    pub fn running_then_error(message: &str) -> Self {
        Self {
            execute: Step::Running,
            checks: vec![Step::Error(message.to_string())],
        }
    }
}

/// Shared call counters for scripted actions.
#[derive(Debug, Default)]
pub struct CallLog {
    executes: AtomicUsize,
    checks: AtomicUsize,
    resolves: AtomicUsize,
}

impl CallLog {
    pub fn executes(&self) -> usize {
        self.executes.load(Ordering::SeqCst)
    }

    pub fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }

    pub fn resolves(&self) -> usize {
        self.resolves.load(Ordering::SeqCst)
    }
}

/// An action whose behaviour is driven by a [`Script`].
///
/// The number of checks already performed is kept in the action's state
/// namespace, so a rebuilt action resumes where the previous one stopped.
pub struct ScriptedAction {
    script: Script,
    log: Arc<CallLog>,
}

impl ScriptedAction {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            log: Arc::new(CallLog::default()),
        }
    }

    pub fn with_log(script: Script, log: Arc<CallLog>) -> Self {
        Self { script, log }
    }

    fn perform(step: &Step, ctx: &mut ActionContext<'_>) -> Result<(), BoxError> {
        match step {
            Step::Complete => ctx.set_complete(None),
            Step::Running => ctx.set_running("Waiting for completion"),
            Step::Fail(reason) => ctx.set_failed(reason),
            Step::Error(message) => return Err(message.clone().into()),
            Step::Panic(message) => panic!("{}", message),
            Step::Nothing => {}
        }
        Ok(())
    }
}

impl ActionImpl for ScriptedAction {
    fn resolve(&mut self, _ctx: &mut ActionContext<'_>) -> Result<(), BoxError> {
        self.log.resolves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn execute(&mut self, ctx: &mut ActionContext<'_>) -> Result<(), BoxError> {
        self.log.executes.fetch_add(1, Ordering::SeqCst);
        Self::perform(&self.script.execute, ctx)
    }

    fn check(&mut self, ctx: &mut ActionContext<'_>) -> Result<(), BoxError> {
        self.log.checks.fetch_add(1, Ordering::SeqCst);

        let done = ctx.get_state("ChecksDone").and_then(Value::as_u64).unwrap_or(0) as usize;
        ctx.set_state("ChecksDone", done + 1);

        let step = self
            .script
            .checks
            .get(done)
            .or_else(|| self.script.checks.last())
            .cloned()
            .unwrap_or(Step::Nothing);

        Self::perform(&step, ctx)
    }

    fn cancel(&mut self, ctx: &mut ActionContext<'_>) -> Result<(), BoxError> {
        ctx.set_failed("Cancelled");
        Ok(())
    }

    fn unexecute(&mut self, ctx: &mut ActionContext<'_>) -> Result<(), BoxError> {
        ctx.set_complete(Some("Unexecuted"));
        Ok(())
    }
}

/// One call received by [`RecordingStatusSink`].
#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    Status {
        identity: String,
        status: String,
        message: Option<String>,
    },
    Released {
        branch: String,
        build: String,
    },
}

/// Status sink that records every call, or fails every call.
#[derive(Debug, Default)]
pub struct RecordingStatusSink {
    calls: Mutex<Vec<SinkCall>>,
    details: Mutex<Vec<Option<Value>>>,
    failing: bool,
}

impl RecordingStatusSink {
    pub fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            details: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    /// Details passed with each status update, in order.
    pub fn details(&self) -> Vec<Option<Value>> {
        self.details.lock().map(|details| details.clone()).unwrap_or_default()
    }

    /// Statuses of all status updates, in order.
    pub fn statuses(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SinkCall::Status { status, .. } => Some(status),
                SinkCall::Released { .. } => None,
            })
            .collect()
    }

    fn record(&self, call: SinkCall) -> Result<(), BoxError> {
        if self.failing {
            return Err("status service unavailable".into());
        }
        self.calls.lock().map_err(|e| e.to_string())?.push(call);
        Ok(())
    }
}

impl StatusSink for RecordingStatusSink {
    fn update_status(
        &self,
        identity: &str,
        status: &str,
        message: Option<&str>,
        details: Option<&Value>,
    ) -> Result<(), BoxError> {
        if !self.failing {
            self.details
                .lock()
                .map_err(|e| e.to_string())?
                .push(details.cloned());
        }
        self.record(SinkCall::Status {
            identity: identity.to_string(),
            status: status.to_string(),
            message: message.map(str::to_string),
        })
    }

    fn set_released_build(&self, branch: &str, build: &str) -> Result<(), BoxError> {
        self.record(SinkCall::Released {
            branch: branch.to_string(),
            build: build.to_string(),
        })
    }
}

/// Budget that allows a fixed number of calls, then reports the timeout
/// as imminent.
#[derive(Debug)]
pub struct CountdownBudget {
    remaining_calls: Cell<usize>,
    queries: Cell<usize>,
}

impl CountdownBudget {
    pub fn new(calls: usize) -> Self {
        Self {
            remaining_calls: Cell::new(calls),
            queries: Cell::new(0),
        }
    }

    pub fn unlimited() -> Self {
        Self::new(usize::MAX)
    }

    /// Number of times the budget was consulted.
    pub fn queries(&self) -> usize {
        self.queries.get()
    }
}

impl TimeBudget for CountdownBudget {
    fn remaining(&self) -> Duration {
        if self.remaining_calls.get() == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs(600)
        }
    }

    fn timeout_imminent(&self) -> bool {
        self.queries.set(self.queries.get() + 1);
        match self.remaining_calls.get() {
            0 => true,
            usize::MAX => false,
            n => {
                self.remaining_calls.set(n - 1);
                false
            }
        }
    }
}
