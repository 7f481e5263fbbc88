//! Invocation Handler
//!
//! Entry point called by the step orchestrator once per time-boxed
//! invocation. Each call:
//! 1. parses the [`TaskPayload`] envelope;
//! 2. loads the action definitions and the shared context;
//! 3. builds the actions through the registry;
//! 4. runs passes while the signal is `execute` and time remains;
//! 5. persists the context and returns the envelope with the new signal.
//!
//! Nothing escapes: every error becomes a `failure` signal with a
//! diagnostic on the returned envelope.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::action::base::panic_message;
use crate::action::{ActionRegistry, ActionSpec, Collaborators, DeploymentDetails};
use crate::config::EngineConfig;
use crate::context::Context;
use crate::error::{EngineError, Result};
use crate::monitoring::ExecutionTimeline;
use crate::storage::{load_actions, load_state, save_state, ObjectRef, ObjectStore};

use super::budget::TimeBudget;
use super::resolver::ActionSet;
use super::scheduler::{run_pass, FlowControl};

/// The envelope exchanged with the orchestrator.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct TaskPayload {
    /// Task being run (deploy, release, teardown, ...)
    #[serde(default, alias = "Task")]
    pub task: String,

    /// Signal returned by the previous invocation
    #[serde(default, alias = "FlowControl", skip_serializing_if = "Option::is_none")]
    pub flow_control: Option<FlowControl>,

    /// Identity of the deployment unit
    #[serde(default, alias = "Identity")]
    pub identity: String,

    #[serde(default, alias = "DeploymentDetails")]
    pub deployment_details: DeploymentDetails,

    /// Where the action definitions are stored
    #[serde(default, alias = "Actions", skip_serializing_if = "Option::is_none")]
    pub actions: Option<ObjectRef>,

    /// Where the shared context is stored
    #[serde(default, alias = "State", skip_serializing_if = "Option::is_none")]
    pub state: Option<ObjectRef>,

    /// Inline action definitions; take precedence over `actions`
    #[serde(default, alias = "PackageActions", skip_serializing_if = "Option::is_none")]
    pub package_actions: Option<Vec<ActionSpec>>,

    /// Why the invocation failed
    #[serde(default, alias = "Diagnostic", skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

impl TaskPayload {
    /// Signal to resume with: missing and `wait` both mean `execute`.
    pub fn resume_signal(&self) -> FlowControl {
        match self.flow_control {
            None | Some(FlowControl::Wait) => FlowControl::Execute,
            Some(signal) => signal,
        }
    }

    fn validate(&self) -> Result<ObjectRef> {
        if self.actions.is_none() && self.package_actions.is_none() {
            return Err(EngineError::InvalidEnvelope(
                "No actions found in the task payload".to_string(),
            ));
        }
        self.state.clone().ok_or_else(|| {
            EngineError::InvalidEnvelope("No state found in the task payload".to_string())
        })
    }

    fn fail(mut self, diagnostic: String) -> Self {
        self.flow_control = Some(FlowControl::Failure);
        self.diagnostic = Some(diagnostic);
        self
    }
}

/// Runs invocations against one store and registry.
pub struct Handler {
    registry: ActionRegistry,
    store: Arc<dyn ObjectStore>,
    collaborators: Collaborators,
    config: EngineConfig,
}

impl Handler {
    pub fn new(
        registry: ActionRegistry,
        store: Arc<dyn ObjectStore>,
        collaborators: Collaborators,
        config: EngineConfig,
    ) -> Self {
        Self {
            registry,
            store,
            collaborators,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Handles a raw JSON event.
    ///
    /// An event that does not parse is returned with `flow_control` set to
    /// `failure` and a diagnostic; storage is not touched.
    pub fn handle_value(&self, event: Value, budget: &dyn TimeBudget) -> Value {
        let payload = match serde_json::from_value::<TaskPayload>(event.clone()) {
            Ok(payload) => payload,
            Err(e) => {
                let diagnostic = format!("Invalid envelope: {}", e);
                error!("{}", diagnostic);
                return reject_event(event, diagnostic);
            }
        };

        let result = self.handle(payload, budget);
        serde_json::to_value(&result).unwrap_or_else(|e| {
            reject_event(event, format!("Failed to encode envelope: {}", e))
        })
    }

    /// Runs one invocation.
    pub fn handle(&self, payload: TaskPayload, budget: &dyn TimeBudget) -> TaskPayload {
        info!(
            "Task '{}' for {} resuming with {}",
            payload.task,
            payload.identity,
            payload.flow_control.map(|s| s.as_str()).unwrap_or("no signal")
        );

        let mut state_ref = match payload.validate() {
            Ok(state_ref) => state_ref,
            Err(e) => {
                error!("{}", e);
                return payload.fail(e.to_string());
            }
        };

        let mut context = match load_state(self.store.as_ref(), &mut state_ref) {
            Ok(context) => context,
            Err(e) => {
                error!("Failed to load state: {}", e);
                return payload.fail(format!("Failed to load state: {}", e));
            }
        };

        let mut timeline = ExecutionTimeline::new();
        let mut payload = payload;

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.run(&mut payload, &mut context, budget, &mut timeline)
        }));
        let (mut signal, mut diagnostic) = match outcome {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                error!("Invocation failed: {}", e);
                (FlowControl::Failure, Some(e.to_string()))
            }
            Err(cause) => {
                let message = format!("Internal panic in invocation - {}", panic_message(cause));
                error!("{}", message);
                (FlowControl::Failure, Some(message))
            }
        };

        if let Err(e) = save_state(self.store.as_ref(), &mut state_ref, &context) {
            error!("Failed to save state: {}", e);
            signal = FlowControl::Failure;
            let message = format!("Failed to save state: {}", e);
            diagnostic = Some(match diagnostic {
                Some(previous) => format!("{}\n{}", previous, message),
                None => message,
            });
        }

        if !timeline.is_empty() {
            debug!("{}", timeline.summary());
        }
        info!(
            "Invocation finished with {} after {} calls",
            signal,
            timeline.len()
        );

        payload.state = Some(state_ref);
        payload.flow_control = Some(signal);
        payload.diagnostic = diagnostic;
        payload
    }

    /// Loads and builds the actions, then runs passes.
    fn run(
        &self,
        payload: &mut TaskPayload,
        context: &mut Context,
        budget: &dyn TimeBudget,
        timeline: &mut ExecutionTimeline,
    ) -> Result<(FlowControl, Option<String>)> {
        let specs = match (&payload.package_actions, payload.actions.as_mut()) {
            (Some(inline), _) => {
                debug!("Using {} inline actions", inline.len());
                inline.clone()
            }
            (None, Some(actions_ref)) => load_actions(self.store.as_ref(), actions_ref)?,
            (None, None) => {
                return Err(EngineError::InvalidEnvelope(
                    "No actions found in the task payload".to_string(),
                ))
            }
        };

        let prior = payload.resume_signal();
        if prior.is_terminal() {
            info!("Previous signal was {}, nothing to run", prior);
            return Ok((prior, payload.diagnostic.clone()));
        }

        let actions = self.registry.build_all(
            &specs,
            context,
            &payload.deployment_details,
            &self.collaborators,
        )?;
        let mut actions = ActionSet::new(actions);

        let mut signal = prior;
        let mut diagnostic = None;
        let mut iterations = 0;

        while signal == FlowControl::Execute {
            if budget.timeout_imminent() {
                info!("Timeout imminent, yielding with {}", signal);
                break;
            }
            if iterations >= self.config.max_iterations {
                warn!(
                    "Reached {} iterations, yielding with {}",
                    self.config.max_iterations, signal
                );
                break;
            }
            if iterations > 0 && !self.config.iteration_pause.is_zero() {
                thread::sleep(self.config.iteration_pause);
            }
            iterations += 1;

            let outcome = run_pass(&mut actions, context, budget, timeline);
            debug!(
                "Pass {} made {} calls, next signal {}",
                iterations, outcome.calls, outcome.signal
            );
            signal = outcome.signal;
            diagnostic = outcome.diagnostic;

            if outcome.calls == 0 && signal == FlowControl::Execute {
                info!("Pass made no calls, yielding");
                break;
            }
        }

        Ok((signal, diagnostic))
    }
}

/// Marks a raw event as failed.
fn reject_event(event: Value, diagnostic: String) -> Value {
    let mut object = match event {
        Value::Object(object) => object,
        _ => serde_json::Map::new(),
    };
    object.insert("flow_control".to_string(), Value::from(FlowControl::Failure.as_str()));
    object.insert("diagnostic".to_string(), Value::from(diagnostic));
    Value::Object(object)
}
