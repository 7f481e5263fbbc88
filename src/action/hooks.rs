//! Lifecycle Hooks
//!
//! Hooks attached to an action fire when the action's status changes.
//! The only supported hook type, `status`, pushes a status/message tuple to
//! an external [`StatusSink`] keyed by a colon-delimited identity:
//!
//! - five segments (`client:portfolio:app:branch:build`) address a unit;
//! - six segments address a sub-unit (component) of that unit, and a
//!   failure status on a sub-unit also marks its parent unit.
//!
//! Sink failures are logged and swallowed; an unknown hook type is rejected
//! when the action is constructed.

use std::fmt;
use std::str::FromStr;

use log::{debug, info, warn};
use serde_json::Value;

use crate::context::Context;
use crate::error::{BoxError, EngineError, Result};
use crate::render::{render_value, Renderer};

use super::spec::LifecycleHookSpec;

/// Status value that marks a unit as being released.
pub const RELEASE_IN_PROGRESS: &str = "RELEASE_IN_PROGRESS";

/// Marker contained in every failure status.
pub const FAILED_MARKER: &str = "_FAILED";

/// Lifecycle event a hook can fire on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookEvent {
    Pending,
    Running,
    Complete,
    Failed,
}

impl HookEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Running => "Running",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HookEvent {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "Pending" => Ok(Self::Pending),
            "Running" => Ok(Self::Running),
            "Complete" => Ok(Self::Complete),
            "Failed" => Ok(Self::Failed),
            other => Err(format!("Unknown lifecycle event '{}'", other)),
        }
    }
}

/// Supported hook types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookType {
    Status,
}

impl FromStr for HookType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "status" => Ok(Self::Status),
            other => Err(other.to_string()),
        }
    }
}

/// External receiver of status updates.
pub trait StatusSink: Send + Sync {
    /// Records a status for the unit or sub-unit addressed by `identity`.
    fn update_status(
        &self,
        identity: &str,
        status: &str,
        message: Option<&str>,
        details: Option<&Value>,
    ) -> std::result::Result<(), BoxError>;

    /// Points a branch at the unit currently being released.
    fn set_released_build(&self, branch: &str, build: &str) -> std::result::Result<(), BoxError>;
}

/// Sink that only writes status updates to the log.
#[derive(Debug, Default, Clone)]
pub struct LoggingStatusSink;

impl StatusSink for LoggingStatusSink {
    fn update_status(
        &self,
        identity: &str,
        status: &str,
        message: Option<&str>,
        _details: Option<&Value>,
    ) -> std::result::Result<(), BoxError> {
        info!(
            "[{}] status {} - {}",
            identity,
            status,
            message.unwrap_or_default()
        );
        Ok(())
    }

    fn set_released_build(&self, branch: &str, build: &str) -> std::result::Result<(), BoxError> {
        info!("[{}] released build {}", branch, build);
        Ok(())
    }
}

/// A validated lifecycle hook.
#[derive(Debug, Clone)]
pub struct LifecycleHook {
    hook_type: HookType,
    events: Vec<HookEvent>,
    spec: LifecycleHookSpec,
}

impl LifecycleHook {
    /// Validates an authored hook for the action named `action`.
    pub fn from_spec(action: &str, spec: &LifecycleHookSpec) -> Result<Self> {
        let hook_type = spec
            .hook_type
            .parse::<HookType>()
            .map_err(|hook_type| EngineError::UnsupportedHook {
                action: action.to_string(),
                hook_type,
            })?;

        let events = spec
            .states
            .iter()
            .map(|state| state.parse::<HookEvent>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| EngineError::InvalidSpec(format!("{}: {}", action, e)))?;

        Ok(Self {
            hook_type,
            events,
            spec: spec.clone(),
        })
    }

    /// Returns true if this hook fires on `event`.
    pub fn fires_on(&self, event: HookEvent) -> bool {
        self.events.contains(&event)
    }

    /// Runs the hook. Never fails: problems are logged.
    pub fn fire(
        &self,
        action: &str,
        event: HookEvent,
        reason: &str,
        context: &Context,
        renderer: &dyn Renderer,
        sink: &dyn StatusSink,
    ) {
        match self.hook_type {
            HookType::Status => {
                if let Err(e) = self.fire_status(event, reason, context, renderer, sink) {
                    warn!("[{}] Status hook for {} event failed - {}", action, event, e);
                }
            }
        }
    }

    fn parameters(&self) -> Value {
        match &self.spec.parameters {
            Some(parameters) => parameters.clone(),
            None => Value::Object(self.spec.extra.clone()),
        }
    }

    fn fire_status(
        &self,
        event: HookEvent,
        reason: &str,
        context: &Context,
        renderer: &dyn Renderer,
        sink: &dyn StatusSink,
    ) -> std::result::Result<(), BoxError> {
        let parameters = self.parameters();
        let on_event = parameters.get(format!("On{}", event.as_str()));

        let status = on_event.and_then(|p| p.get("Status")).and_then(Value::as_str);
        let message = on_event.and_then(|p| p.get("Message")).and_then(Value::as_str);
        let identity = parameters.get("Identity").and_then(Value::as_str);
        let details = parameters
            .get("Details")
            .map(|details| render_value(renderer, details, context))
            .transpose()?;

        let status = render_optional(status, context, renderer)?;
        let identity = render_optional(identity, context, renderer)?;
        let message = render_optional(message, context, renderer)?;

        let Some(status) = status else {
            warn!("Status hook was executed, but no status was defined for the {} event", event);
            return Ok(());
        };

        let Some(identity) = identity else {
            warn!("Status hook was executed, but no identity was defined");
            return Ok(());
        };

        let message = match (message, reason.is_empty()) {
            (Some(message), false) => format!("{} - {}", message, reason),
            (Some(message), true) => message,
            (None, _) => reason.to_string(),
        };

        propagate_status(sink, &identity, &status, &message, details.as_ref())
    }
}

/// Renders a template when present; empty results count as absent.
fn render_optional(
    template: Option<&str>,
    context: &Context,
    renderer: &dyn Renderer,
) -> std::result::Result<Option<String>, BoxError> {
    match template {
        Some(template) => {
            let rendered = renderer.render(template, context)?;
            Ok(Some(rendered).filter(|s| !s.trim().is_empty()))
        }
        None => Ok(None),
    }
}

/// Sends a status update to the unit/sub-unit addressed by `identity`.
pub fn propagate_status(
    sink: &dyn StatusSink,
    identity: &str,
    status: &str,
    message: &str,
    details: Option<&Value>,
) -> std::result::Result<(), BoxError> {
    let segments: Vec<&str> = identity.split(':').collect();

    match segments.len() {
        5 => {
            sink.update_status(identity, status, Some(message), details)?;

            if status == RELEASE_IN_PROGRESS {
                let branch = segments[..4].join(":");
                sink.set_released_build(&branch, identity)?;
            }
        }
        6 => {
            sink.update_status(identity, status, Some(message), details)?;

            if status.contains(FAILED_MARKER) {
                let unit = segments[..5].join(":");
                sink.update_status(&unit, status, None, None)?;
            }
        }
        n => {
            debug!(
                "Identity '{}' has {} segments and addresses no unit; status {} not sent",
                identity, n, status
            );
        }
    }

    Ok(())
}
