//! Action Runtime
//!
//! [`Action`] wraps one kind-specific [`ActionImpl`] with everything the
//! engine needs: the resolved identity, compiled dependency patterns,
//! validated lifecycle hooks and the status API.
//!
//! Every call into an implementation goes through one guarded boundary.
//! Errors and panics raised inside `resolve`/`execute`/`check`/`cancel`/
//! `unexecute` become a `failed` status with a reason string; they never
//! reach the scheduler.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use log::{debug, error, info, trace, warn};
use serde_json::Value;

use crate::context::Context;
use crate::engine::matcher::LabelPattern;
use crate::error::{BoxError, Result};
use crate::render::{self, Renderer, TeraRenderer};

use super::hooks::{HookEvent, LifecycleHook, LoggingStatusSink, StatusSink};
use super::identity::ActionIdentity;
use super::spec::{ActionSpec, DeploymentDetails};
use super::status::{StatusCode, STATUS_CODE, STATUS_REASON};

/// Reason recorded by `set_complete(None)`.
pub const DEFAULT_COMPLETE_REASON: &str = "Action finished.";

/// Kind-specific behaviour of an action.
///
/// Implementations report progress exclusively through the status API of
/// [`ActionContext`]; returning `Err` (or panicking) marks the action failed.
pub trait ActionImpl: Send {
    /// Renders parameters against the context. Runs before `execute` and `check`.
    fn resolve(&mut self, ctx: &mut ActionContext<'_>) -> std::result::Result<(), BoxError>;

    /// Starts the work. Must leave the action running, complete or failed.
    fn execute(&mut self, ctx: &mut ActionContext<'_>) -> std::result::Result<(), BoxError>;

    /// Polls a running action for completion.
    fn check(&mut self, ctx: &mut ActionContext<'_>) -> std::result::Result<(), BoxError>;

    /// Best-effort abort of in-flight work.
    fn cancel(&mut self, ctx: &mut ActionContext<'_>) -> std::result::Result<(), BoxError>;

    /// Best-effort compensation of completed work.
    fn unexecute(&mut self, ctx: &mut ActionContext<'_>) -> std::result::Result<(), BoxError>;
}

/// External collaborators shared by every action of an invocation.
#[derive(Clone)]
pub struct Collaborators {
    pub renderer: Arc<dyn Renderer>,
    pub sink: Arc<dyn StatusSink>,
}

impl Collaborators {
    pub fn new(renderer: Arc<dyn Renderer>, sink: Arc<dyn StatusSink>) -> Self {
        Self { renderer, sink }
    }
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            renderer: Arc::new(TeraRenderer::new()),
            sink: Arc::new(LoggingStatusSink),
        }
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// Phase of an action call, used in internal-error reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Execute,
    Check,
    Cancel,
    Unexecute,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Execute => "execute",
            Self::Check => "check",
            Self::Cancel => "cancel",
            Self::Unexecute => "unexecute",
        }
    }
}

/// Data shared by the action and the context view handed to implementations.
struct ActionCore {
    kind: String,
    identity: ActionIdentity,
    condition: String,
    after: Vec<LabelPattern>,
    before: Vec<LabelPattern>,
    hooks: Vec<LifecycleHook>,
    save_outputs: bool,
    scope: String,
    details: DeploymentDetails,
    collaborators: Collaborators,
}

impl ActionCore {
    fn status(&self, context: &Context) -> StatusCode {
        context
            .get_str(&self.identity.name, STATUS_CODE)
            .and_then(|code| code.parse().ok())
            .unwrap_or(StatusCode::Pending)
    }

    fn reason<'c>(&self, context: &'c Context) -> Option<&'c str> {
        context.get_str(&self.identity.name, STATUS_REASON)
    }

    /// Writes a new status. No-op when status and reason are unchanged.
    fn set_status(&self, context: &mut Context, code: StatusCode, reason: &str, fire_hooks: bool) {
        if self.status(context) == code && self.reason(context) == Some(reason) {
            trace!("[{}] Status already {} ({}), skipping", self.identity.name, code, reason);
            return;
        }

        if fire_hooks {
            self.fire_hooks(context, code, reason);
        }

        context.set(&self.identity.name, STATUS_CODE, code.as_str());
        context.set(&self.identity.name, STATUS_REASON, reason);
    }

    fn fire_hooks(&self, context: &Context, code: StatusCode, reason: &str) {
        let event = match code {
            StatusCode::Pending => HookEvent::Pending,
            StatusCode::Running => HookEvent::Running,
            StatusCode::Complete => HookEvent::Complete,
            StatusCode::Failed => HookEvent::Failed,
        };

        for hook in self.hooks.iter().filter(|hook| hook.fires_on(event)) {
            hook.fire(
                &self.identity.name,
                event,
                reason,
                context,
                self.collaborators.renderer.as_ref(),
                self.collaborators.sink.as_ref(),
            );
        }
    }

    fn set_failed(&self, context: &mut Context, reason: &str) {
        error!("[{}] Failed - {}", self.identity.name, reason);
        self.set_status(context, StatusCode::Failed, reason, true);
    }

    /// Converts an error or panic escaping an implementation into `failed`.
    fn fail_internal(&self, context: &mut Context, phase: Phase, failure: Failure) {
        let location = format!("{}::{}", self.kind, phase.as_str());
        let mut trace = format!("  at {}", location);

        let (category, message) = match failure {
            Failure::Error(err) => {
                let mut source = err.source();
                while let Some(cause) = source {
                    trace.push_str(&format!("\n  caused by: {}", cause));
                    source = cause.source();
                }
                ("error", err.to_string())
            }
            Failure::Panic(message) => ("panic", message),
        };

        let reason = format!(
            "Internal {} in {} - {}\nTraceback:\n{}",
            category, location, message, trace
        );
        self.set_failed(context, &reason);
    }
}

enum Failure {
    Error(BoxError),
    Panic(String),
}

/// Extracts the message from a caught panic payload.
pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// View of the context bound to one action.
///
/// This is the only way implementations read and write shared state.
pub struct ActionContext<'a> {
    core: &'a ActionCore,
    context: &'a mut Context,
}

impl<'a> ActionContext<'a> {
    /// Full addressable name of the action.
    pub fn name(&self) -> &str {
        &self.core.identity.name
    }

    pub fn kind(&self) -> &str {
        &self.core.kind
    }

    pub fn identity(&self) -> &ActionIdentity {
        &self.core.identity
    }

    pub fn details(&self) -> &DeploymentDetails {
        &self.core.details
    }

    pub fn scope(&self) -> &str {
        &self.core.scope
    }

    /// Read-only access to the whole shared context.
    pub fn context(&self) -> &Context {
        &*self.context
    }

    pub fn status(&self) -> StatusCode {
        self.core.status(&*self.context)
    }

    pub fn reason(&self) -> Option<&str> {
        self.core.reason(&*self.context)
    }

    pub fn is_pending(&self) -> bool {
        self.status() == StatusCode::Pending
    }

    pub fn is_running(&self) -> bool {
        self.status() == StatusCode::Running
    }

    pub fn is_complete(&self) -> bool {
        self.status() == StatusCode::Complete
    }

    pub fn is_failed(&self) -> bool {
        self.status() == StatusCode::Failed
    }

    pub fn set_running(&mut self, reason: &str) {
        info!("[{}] Running - {}", self.name(), reason);
        self.core
            .set_status(self.context, StatusCode::Running, reason, true);
    }

    /// Marks the action complete, with [`DEFAULT_COMPLETE_REASON`] if no reason is given.
    pub fn set_complete(&mut self, reason: Option<&str>) {
        let reason = reason.unwrap_or(DEFAULT_COMPLETE_REASON);
        info!("[{}] Complete - {}", self.name(), reason);
        self.core
            .set_status(self.context, StatusCode::Complete, reason, true);
    }

    pub fn set_failed(&mut self, reason: &str) {
        self.core.set_failed(self.context, reason);
    }

    /// Completes the action without firing lifecycle hooks.
    pub fn set_skipped(&mut self, reason: &str) {
        info!("[{}] Skipped - {}", self.name(), reason);
        self.core
            .set_status(self.context, StatusCode::Complete, reason, false);
    }

    /// Records an output: in the shared output namespace when outputs are
    /// saved, and always in the action's state namespace.
    pub fn set_output(&mut self, name: &str, value: impl Into<Value>) {
        let value = value.into();
        if self.core.save_outputs {
            debug!(
                "[{}] Setting output '{}/{}'",
                self.core.identity.name, self.core.identity.output_namespace, name
            );
            self.context
                .set(&self.core.identity.output_namespace, name, value.clone());
        }
        self.context
            .set(&self.core.identity.state_namespace, name, value);
    }

    /// Reads a saved output. Always `None` when outputs are not saved.
    pub fn get_output(&self, name: &str) -> Option<&Value> {
        if !self.core.save_outputs {
            return None;
        }
        self.context.get(&self.core.identity.output_namespace, name)
    }

    /// Writes a private bookkeeping variable.
    pub fn set_state(&mut self, name: &str, value: impl Into<Value>) {
        self.context
            .set(&self.core.identity.state_namespace, name, value);
    }

    pub fn get_state(&self, name: &str) -> Option<&Value> {
        self.context.get(&self.core.identity.state_namespace, name)
    }

    /// Renders a template against the shared context.
    pub fn render(&self, template: &str) -> Result<String> {
        self.core
            .collaborators
            .renderer
            .render(template, &*self.context)
    }

    /// Renders every string inside a JSON value against the shared context.
    pub fn render_value(&self, value: &Value) -> Result<Value> {
        render::render_value(
            self.core.collaborators.renderer.as_ref(),
            value,
            &*self.context,
        )
    }
}

/// A runnable action: identity, ordering constraints, hooks and the
/// kind-specific implementation.
pub struct Action {
    core: ActionCore,
    implementation: Box<dyn ActionImpl>,
}

impl Action {
    /// Builds an action from its definition and implementation.
    ///
    /// Fails on malformed dependency patterns and unsupported hook types.
    pub fn new(
        spec: &ActionSpec,
        details: &DeploymentDetails,
        implementation: Box<dyn ActionImpl>,
        collaborators: Collaborators,
    ) -> Result<Self> {
        let identity = ActionIdentity::resolve(&spec.name);
        trace!("Building action {} ({})", identity.name, spec.kind);

        let after = LabelPattern::compile_all(&spec.after_patterns())?;
        let before = LabelPattern::compile_all(&spec.before)?;
        let hooks = spec
            .lifecycle_hooks
            .iter()
            .map(|hook| LifecycleHook::from_spec(&identity.name, hook))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            core: ActionCore {
                kind: spec.kind.clone(),
                identity,
                condition: spec.condition.clone(),
                after,
                before,
                hooks,
                save_outputs: spec.save_outputs,
                scope: spec.scope.clone(),
                details: details.clone(),
                collaborators,
            },
            implementation,
        })
    }

    pub fn name(&self) -> &str {
        &self.core.identity.name
    }

    pub fn kind(&self) -> &str {
        &self.core.kind
    }

    pub fn identity(&self) -> &ActionIdentity {
        &self.core.identity
    }

    pub fn condition(&self) -> &str {
        &self.core.condition
    }

    /// Patterns of actions this action must run after (`after` + `depends_on`).
    pub fn after(&self) -> &[LabelPattern] {
        &self.core.after
    }

    /// Patterns of actions that must run after this action.
    pub fn before(&self) -> &[LabelPattern] {
        &self.core.before
    }

    pub fn status(&self, context: &Context) -> StatusCode {
        self.core.status(context)
    }

    pub fn reason<'c>(&self, context: &'c Context) -> Option<&'c str> {
        self.core.reason(context)
    }

    pub fn is_pending(&self, context: &Context) -> bool {
        self.status(context) == StatusCode::Pending
    }

    pub fn is_running(&self, context: &Context) -> bool {
        self.status(context) == StatusCode::Running
    }

    pub fn is_complete(&self, context: &Context) -> bool {
        self.status(context) == StatusCode::Complete
    }

    pub fn is_failed(&self, context: &Context) -> bool {
        self.status(context) == StatusCode::Failed
    }

    /// Binds this action to a context for direct status manipulation.
    pub fn bind<'a>(&'a self, context: &'a mut Context) -> ActionContext<'a> {
        ActionContext {
            core: &self.core,
            context,
        }
    }

    /// Evaluates the condition, then resolves and executes, or skips.
    ///
    /// An execute that leaves the action pending is forced to `failed`.
    pub fn execute(&mut self, context: &mut Context) {
        debug!("[{}] Executing", self.core.identity.name);

        self.guarded(Phase::Execute, context, |implementation, ctx| {
            let template = format!("{{{{ {} }}}}", ctx.core.condition);
            let outcome = ctx.render(&template)?;
            let outcome = outcome.trim();

            if outcome.eq_ignore_ascii_case("true") {
                implementation.resolve(ctx)?;
                implementation.execute(ctx)
            } else {
                ctx.set_skipped(&format!("Condition evaluated to '{}'", outcome));
                Ok(())
            }
        });

        if self.is_pending(context) {
            warn!(
                "[{}] Execute returned without reporting a status",
                self.core.identity.name
            );
            self.core.set_failed(
                context,
                &format!(
                    "Action {}::execute finished without reporting a status (still pending)",
                    self.core.kind
                ),
            );
        }
    }

    /// Resolves and polls a running action.
    pub fn check(&mut self, context: &mut Context) {
        debug!("[{}] Checking", self.core.identity.name);

        self.guarded(Phase::Check, context, |implementation, ctx| {
            implementation.resolve(ctx)?;
            implementation.check(ctx)
        });
    }

    pub fn cancel(&mut self, context: &mut Context) {
        debug!("[{}] Cancelling", self.core.identity.name);
        self.guarded(Phase::Cancel, context, |implementation, ctx| {
            implementation.cancel(ctx)
        });
    }

    pub fn unexecute(&mut self, context: &mut Context) {
        debug!("[{}] Unexecuting", self.core.identity.name);
        self.guarded(Phase::Unexecute, context, |implementation, ctx| {
            implementation.unexecute(ctx)
        });
    }

    /// Runs `call` and converts any error or panic into a failed status.
    fn guarded<F>(&mut self, phase: Phase, context: &mut Context, call: F)
    where
        F: FnOnce(&mut dyn ActionImpl, &mut ActionContext<'_>) -> std::result::Result<(), BoxError>,
    {
        let core = &self.core;
        let implementation = &mut self.implementation;

        let result = {
            let mut ctx = ActionContext {
                core,
                context: &mut *context,
            };
            panic::catch_unwind(AssertUnwindSafe(|| call(implementation.as_mut(), &mut ctx)))
        };

        match result {
            Ok(Ok(())) => {}
            Ok(Err(err)) => core.fail_internal(context, phase, Failure::Error(err)),
            Err(payload) => {
                core.fail_internal(context, phase, Failure::Panic(panic_message(payload)))
            }
        }
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.core.identity.name)
            .field("kind", &self.core.kind)
            .field("after", &self.core.after)
            .field("before", &self.core.before)
            .finish()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.core.identity.name, self.core.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::spec::LifecycleHookSpec;
    use crate::testing::{RecordingStatusSink, Script, ScriptedAction, SinkCall};
    use serde_json::json;

    fn build(spec: &ActionSpec, script: Script) -> Action {
        Action::new(
            spec,
            &DeploymentDetails::default(),
            Box::new(ScriptedAction::new(script)),
            Collaborators::default(),
        )
        .unwrap()
    }

    fn build_with_sink(spec: &ActionSpec, script: Script, sink: Arc<RecordingStatusSink>) -> Action {
        Action::new(
            spec,
            &DeploymentDetails::default(),
            Box::new(ScriptedAction::new(script)),
            Collaborators::new(Arc::new(TeraRenderer::new()), sink),
        )
        .unwrap()
    }

    fn status_hook(states: &[&str]) -> LifecycleHookSpec {
        LifecycleHookSpec::new("status", states).with_parameters(json!({
            "Identity": "acme:web:api:main:7",
            "OnRunning": { "Status": "DEPLOY_IN_PROGRESS" },
            "OnComplete": { "Status": "DEPLOY_COMPLETE" },
            "OnFailed": { "Status": "DEPLOY_FAILED" }
        }))
    }

    #[test]
    fn test_new_action_is_pending() {
        let spec = ActionSpec::new("demo:action/a", "TEST::Scripted");
        let action = build(&spec, Script::complete());
        let context = Context::new();

        assert_eq!(action.status(&context), StatusCode::Pending);
        assert!(action.reason(&context).is_none());
        assert_eq!(action.name(), "demo:action/a");
    }

    #[test]
    fn test_execute_completes() {
        let spec = ActionSpec::new("demo:action/a", "TEST::Scripted");
        let mut action = build(&spec, Script::complete());
        let mut context = Context::new();

        action.execute(&mut context);

        assert!(action.is_complete(&context));
        assert_eq!(
            context.get_str("demo:action/a", STATUS_CODE),
            Some("complete")
        );
        assert_eq!(
            context.get_str("demo:action/a", STATUS_REASON),
            Some(DEFAULT_COMPLETE_REASON)
        );
    }

    #[test]
    fn test_false_condition_skips() {
        let spec = ActionSpec::new("demo:action/a", "TEST::Scripted").with_condition("1 == 2");
        let mut action = build(&spec, Script::fail_with("must not run"));
        let mut context = Context::new();

        action.execute(&mut context);

        assert!(action.is_complete(&context));
        assert_eq!(
            action.reason(&context),
            Some("Condition evaluated to 'false'")
        );
    }

    #[test]
    fn test_condition_reads_context() {
        let spec = ActionSpec::new("demo:action/b", "TEST::Scripted")
            .with_condition("context[\"demo:output/Ready\"] == \"yes\"");
        let mut action = build(&spec, Script::complete());

        let mut context = Context::new();
        context.set("demo:output", "Ready", "yes");
        action.execute(&mut context);

        assert_eq!(action.reason(&context), Some(DEFAULT_COMPLETE_REASON));
    }

    #[test]
    fn test_skip_fires_no_hooks() {
        let sink = Arc::new(RecordingStatusSink::default());
        let spec = ActionSpec::new("demo:action/a", "TEST::Scripted")
            .with_condition("false")
            .with_hook(status_hook(&["Complete"]));
        let mut action = build_with_sink(&spec, Script::complete(), sink.clone());
        let mut context = Context::new();

        action.execute(&mut context);

        assert!(action.is_complete(&context));
        assert!(sink.calls().is_empty());
    }

    #[test]
    fn test_condition_render_error_fails_action() {
        let spec = ActionSpec::new("demo:action/a", "TEST::Scripted")
            .with_condition("undefined_variable == 1");
        let mut action = build(&spec, Script::complete());
        let mut context = Context::new();

        action.execute(&mut context);

        assert!(action.is_failed(&context));
        let reason = action.reason(&context).unwrap();
        assert!(reason.starts_with("Internal error in TEST::Scripted::execute"));
    }

    #[test]
    fn test_error_is_captured() {
        let spec = ActionSpec::new("demo:action/a", "TEST::Scripted");
        let mut action = build(&spec, Script::error("bucket missing"));
        let mut context = Context::new();

        action.execute(&mut context);

        assert!(action.is_failed(&context));
        let reason = action.reason(&context).unwrap();
        assert!(reason.contains("TEST::Scripted::execute"));
        assert!(reason.contains("bucket missing"));
        assert!(reason.contains("Traceback:"));
    }

    #[test]
    fn test_panic_is_captured() {
        let spec = ActionSpec::new("demo:action/a", "TEST::Scripted");
        let mut action = build(&spec, Script::panic("exploded"));
        let mut context = Context::new();

        action.execute(&mut context);

        assert!(action.is_failed(&context));
        let reason = action.reason(&context).unwrap();
        assert!(reason.starts_with("Internal panic in TEST::Scripted::execute - exploded"));
    }

    #[test]
    fn test_execute_without_status_is_failed() {
        let spec = ActionSpec::new("demo:action/a", "TEST::Scripted");
        let mut action = build(&spec, Script::silent());
        let mut context = Context::new();

        action.execute(&mut context);

        assert!(action.is_failed(&context));
        assert!(action.reason(&context).unwrap().contains("still pending"));
    }

    #[test]
    fn test_check_completes_running_action() {
        let spec = ActionSpec::new("demo:action/a", "TEST::Scripted");
        let mut action = build(&spec, Script::running_then_complete(1));
        let mut context = Context::new();

        action.execute(&mut context);
        assert!(action.is_running(&context));

        action.check(&mut context);
        assert!(action.is_complete(&context));
    }

    #[test]
    fn test_check_error_is_captured() {
        let spec = ActionSpec::new("demo:action/a", "TEST::Scripted");
        let mut action = build(&spec, Script::running_then_error("poll failed"));
        let mut context = Context::new();

        action.execute(&mut context);
        action.check(&mut context);

        assert!(action.is_failed(&context));
        assert!(action
            .reason(&context)
            .unwrap()
            .contains("TEST::Scripted::check - poll failed"));
    }

    #[test]
    fn test_set_complete_is_idempotent() {
        let sink = Arc::new(RecordingStatusSink::default());
        let spec = ActionSpec::new("demo:action/a", "TEST::Scripted")
            .with_hook(status_hook(&["Complete"]));
        let action = build_with_sink(&spec, Script::complete(), sink.clone());
        let mut context = Context::new();

        action.bind(&mut context).set_complete(Some("done"));
        let after_first = context.clone();
        action.bind(&mut context).set_complete(Some("done"));

        assert_eq!(context, after_first);
        assert_eq!(sink.calls().len(), 1);
        assert_eq!(action.reason(&context), Some("done"));

        // A different reason is a new status write
        action.bind(&mut context).set_complete(Some("done again"));
        assert_eq!(sink.calls().len(), 2);
    }

    #[test]
    fn test_hooks_fire_before_context_write() {
        let sink = Arc::new(RecordingStatusSink::default());
        let hook = LifecycleHookSpec::new("status", &["Running", "Complete"]).with_parameters(json!({
            "Identity": "acme:web:api:main:7",
            "OnRunning": { "Status": "DEPLOY_IN_PROGRESS" },
            "OnComplete": {
                "Status": "DEPLOY_COMPLETE",
                "Message": "was {{ context[\"demo:action/a/StatusCode\"] }}"
            }
        }));
        let spec = ActionSpec::new("demo:action/a", "TEST::Scripted").with_hook(hook);
        let mut action = build_with_sink(&spec, Script::running_then_complete(1), sink.clone());
        let mut context = Context::new();

        action.execute(&mut context);
        action.check(&mut context);

        assert_eq!(sink.statuses(), vec!["DEPLOY_IN_PROGRESS", "DEPLOY_COMPLETE"]);
        assert_eq!(
            sink.calls()[1],
            SinkCall::Status {
                identity: "acme:web:api:main:7".into(),
                status: "DEPLOY_COMPLETE".into(),
                message: Some(format!("was running - {}", DEFAULT_COMPLETE_REASON)),
            }
        );
    }

    #[test]
    fn test_unsupported_hook_rejected_at_construction() {
        let spec = ActionSpec::new("demo:action/a", "TEST::Scripted")
            .with_hook(LifecycleHookSpec::new("webhook", &["Failed"]));

        let result = Action::new(
            &spec,
            &DeploymentDetails::default(),
            Box::new(ScriptedAction::new(Script::complete())),
            Collaborators::default(),
        );

        assert!(result.is_err());
        assert!(result.unwrap_err().is_configuration());
    }

    #[test]
    fn test_outputs_and_state() {
        let spec = ActionSpec::new("demo:action/a", "TEST::Scripted").with_save_outputs(true);
        let action = build(&spec, Script::complete());
        let mut context = Context::new();

        {
            let mut ctx = action.bind(&mut context);
            ctx.set_output("BucketName", "artefacts");
            ctx.set_state("Attempts", 2);
            assert_eq!(ctx.get_output("BucketName"), Some(&json!("artefacts")));
            assert_eq!(ctx.get_state("Attempts"), Some(&json!(2)));
        }

        assert_eq!(context.get_str("demo:output", "BucketName"), Some("artefacts"));
        assert_eq!(context.get_str("demo:var/a", "BucketName"), Some("artefacts"));
    }

    #[test]
    fn test_outputs_not_saved() {
        let spec = ActionSpec::new("demo:action/a", "TEST::Scripted");
        let action = build(&spec, Script::complete());
        let mut context = Context::new();

        let mut ctx = action.bind(&mut context);
        ctx.set_output("BucketName", "artefacts");
        assert!(ctx.get_output("BucketName").is_none());
        assert_eq!(ctx.get_state("BucketName"), Some(&json!("artefacts")));
        assert!(!ctx.context().contains_key("demo:output/BucketName"));
    }

    #[test]
    fn test_depends_on_merged_into_after() {
        let mut spec = ActionSpec::new("demo:action/b", "TEST::Scripted").after("demo:action/a");
        spec.depends_on.push("demo:action/z".to_string());
        let action = build(&spec, Script::complete());

        let after: Vec<&str> = action.after().iter().map(|p| p.as_str()).collect();
        assert_eq!(after, vec!["demo:action/a", "demo:action/z"]);
    }
}
