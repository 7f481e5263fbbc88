//! Action Model
//!
//! Authored definitions, identity derivation, status tracking, lifecycle
//! hooks and the registry that turns definitions into runnable actions.

pub mod base;
pub mod hooks;
pub mod identity;
pub mod registry;
pub mod spec;
pub mod status;

pub use base::{Action, ActionContext, ActionImpl, Collaborators, DEFAULT_COMPLETE_REASON};
pub use hooks::{HookEvent, LoggingStatusSink, StatusSink};
pub use identity::ActionIdentity;
pub use registry::{ActionConstructor, ActionRegistry};
pub use spec::{ActionName, ActionSpec, DeploymentDetails, LifecycleHookSpec};
pub use status::StatusCode;
