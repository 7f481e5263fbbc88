//! Action Registry
//!
//! Maps exact kind strings (`SYSTEM::NoOp`) to constructors. Built-in kinds
//! live in a static table; hosts add their own with [`ActionRegistry::register`].
//!
//! Lookups are exact: no prefix matching and no discovery. Kind strings that
//! look like paths are rejected as unknown.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use log::debug;
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;

use crate::actions::{NoOpAction, SetVariablesAction, NOOP_KIND, SET_VARIABLES_KIND};
use crate::context::Context;
use crate::error::{EngineError, Result};

use super::base::{Action, ActionImpl, Collaborators};
use super::spec::{ActionSpec, DeploymentDetails};

/// Builds the implementation for one action definition.
pub type ActionConstructor = Arc<
    dyn Fn(&ActionSpec, &Context, &DeploymentDetails) -> Result<Box<dyn ActionImpl>> + Send + Sync,
>;

static BUILTIN_ACTIONS: Lazy<BTreeMap<&'static str, ActionConstructor>> = Lazy::new(|| {
    let mut table: BTreeMap<&'static str, ActionConstructor> = BTreeMap::new();
    table.insert(NOOP_KIND, Arc::new(NoOpAction::construct));
    table.insert(SET_VARIABLES_KIND, Arc::new(SetVariablesAction::construct));
    table
});

/// Kind-string to constructor table.
#[derive(Clone)]
pub struct ActionRegistry {
    constructors: BTreeMap<String, ActionConstructor>,
}

impl ActionRegistry {
    /// Registry holding only the built-in kinds.
    pub fn builtin() -> Self {
        Self {
            constructors: BUILTIN_ACTIONS
                .iter()
                .map(|(kind, ctor)| (kind.to_string(), ctor.clone()))
                .collect(),
        }
    }

    /// Registry with no kinds at all.
    pub fn empty() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    /// Adds (or replaces) a constructor for `kind`.
    pub fn register<F>(&mut self, kind: &str, constructor: F) -> &mut Self
    where
        F: Fn(&ActionSpec, &Context, &DeploymentDetails) -> Result<Box<dyn ActionImpl>>
            + Send
            + Sync
            + 'static,
    {
        self.constructors
            .insert(kind.trim().to_string(), Arc::new(constructor));
        self
    }

    /// Looks up the constructor for an exact kind string.
    pub fn resolve(&self, kind: &str) -> Result<&ActionConstructor> {
        if !is_valid_kind(kind) {
            return Err(EngineError::UnknownAction(kind.to_string()));
        }
        self.constructors
            .get(kind)
            .ok_or_else(|| EngineError::UnknownAction(kind.to_string()))
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.resolve(kind).is_ok()
    }

    /// Registered kinds in sorted order.
    pub fn kinds(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }

    /// Builds a ready-to-run action from its definition.
    pub fn build(
        &self,
        spec: &ActionSpec,
        context: &Context,
        details: &DeploymentDetails,
        collaborators: &Collaborators,
    ) -> Result<Action> {
        let constructor = self.resolve(&spec.kind)?;
        let implementation = constructor(spec, context, details)?;
        let action = Action::new(spec, details, implementation, collaborators.clone())?;
        debug!("Built action {}", action);
        Ok(action)
    }

    /// Builds every action, stopping at the first configuration error.
    pub fn build_all(
        &self,
        specs: &[ActionSpec],
        context: &Context,
        details: &DeploymentDetails,
        collaborators: &Collaborators,
    ) -> Result<Vec<Action>> {
        specs
            .iter()
            .map(|spec| self.build(spec, context, details, collaborators))
            .collect()
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

/// Kind strings are `Namespace::Name` tags; anything path-like is rejected.
fn is_valid_kind(kind: &str) -> bool {
    !kind.is_empty() && !kind.contains("..") && !kind.contains('/') && !kind.contains('\\')
}

/// Validates an action's parameters into a typed struct.
pub fn parse_params<T: DeserializeOwned>(spec: &ActionSpec) -> Result<T> {
    serde_json::from_value(spec.params.clone()).map_err(|e| EngineError::InvalidParameters {
        kind: spec.kind.clone(),
        name: crate::action::identity::ActionIdentity::resolve(&spec.name).name,
        reason: e.to_string(),
    })
}
