//! Action Definitions
//!
//! Static, authored data describing the actions of one task execution.
//!
//! # Example YAML Format
//!
//! ```yaml
//! - name: demo:action/create-bucket
//!   kind: SYSTEM::SetVariables
//!   params:
//!     variables:
//!       BucketName: demo-artefacts
//!   save_outputs: true
//!
//! - name:
//!     namespace: demo:action
//!     name: announce
//!   kind: SYSTEM::NoOp
//!   after: demo:action/create-*
//!   condition: context["demo:output/BucketName"] == "demo-artefacts"
//! ```
//!
//! PascalCase keys (`Name`, `Kind`, `Params`, `DependsOn`, ...) and the
//! legacy `Label`/`Type` keys are accepted as well.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default condition: always run.
pub const DEFAULT_CONDITION: &str = "true";

/// Default scope tag.
pub const DEFAULT_SCOPE: &str = "build";

/// Identity of an action as authored.
///
/// Either a structured `{namespace, name}` descriptor or a single legacy
/// slash-delimited string (`namespace/action` or bare `action`).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ActionName {
    Structured {
        #[serde(default, alias = "Namespace")]
        namespace: String,
        #[serde(alias = "Name")]
        name: String,
    },
    Legacy(String),
}

impl ActionName {
    /// Creates a structured name.
    pub fn structured(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Structured {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl From<&str> for ActionName {
    fn from(value: &str) -> Self {
        Self::Legacy(value.to_string())
    }
}

impl From<String> for ActionName {
    fn from(value: String) -> Self {
        Self::Legacy(value)
    }
}

/// A lifecycle hook as authored on an action.
///
/// `states` lists the lifecycle events (`Pending`, `Running`, `Complete`,
/// `Failed`) the hook fires on.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LifecycleHookSpec {
    /// Hook type, e.g. `status`
    #[serde(rename = "type", alias = "Type")]
    pub hook_type: String,

    /// Lifecycle events this hook fires on
    #[serde(default, alias = "States", deserialize_with = "single_or_vec")]
    pub states: Vec<String>,

    /// Hook parameters (kind-specific)
    #[serde(default, alias = "Parameters", skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,

    /// Top-level keys outside `parameters` (legacy hooks put `Identity` here)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LifecycleHookSpec {
    /// Creates a hook of the given type firing on `states`.
    pub fn new(hook_type: impl Into<String>, states: &[&str]) -> Self {
        Self {
            hook_type: hook_type.into(),
            states: states.iter().map(|s| s.to_string()).collect(),
            parameters: None,
            extra: Map::new(),
        }
    }

    /// Sets the hook parameters.
    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = Some(parameters);
        self
    }
}

/// Deployment identity metadata handed to every action.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct DeploymentDetails {
    #[serde(default, alias = "Client", skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    #[serde(default, alias = "Portfolio", skip_serializing_if = "Option::is_none")]
    pub portfolio: Option<String>,
    #[serde(default, alias = "App", skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,
    #[serde(default, alias = "Branch", skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, alias = "Build", skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,
    #[serde(default, alias = "Component", skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(default, alias = "Environment", skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(default, alias = "DataCenter", skip_serializing_if = "Option::is_none")]
    pub data_center: Option<String>,
    #[serde(default, alias = "Scope", skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl DeploymentDetails {
    /// Colon-joined identity of the deployment (`client:portfolio:app:branch:build`),
    /// stopping at the first missing level.
    pub fn identity(&self) -> String {
        [
            &self.client,
            &self.portfolio,
            &self.app,
            &self.branch,
            &self.build,
        ]
        .iter()
        .map_while(|part| part.as_deref())
        .collect::<Vec<_>>()
        .join(":")
    }
}

/// Static definition of one action.
///
/// Immutable once loaded; the runtime [`crate::action::Action`] is built
/// from it on every invocation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ActionSpec {
    /// Namespaced type tag, e.g. `SYSTEM::NoOp`
    #[serde(alias = "Kind", alias = "type", alias = "Type")]
    pub kind: String,

    /// Identity used for addressing and dependency matching
    #[serde(alias = "Name", alias = "label", alias = "Label")]
    pub name: ActionName,

    /// Kind-specific parameters (opaque to the engine)
    #[serde(default = "default_params", alias = "Params")]
    pub params: Value,

    /// Boolean-producing template expression
    #[serde(
        default = "default_condition",
        alias = "Condition",
        deserialize_with = "string_or_bool"
    )]
    pub condition: String,

    /// Patterns of actions this action must run after
    #[serde(default, alias = "After", deserialize_with = "single_or_vec")]
    pub after: Vec<String>,

    /// Patterns of actions that must run after this action
    #[serde(default, alias = "Before", deserialize_with = "single_or_vec")]
    pub before: Vec<String>,

    /// Legacy spelling of `after`; merged into it at construction
    #[serde(
        default,
        alias = "DependsOn",
        deserialize_with = "single_or_vec",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub depends_on: Vec<String>,

    /// Lifecycle hooks fired on status transitions
    #[serde(default, alias = "LifecycleHooks", skip_serializing_if = "Vec::is_empty")]
    pub lifecycle_hooks: Vec<LifecycleHookSpec>,

    /// Whether outputs are published to the shared output namespace
    #[serde(default, alias = "SaveOutputs")]
    pub save_outputs: bool,

    /// Scope tag
    #[serde(default = "default_scope", alias = "Scope")]
    pub scope: String,
}

fn default_params() -> Value {
    Value::Object(Map::new())
}

fn default_condition() -> String {
    DEFAULT_CONDITION.to_string()
}

fn default_scope() -> String {
    DEFAULT_SCOPE.to_string()
}

/// Deserializes either a single string or array of strings into Vec<String>
fn single_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let val = Value::deserialize(deserializer)?;
    match val {
        Value::Null => Ok(Vec::new()),
        Value::String(s) if s.is_empty() => Ok(Vec::new()),
        Value::String(s) => Ok(vec![s]),
        Value::Array(arr) => arr
            .into_iter()
            .map(|v| match v {
                Value::String(s) => Ok(s),
                _ => Err(de::Error::custom("Expected string in array")),
            })
            .collect(),
        _ => Err(de::Error::custom("Expected string or array of strings")),
    }
}

/// Accepts `condition: true` as well as `condition: "true"`.
fn string_or_bool<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let val = Value::deserialize(deserializer)?;
    match val {
        Value::Null => Ok(default_condition()),
        Value::String(s) if s.trim().is_empty() => Ok(default_condition()),
        Value::String(s) => Ok(s),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(de::Error::custom("Expected condition string or boolean")),
    }
}

impl ActionSpec {
    /// Creates a new action definition with default settings.
    ///
    /// # Example
    ///
    /// ```
    /// use actionflow::action::ActionSpec;
    ///
    /// let spec = ActionSpec::new("demo:action/announce", "SYSTEM::NoOp")
    ///     .after("demo:action/create-*")
    ///     .with_save_outputs(true);
    /// assert_eq!(spec.after, vec!["demo:action/create-*"]);
    /// ```
    pub fn new(name: impl Into<ActionName>, kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into().trim().to_string(),
            name: name.into(),
            params: default_params(),
            condition: default_condition(),
            after: Vec::new(),
            before: Vec::new(),
            depends_on: Vec::new(),
            lifecycle_hooks: Vec::new(),
            save_outputs: false,
            scope: default_scope(),
        }
    }

    /// Adds an `after` pattern.
    pub fn after(mut self, pattern: impl Into<String>) -> Self {
        self.after.push(pattern.into());
        self
    }

    /// Adds a `before` pattern.
    pub fn before(mut self, pattern: impl Into<String>) -> Self {
        self.before.push(pattern.into());
        self
    }

    /// Sets the condition expression.
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = condition.into();
        self
    }

    /// Sets the kind-specific parameters.
    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    /// Adds a lifecycle hook.
    pub fn with_hook(mut self, hook: LifecycleHookSpec) -> Self {
        self.lifecycle_hooks.push(hook);
        self
    }

    /// Sets whether outputs are published.
    pub fn with_save_outputs(mut self, save_outputs: bool) -> Self {
        self.save_outputs = save_outputs;
        self
    }

    /// All `after` patterns including the legacy `depends_on` ones.
    pub fn after_patterns(&self) -> Vec<String> {
        self.after
            .iter()
            .chain(self.depends_on.iter())
            .cloned()
            .collect()
    }
}
