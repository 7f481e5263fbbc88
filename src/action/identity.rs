//! Action Identity
//!
//! Derives an action's addressable name and its two context namespaces.
//!
//! | Authored                       | name               | output namespace | state namespace    |
//! |--------------------------------|--------------------|------------------|--------------------|
//! | `demo:action/deploy`           | `demo:action/deploy` | `demo:output`  | `demo:var/deploy`  |
//! | `{namespace: demo, name: x}`   | `demo/x`           | `demo:output`    | `demo:var/x`       |
//! | `deploy`                       | `deploy`           | `output`         | `var/deploy`       |
//!
//! The structured descriptor and the legacy string produce byte-identical
//! namespaces for the same logical identity.

use serde::Serialize;

use super::spec::ActionName;

/// Reserved trailing namespace segment marking an action namespace.
pub const ACTION_MARKER: &str = "action";

/// Replaces [`ACTION_MARKER`] in the output namespace.
pub const OUTPUT_MARKER: &str = "output";

/// Replaces [`ACTION_MARKER`] in the state namespace.
pub const VAR_MARKER: &str = "var";

/// Resolved identity of an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionIdentity {
    /// Namespace part (may be empty)
    pub namespace: String,
    /// Bare action name within the namespace
    pub action: String,
    /// Full addressable name (`namespace/action` or `action`)
    pub name: String,
    /// Namespace shared outputs are written to
    pub output_namespace: String,
    /// Private bookkeeping namespace
    pub state_namespace: String,
}

impl ActionIdentity {
    /// Resolves the identity from an authored name.
    ///
    /// A structured name is joined and parsed like a legacy string, so a
    /// `/` inside its namespace splits at the same place.
    pub fn resolve(name: &ActionName) -> Self {
        match name {
            ActionName::Structured { namespace, name } => {
                let namespace = namespace.trim().trim_end_matches('/');
                if namespace.is_empty() {
                    Self::parse(name)
                } else {
                    Self::parse(&format!("{}/{}", namespace, name.trim()))
                }
            }
            ActionName::Legacy(label) => Self::parse(label),
        }
    }

    /// Parses a legacy `namespace/action` (or bare `action`) string.
    pub fn parse(label: &str) -> Self {
        let label = label.trim();
        match label.split_once('/') {
            Some((namespace, action)) => Self::from_parts(namespace, action),
            None => Self::from_parts("", label),
        }
    }

    /// Builds the identity from a namespace and a bare action name.
    pub fn from_parts(namespace: &str, action: &str) -> Self {
        let namespace = namespace.trim().trim_end_matches('/');
        let action = action.trim();

        let name = if namespace.is_empty() {
            action.to_string()
        } else {
            format!("{}/{}", namespace, action)
        };

        let base = base_namespace(namespace);
        let output_namespace = qualify(base, OUTPUT_MARKER);
        let state_namespace = format!("{}/{}", qualify(base, VAR_MARKER), action);

        Self {
            namespace: namespace.to_string(),
            action: action.to_string(),
            name,
            output_namespace,
            state_namespace,
        }
    }
}

/// Strips a trailing `:action` marker segment, if present.
fn base_namespace(namespace: &str) -> &str {
    if namespace == ACTION_MARKER {
        return "";
    }
    namespace
        .strip_suffix(ACTION_MARKER)
        .and_then(|rest| rest.strip_suffix(':'))
        .unwrap_or(namespace)
}

fn qualify(base: &str, marker: &str) -> String {
    if base.is_empty() {
        marker.to_string()
    } else {
        format!("{}:{}", base, marker)
    }
}
