//! Shared Context
//!
//! The flat key/value store every action reads and writes through
//! namespaced keys of the form `"<namespace>/<variable>"`.
//!
//! The context is the only channel through which actions observe each
//! other: it is loaded once per invocation, mutated in memory by every
//! action call, and written back as a whole at the end.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Shared variable namespace for one task execution.
///
/// Keys are globally unique; the last writer wins.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct Context {
    values: BTreeMap<String, Value>,
}

impl Context {
    /// Creates an empty context (first invocation of a task).
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the composite key for a namespace and variable.
    pub fn key(namespace: &str, name: &str) -> String {
        format!("{}/{}", namespace, name)
    }

    /// Returns the value stored under `namespace/name`.
    pub fn get(&self, namespace: &str, name: &str) -> Option<&Value> {
        self.values.get(&Self::key(namespace, name))
    }

    /// Returns the value under `namespace/name` when it is a string.
    pub fn get_str(&self, namespace: &str, name: &str) -> Option<&str> {
        self.get(namespace, name).and_then(Value::as_str)
    }

    /// Stores a value under `namespace/name`, replacing any previous value.
    pub fn set(&mut self, namespace: &str, name: &str, value: impl Into<Value>) {
        self.values.insert(Self::key(namespace, name), value.into());
    }

    /// Stores a value under a full composite key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Returns the value stored under a full composite key.
    pub fn get_key(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Returns true if a full composite key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Number of stored variables.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true when no variables are stored.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over all keys and values in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// Borrows the underlying map.
    pub fn as_map(&self) -> &BTreeMap<String, Value> {
        &self.values
    }
}

impl From<BTreeMap<String, Value>> for Context {
    fn from(values: BTreeMap<String, Value>) -> Self {
        Self { values }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_format() {
        assert_eq!(Context::key("app:var/build", "StatusCode"), "app:var/build/StatusCode");
    }

    #[test]
    fn test_set_and_get() {
        let mut context = Context::new();
        context.set("app:output", "BucketName", "my-bucket");
        context.set("app:output", "Count", 3);

        assert_eq!(context.get_str("app:output", "BucketName"), Some("my-bucket"));
        assert_eq!(context.get("app:output", "Count"), Some(&json!(3)));
        assert!(context.contains_key("app:output/Count"));
        assert_eq!(context.len(), 2);
    }

    #[test]
    fn test_last_writer_wins() {
        let mut context = Context::new();
        context.set("ns", "value", "first");
        context.set("ns", "value", "second");

        assert_eq!(context.get_str("ns", "value"), Some("second"));
        assert_eq!(context.len(), 1);
    }

    #[test]
    fn test_serializes_as_flat_map() {
        let mut context = Context::new();
        context.set("ns:action/a", "StatusCode", "complete");

        let json = serde_json::to_value(&context).unwrap();
        assert_eq!(json, json!({ "ns:action/a/StatusCode": "complete" }));

        let loaded: Context = serde_json::from_value(json).unwrap();
        assert_eq!(loaded, context);
    }

    #[test]
    fn test_get_str_on_non_string() {
        let mut context = Context::new();
        context.set("ns", "flag", true);
        assert!(context.get_str("ns", "flag").is_none());
        assert!(context.get("ns", "missing").is_none());
    }
}
