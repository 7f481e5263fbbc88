//! Action and State Persistence
//!
//! Encodes action lists and contexts as YAML or JSON depending on the
//! document's content type. Loading records the content type and version
//! seen in the store on the [`ObjectRef`]; saving records the new version.

use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::action::ActionSpec;
use crate::context::Context;
use crate::error::{EngineError, Result};

use super::object::{ObjectRef, ObjectStore};

/// Content type assumed when neither the store nor the reference has one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/x-yaml";

const YAML_TYPES: &[&str] = &[
    "application/x-yaml",
    "application/yaml",
    "text/yaml",
    "text/x-yaml",
];

const JSON_TYPES: &[&str] = &["application/json", "text/json"];

/// Serialization format of a stored document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Json,
}

impl DocumentFormat {
    /// Maps a content type (parameters ignored) to a format.
    pub fn from_content_type(content_type: &str) -> Result<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if YAML_TYPES.contains(&essence.as_str()) {
            Ok(Self::Yaml)
        } else if JSON_TYPES.contains(&essence.as_str()) {
            Ok(Self::Json)
        } else {
            Err(EngineError::UnsupportedContentType(content_type.to_string()))
        }
    }

    /// Decodes a document; empty and `null` documents yield `None`.
    pub fn decode<T: DeserializeOwned>(&self, body: &[u8]) -> Result<Option<T>> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        match self {
            Self::Yaml => Ok(serde_yaml::from_slice::<Option<T>>(body)?),
            Self::Json => Ok(serde_json::from_slice::<Option<T>>(body)?),
        }
    }

    pub fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        match self {
            Self::Yaml => Ok(serde_yaml::to_string(value)?.into_bytes()),
            Self::Json => Ok(serde_json::to_vec_pretty(value)?),
        }
    }
}

fn load_document<T: DeserializeOwned>(
    store: &dyn ObjectStore,
    object: &mut ObjectRef,
) -> Result<Option<T>> {
    let stored = store.get(object)?;

    let content_type = stored
        .content_type
        .or_else(|| object.content_type.clone())
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
    let format = DocumentFormat::from_content_type(&content_type)?;

    object.content_type = Some(content_type);
    if stored.version_id.is_some() {
        object.version_id = stored.version_id;
    }

    format.decode(&stored.body)
}

fn save_document<T: Serialize>(
    store: &dyn ObjectStore,
    object: &mut ObjectRef,
    value: &T,
) -> Result<()> {
    let content_type = object
        .content_type
        .clone()
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
    let body = DocumentFormat::from_content_type(&content_type)?.encode(value)?;

    let version = store.put(object, &body, &content_type)?;
    object.content_type = Some(content_type);
    object.version_id = version;
    Ok(())
}

/// Loads the action definitions of a task.
pub fn load_actions(store: &dyn ObjectStore, object: &mut ObjectRef) -> Result<Vec<ActionSpec>> {
    let actions: Vec<ActionSpec> = load_document(store, object)?.unwrap_or_default();
    info!("Loaded {} actions from {}", actions.len(), object.location());
    Ok(actions)
}

pub fn save_actions(
    store: &dyn ObjectStore,
    object: &mut ObjectRef,
    actions: &[ActionSpec],
) -> Result<()> {
    save_document(store, object, &actions)?;
    debug!("Saved {} actions to {}", actions.len(), object.location());
    Ok(())
}

/// Loads the shared context; a `new` version id starts from an empty one.
pub fn load_state(store: &dyn ObjectStore, object: &mut ObjectRef) -> Result<Context> {
    if object.is_new() {
        info!("Starting with a new state for {}", object.location());
        return Ok(Context::new());
    }

    let context: Context = load_document(store, object)?.unwrap_or_default();
    info!("Loaded {} state variables from {}", context.len(), object.location());
    Ok(context)
}

pub fn save_state(store: &dyn ObjectStore, object: &mut ObjectRef, context: &Context) -> Result<()> {
    save_document(store, object, context)?;
    info!(
        "Saved {} state variables to {}",
        context.len(),
        object.location()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::object::{FileObjectStore, MemoryObjectStore};
    use tempfile::TempDir;

    #[test]
    fn test_format_from_content_type() {
        assert_eq!(
            DocumentFormat::from_content_type("application/x-yaml").unwrap(),
            DocumentFormat::Yaml
        );
        assert_eq!(
            DocumentFormat::from_content_type("Application/JSON; charset=utf-8").unwrap(),
            DocumentFormat::Json
        );
        assert!(matches!(
            DocumentFormat::from_content_type("text/plain"),
            Err(EngineError::UnsupportedContentType(_))
        ));
    }

    #[test]
    fn test_new_state_skips_store() {
        let store = MemoryObjectStore::new();
        let mut object = ObjectRef::new("bucket", "task.state").with_version("new");

        let context = load_state(&store, &mut object).unwrap();
        assert!(context.is_empty());
    }

    #[test]
    fn test_missing_state_is_error() {
        let store = MemoryObjectStore::new();
        let mut object = ObjectRef::new("bucket", "task.state");
        assert!(load_state(&store, &mut object).is_err());
    }

    #[test]
    fn test_null_documents_are_empty() {
        let store = MemoryObjectStore::new();
        let yaml = ObjectRef::new("bucket", "empty.yaml");
        let json = ObjectRef::new("bucket", "null.json");
        store.insert(&yaml, b"", "application/x-yaml").unwrap();
        store.insert(&json, b"null", "application/json").unwrap();

        assert!(load_actions(&store, &mut yaml.clone()).unwrap().is_empty());
        assert!(load_state(&store, &mut json.clone()).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_content_type_is_error() {
        let store = MemoryObjectStore::new();
        let object = ObjectRef::new("bucket", "task.state");
        store.insert(&object, b"a: 1", "text/plain").unwrap();

        let result = load_state(&store, &mut object.clone());
        assert!(matches!(result, Err(EngineError::UnsupportedContentType(_))));
    }

    #[test]
    fn test_state_save_records_version() {
        let store = MemoryObjectStore::new();
        let mut object = ObjectRef::new("bucket", "task.state").with_version("new");

        let mut context = Context::new();
        context.set("demo:action/a", "StatusCode", "complete");
        save_state(&store, &mut object, &context).unwrap();

        assert_eq!(object.version_id.as_deref(), Some("1"));
        assert_eq!(object.content_type.as_deref(), Some(DEFAULT_CONTENT_TYPE));

        let loaded = load_state(&store, &mut object).unwrap();
        assert_eq!(loaded, context);
    }

    #[test]
    fn test_actions_from_yaml_file() {
        let temp = TempDir::new().unwrap();
        let store = FileObjectStore::new(temp.path());
        let dir = temp.path().join("bucket");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("deploy.actions.yaml"),
            r#"
- name: demo:action/vars
  kind: SYSTEM::SetVariables
  params:
    variables:
      Name: demo
- Label: demo:action/done
  Type: SYSTEM::NoOp
  DependsOn: demo:action/vars
"#,
        )
        .unwrap();

        let mut object = ObjectRef::new("bucket", "deploy.actions.yaml");
        let actions = load_actions(&store, &mut object).unwrap();

        assert_eq!(actions.len(), 2);
        assert_eq!(actions[1].kind, "SYSTEM::NoOp");
        assert_eq!(actions[1].after_patterns(), vec!["demo:action/vars"]);
        assert_eq!(object.content_type.as_deref(), Some("application/x-yaml"));
    }

    #[test]
    fn test_save_actions_as_json() {
        let store = MemoryObjectStore::new();
        let mut object =
            ObjectRef::new("bucket", "deploy.actions").with_content_type("application/json");
        let actions = vec![ActionSpec::new("demo:action/a", "SYSTEM::NoOp")];

        save_actions(&store, &mut object, &actions).unwrap();
        let stored = store.get(&object).unwrap();
        let text = String::from_utf8(stored.body).unwrap();
        assert!(text.trim_start().starts_with('['));

        let loaded = load_actions(&store, &mut object).unwrap();
        assert_eq!(loaded, actions);
    }
}
