//! Object Storage
//!
//! Documents are addressed by an [`ObjectRef`] (bucket + key, optional
//! version and content type) and read/written through an [`ObjectStore`].
//! The engine ships a local-directory store and an in-memory store; hosts
//! plug in their own blob storage behind the same trait.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Version id requesting a brand-new, empty document.
pub const NEW_VERSION: &str = "new";

/// Location of a stored document.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ObjectRef {
    #[serde(default, alias = "BucketName")]
    pub bucket_name: String,

    #[serde(default, alias = "BucketRegion")]
    pub bucket_region: String,

    #[serde(alias = "Key")]
    pub key: String,

    #[serde(default, alias = "VersionId", skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,

    #[serde(default, alias = "ContentType", skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// Data path prefix the key was derived from
    #[serde(default, alias = "DataPath", skip_serializing_if = "Option::is_none")]
    pub data_path: Option<String>,
}

impl ObjectRef {
    pub fn new(bucket_name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket_name: bucket_name.into(),
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_version(mut self, version_id: impl Into<String>) -> Self {
        self.version_id = Some(version_id.into());
        self
    }

    /// True when the reference asks for a fresh document.
    pub fn is_new(&self) -> bool {
        self.version_id.as_deref() == Some(NEW_VERSION)
    }

    /// `bucket/key`, for messages.
    pub fn location(&self) -> String {
        if self.bucket_name.is_empty() {
            self.key.clone()
        } else {
            format!("{}/{}", self.bucket_name, self.key)
        }
    }
}

/// A document read from a store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: Option<String>,
    pub version_id: Option<String>,
}

/// Blob storage for action definitions and state.
pub trait ObjectStore: Send + Sync {
    /// Reads a document. A missing document is an error.
    fn get(&self, object: &ObjectRef) -> Result<StoredObject>;

    /// Writes a document and returns its new version id, if the store
    /// versions documents.
    fn put(&self, object: &ObjectRef, body: &[u8], content_type: &str) -> Result<Option<String>>;
}

/// Guesses a content type from a key's extension.
pub fn content_type_for_key(key: &str) -> Option<&'static str> {
    match Path::new(key).extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") | Some("actions") | Some("state") => Some("application/x-yaml"),
        Some("json") => Some("application/json"),
        _ => None,
    }
}

/// Store rooted at a local directory: `<root>/<bucket>/<key>`.
#[derive(Debug, Clone)]
pub struct FileObjectStore {
    root: PathBuf,
}

impl FileObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves the file path, rejecting keys that escape the root.
    pub fn path_for(&self, object: &ObjectRef) -> Result<PathBuf> {
        let mut path = self.root.clone();

        for part in [object.bucket_name.as_str(), object.key.as_str()] {
            if part.is_empty() {
                continue;
            }
            let relative = Path::new(part);
            let escapes = relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
            if escapes {
                return Err(EngineError::Storage(format!(
                    "Invalid object location '{}'",
                    object.location()
                )));
            }
            path.push(relative);
        }

        Ok(path)
    }
}

impl ObjectStore for FileObjectStore {
    fn get(&self, object: &ObjectRef) -> Result<StoredObject> {
        let path = self.path_for(object)?;
        trace!("Reading {}", path.display());

        let body = fs::read(&path).map_err(|e| {
            EngineError::Storage(format!("Failed to read '{}': {}", path.display(), e))
        })?;

        Ok(StoredObject {
            body,
            content_type: content_type_for_key(&object.key).map(str::to_string),
            version_id: None,
        })
    }

    fn put(&self, object: &ObjectRef, body: &[u8], _content_type: &str) -> Result<Option<String>> {
        let path = self.path_for(object)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, body).map_err(|e| {
            EngineError::Storage(format!("Failed to write '{}': {}", path.display(), e))
        })?;

        debug!("Wrote {} bytes to {}", body.len(), path.display());
        Ok(None)
    }
}

/// Versioned in-memory store.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<(String, String), StoredObject>>,
    versions: Mutex<u64>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a document directly.
    pub fn insert(&self, object: &ObjectRef, body: &[u8], content_type: &str) -> Result<()> {
        self.put(object, body, content_type).map(|_| ())
    }

    /// Returns true if a document exists at the location.
    pub fn contains(&self, object: &ObjectRef) -> bool {
        self.objects
            .lock()
            .map(|objects| objects.contains_key(&Self::location(object)))
            .unwrap_or(false)
    }

    fn location(object: &ObjectRef) -> (String, String) {
        (object.bucket_name.clone(), object.key.clone())
    }

    fn poisoned<T>(_: T) -> EngineError {
        EngineError::Storage("Memory store lock poisoned".to_string())
    }
}

impl ObjectStore for MemoryObjectStore {
    fn get(&self, object: &ObjectRef) -> Result<StoredObject> {
        let objects = self.objects.lock().map_err(Self::poisoned)?;
        objects
            .get(&Self::location(object))
            .cloned()
            .ok_or_else(|| EngineError::Storage(format!("No such object '{}'", object.location())))
    }

    fn put(&self, object: &ObjectRef, body: &[u8], content_type: &str) -> Result<Option<String>> {
        let version = {
            let mut versions = self.versions.lock().map_err(Self::poisoned)?;
            *versions += 1;
            versions.to_string()
        };

        let mut objects = self.objects.lock().map_err(Self::poisoned)?;
        objects.insert(
            Self::location(object),
            StoredObject {
                body: body.to_vec(),
                content_type: Some(content_type.to_string()),
                version_id: Some(version.clone()),
            },
        );
        Ok(Some(version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_object_ref_aliases() {
        let json = serde_json::json!({
            "BucketName": "artefacts",
            "BucketRegion": "us-east-1",
            "Key": "acme/web/deploy.state",
            "VersionId": "new"
        });
        let object: ObjectRef = serde_json::from_value(json).unwrap();
        assert_eq!(object.location(), "artefacts/acme/web/deploy.state");
        assert!(object.is_new());
    }

    #[test]
    fn test_content_type_for_key() {
        assert_eq!(content_type_for_key("a/b.yaml"), Some("application/x-yaml"));
        assert_eq!(content_type_for_key("a/b.json"), Some("application/json"));
        assert_eq!(content_type_for_key("a/b.txt"), None);
    }

    #[test]
    fn test_file_store_round_trip() {
        let temp = TempDir::new().unwrap();
        let store = FileObjectStore::new(temp.path());
        let object = ObjectRef::new("bucket", "deploy/task.json");

        store.put(&object, b"{}", "application/json").unwrap();
        let stored = store.get(&object).unwrap();

        assert_eq!(stored.body, b"{}");
        assert_eq!(stored.content_type.as_deref(), Some("application/json"));
        assert!(temp.path().join("bucket/deploy/task.json").exists());
    }

    #[test]
    fn test_file_store_missing_object() {
        let temp = TempDir::new().unwrap();
        let store = FileObjectStore::new(temp.path());
        let result = store.get(&ObjectRef::new("bucket", "missing.yaml"));
        assert!(matches!(result, Err(EngineError::Storage(_))));
    }

    #[test]
    fn test_file_store_rejects_escape() {
        let store = FileObjectStore::new("/tmp/actionflow");
        assert!(store.path_for(&ObjectRef::new("bucket", "../etc/passwd")).is_err());
        assert!(store.path_for(&ObjectRef::new("bucket", "/etc/passwd")).is_err());
        assert!(store.path_for(&ObjectRef::new("", "ok/key.yaml")).is_ok());
    }

    #[test]
    fn test_memory_store_versions() {
        let store = MemoryObjectStore::new();
        let object = ObjectRef::new("bucket", "state.yaml");

        assert_eq!(store.put(&object, b"a: 1", "application/x-yaml").unwrap(), Some("1".into()));
        assert_eq!(store.put(&object, b"a: 2", "application/x-yaml").unwrap(), Some("2".into()));

        let stored = store.get(&object).unwrap();
        assert_eq!(stored.body, b"a: 2");
        assert_eq!(stored.version_id.as_deref(), Some("2"));
        assert!(store.contains(&object));
    }
}
