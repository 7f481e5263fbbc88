//! Storage Module
//!
//! Where action definitions and shared state live between invocations.
//!
//! - [`object`]: object addressing and the [`ObjectStore`] backends
//! - [`persist`]: YAML/JSON encoding of action lists and contexts

pub mod object;
pub mod persist;

pub use object::{FileObjectStore, MemoryObjectStore, ObjectRef, ObjectStore, StoredObject};
pub use persist::{load_actions, load_state, save_actions, save_state};
