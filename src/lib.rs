//! ActionFlow - Resumable Deployment Action Engine
//!
//! Runs a graph of deployment actions under a hard per-invocation time
//! limit. Each invocation loads the shared context, advances actions whose
//! dependencies are satisfied, persists the context and tells the caller
//! whether to call again now, wait, or stop.
//!
//! # Architecture
//!
//! The library is organized into these modules:
//!
//! - [`action`]: Action definitions, lifecycle status, hooks and the registry
//! - [`actions`]: Built-in action kinds
//! - [`engine`]: Dependency resolution, pass scheduling and the invocation handler
//! - [`storage`]: Object store backends and document persistence
//! - [`monitoring`]: Per-invocation call timeline
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use actionflow::action::{ActionRegistry, Collaborators};
//! use actionflow::engine::{Deadline, Handler, TaskPayload};
//! use actionflow::storage::FileObjectStore;
//! use actionflow::EngineConfig;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EngineConfig::from_env();
//!     let store = Arc::new(FileObjectStore::new(&config.data_dir));
//!     let handler = Handler::new(
//!         ActionRegistry::builtin(),
//!         store,
//!         Collaborators::default(),
//!         config.clone(),
//!     );
//!
//!     let payload: TaskPayload = serde_json::from_str(&std::fs::read_to_string("task.json")?)?;
//!     let budget = Deadline::start(config.max_runtime, config.safety_margin);
//!     let result = handler.handle(payload, &budget);
//!     println!("{:?}", result.flow_control);
//!     Ok(())
//! }
//! ```

pub mod action;
pub mod actions;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod monitoring;
pub mod render;
pub mod storage;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use action::{Action, ActionRegistry, ActionSpec, StatusCode};
pub use config::EngineConfig;
pub use context::Context;
pub use engine::{FlowControl, Handler, TaskPayload};
pub use error::{EngineError, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "ActionFlow";
