//! Execution Engine
//!
//! Dependency resolution, pass scheduling and the resumable invocation
//! handler.
//!
//! - [`matcher`]: wildcard label patterns used by `after`/`before`
//! - [`resolver`]: runnable/blocked classification and deadlock reports
//! - [`scheduler`]: one time-boxed pass and the resulting [`FlowControl`]
//! - [`handler`]: load, run passes, persist

pub mod budget;
pub mod handler;
pub mod matcher;
pub mod resolver;
pub mod scheduler;

pub use budget::{Deadline, TimeBudget};
pub use handler::{Handler, TaskPayload};
pub use matcher::{label_matches, LabelPattern};
pub use resolver::{ActionSet, Progress};
pub use scheduler::{run_pass, FlowControl, PassOutcome};
