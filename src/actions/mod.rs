//! Built-in Actions
//!
//! Kinds under the `SYSTEM::` namespace that ship with the engine.

pub mod noop;
pub mod set_variables;

pub use noop::{NoOpAction, NOOP_KIND};
pub use set_variables::{SetVariablesAction, SET_VARIABLES_KIND};
