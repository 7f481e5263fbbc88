//! Template Rendering
//!
//! Conditions and hook/parameter strings are templates rendered against the
//! shared context. The engine only depends on the [`Renderer`] trait; the
//! default implementation is backed by `tera` (Jinja2-compatible syntax).
//!
//! Context keys such as `app:output/BucketName` are not valid template
//! identifiers, so the whole store is exposed as a `context` map and read
//! with bracket syntax:
//!
//! ```text
//! {{ context["app:output/BucketName"] }}
//! ```

use std::error::Error;

use log::trace;
use serde_json::{Map, Value};
use tera::Tera;

use crate::context::Context;
use crate::error::{EngineError, Result};

/// Evaluates template strings against a context.
pub trait Renderer: Send + Sync {
    /// Renders `template` with the variables from `context`.
    fn render(&self, template: &str, context: &Context) -> Result<String>;
}

/// Default renderer using `tera` one-off templates.
#[derive(Debug, Default, Clone)]
pub struct TeraRenderer;

impl TeraRenderer {
    pub fn new() -> Self {
        Self
    }

    fn build_context(context: &Context) -> tera::Context {
        let mut tera_context = tera::Context::new();
        tera_context.insert("context", context.as_map());

        // Keys that happen to be plain identifiers are also exposed directly
        for (key, value) in context.iter() {
            if is_identifier(key) {
                tera_context.insert(key.as_str(), value);
            }
        }

        tera_context
    }
}

impl Renderer for TeraRenderer {
    fn render(&self, template: &str, context: &Context) -> Result<String> {
        trace!("Rendering template: {}", template);

        Tera::one_off(template, &Self::build_context(context), false)
            .map_err(|e| EngineError::Render(format!("'{}': {}", template, describe(&e))))
    }
}

/// Renders every string inside `value`, leaving other scalars untouched.
pub fn render_value(renderer: &dyn Renderer, value: &Value, context: &Context) -> Result<Value> {
    match value {
        Value::String(template) => Ok(Value::String(renderer.render(template, context)?)),
        Value::Array(items) => items
            .iter()
            .map(|item| render_value(renderer, item, context))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        Value::Object(map) => map
            .iter()
            .map(|(key, item)| Ok((key.clone(), render_value(renderer, item, context)?)))
            .collect::<Result<Map<_, _>>>()
            .map(Value::Object),
        other => Ok(other.clone()),
    }
}

/// Flattens a tera error and its causes into one line.
fn describe(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
