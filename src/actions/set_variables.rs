//! `SYSTEM::SetVariables`
//!
//! Renders a map of variables against the context and publishes each one
//! as an output of the action.
//!
//! ```yaml
//! - name: demo:action/vars
//!   kind: SYSTEM::SetVariables
//!   save_outputs: true
//!   params:
//!     variables:
//!       BucketName: "{{ context[\"demo:output/Prefix\"] }}-artefacts"
//!       Retries: 3
//! ```

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::action::base::{ActionContext, ActionImpl};
use crate::action::registry::parse_params;
use crate::action::spec::{ActionSpec, DeploymentDetails};
use crate::context::Context;
use crate::error::{BoxError, Result};

pub const SET_VARIABLES_KIND: &str = "SYSTEM::SetVariables";

#[derive(Debug, Deserialize)]
struct SetVariablesParams {
    #[serde(alias = "Variables")]
    variables: Map<String, Value>,
}

/// Publishes rendered variables as outputs.
#[derive(Debug)]
pub struct SetVariablesAction {
    /// Variables as authored
    templates: Map<String, Value>,
    /// Result of the latest `resolve`
    rendered: Option<Map<String, Value>>,
}

impl SetVariablesAction {
    pub fn construct(
        spec: &ActionSpec,
        _context: &Context,
        _details: &DeploymentDetails,
    ) -> Result<Box<dyn ActionImpl>> {
        let params: SetVariablesParams = parse_params(spec)?;
        Ok(Box::new(Self {
            templates: params.variables,
            rendered: None,
        }))
    }
}

impl ActionImpl for SetVariablesAction {
    fn resolve(&mut self, ctx: &mut ActionContext<'_>) -> std::result::Result<(), BoxError> {
        let mut rendered = Map::new();
        for (name, template) in &self.templates {
            rendered.insert(name.clone(), ctx.render_value(template)?);
        }
        self.rendered = Some(rendered);
        Ok(())
    }

    fn execute(&mut self, ctx: &mut ActionContext<'_>) -> std::result::Result<(), BoxError> {
        let variables = self.rendered.as_ref().unwrap_or(&self.templates);
        for (name, value) in variables {
            ctx.set_output(name, value.clone());
        }
        ctx.set_complete(None);
        Ok(())
    }

    fn check(&mut self, ctx: &mut ActionContext<'_>) -> std::result::Result<(), BoxError> {
        ctx.set_failed("Internal error - check() should not have been called");
        Ok(())
    }

    fn cancel(&mut self, _ctx: &mut ActionContext<'_>) -> std::result::Result<(), BoxError> {
        Ok(())
    }

    fn unexecute(&mut self, _ctx: &mut ActionContext<'_>) -> std::result::Result<(), BoxError> {
        Ok(())
    }
}
