//! `SYSTEM::NoOp`
//!
//! Completes immediately and records when it ran. Useful as a join point
//! in the dependency graph.

use chrono::{SecondsFormat, Utc};
use log::debug;
use serde::Deserialize;

use crate::action::base::{ActionContext, ActionImpl};
use crate::action::registry::parse_params;
use crate::action::spec::{ActionSpec, DeploymentDetails};
use crate::context::Context;
use crate::error::{BoxError, Result};

pub const NOOP_KIND: &str = "SYSTEM::NoOp";

/// Output recording the execution timestamp.
pub const EXECUTION_TIME: &str = "execution_time";

#[derive(Debug, Default, Deserialize)]
struct NoOpParams {}

/// Action that does nothing.
#[derive(Debug, Default)]
pub struct NoOpAction;

impl NoOpAction {
    pub fn construct(
        spec: &ActionSpec,
        _context: &Context,
        _details: &DeploymentDetails,
    ) -> Result<Box<dyn ActionImpl>> {
        let _: NoOpParams = parse_params(spec)?;
        Ok(Box::new(Self))
    }
}

impl ActionImpl for NoOpAction {
    fn resolve(&mut self, _ctx: &mut ActionContext<'_>) -> std::result::Result<(), BoxError> {
        Ok(())
    }

    fn execute(&mut self, ctx: &mut ActionContext<'_>) -> std::result::Result<(), BoxError> {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        debug!("[{}] Setting output {}={}", ctx.name(), EXECUTION_TIME, now);

        ctx.set_output(EXECUTION_TIME, now);
        ctx.set_complete(Some("NoOpAction Execution Complete!"));
        Ok(())
    }

    fn check(&mut self, ctx: &mut ActionContext<'_>) -> std::result::Result<(), BoxError> {
        ctx.set_complete(Some("Check NoOp Action"));
        Ok(())
    }

    fn cancel(&mut self, _ctx: &mut ActionContext<'_>) -> std::result::Result<(), BoxError> {
        Ok(())
    }

    fn unexecute(&mut self, _ctx: &mut ActionContext<'_>) -> std::result::Result<(), BoxError> {
        Ok(())
    }
}
