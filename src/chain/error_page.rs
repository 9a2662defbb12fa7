use serde_json::json;
use tracing::debug;

use super::{Context, Flow, Intercepter, Phase};

/// Renders an error template for responses that unwind with an error status
/// and no body.
///
/// Position this early in the chain: its Response-phase callback then runs
/// last on the unwind, after every other intercepter and the handler had
/// their say, including the empty-bodied responses left behind by a
/// recovered panic.
pub struct ErrorPageIntercepter {
    template: String,
}

impl ErrorPageIntercepter {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }
}

impl Intercepter for ErrorPageIntercepter {
    fn handle(&self, ctx: &mut Context, phase: Phase) -> Flow {
        if phase == Phase::Response && ctx.response.status >= 400 && !ctx.response.has_output() {
            let status = ctx.response.status;
            ctx.set("error.status", json!(status));
            if !ctx.render_named(&self.template) {
                debug!(status, "error page left unrendered");
            }
        }
        Flow::Pass
    }
}
