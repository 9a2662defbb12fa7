//! The Request → Handle → Response state machine.
//!
//! The chain position is an index into the application's fixed intercepter
//! vector plus a direction; the Request phase increments it, the Response
//! phase decrements from wherever the Request phase ended. A `Stop` on the
//! way in starts the unwind **at the same index**: intercepters past it
//! never ran and therefore have nothing to undo.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, error, info};

use super::{Context, Flow, Intercepter, Phase};
use crate::app::Resolution;

/// Drive one request through the chain and the handler, leaving the finished
/// response in the context for the connection to write.
pub fn run(ctx: &mut Context) {
    let chain: Vec<Arc<dyn Intercepter>> = ctx.app().intercepters().to_vec();

    let mut cursor = 0usize;
    let mut stopped = false;
    while cursor < chain.len() {
        match invoke(chain[cursor].as_ref(), ctx, Phase::Request) {
            Flow::Pass => cursor += 1,
            Flow::Stop => {
                stopped = true;
                break;
            }
        }
    }

    if stopped {
        debug!(request_id = %ctx.request.id, cursor, "request phase stopped before handle");
    } else {
        handle(ctx);
    }

    let mut pos: isize = if stopped {
        cursor as isize
    } else {
        chain.len() as isize - 1
    };
    while pos >= 0 {
        match invoke(chain[pos as usize].as_ref(), ctx, Phase::Response) {
            Flow::Pass => pos -= 1,
            Flow::Stop => break,
        }
    }
}

/// The Handle phase: resolve the route and invoke exactly one handler, or
/// produce the routing outcome's response.
fn handle(ctx: &mut Context) {
    let app = Arc::clone(ctx.app());
    let method = ctx.request.method.clone();
    let path = ctx.request.url.path.clone();

    match app.resolve(&method, &path) {
        Resolution::Handler {
            handler,
            template,
            params,
            suffix,
        } => {
            ctx.request.path_params = params;
            ctx.request.route_suffix = suffix;
            if ctx.template().is_none() {
                if let Some(name) = template {
                    ctx.set_template(name);
                }
            }
            match catch_unwind(AssertUnwindSafe(|| handler(ctx))) {
                Ok(flow) => {
                    debug!(request_id = %ctx.request.id, flow = ?flow, "handler complete")
                }
                // recovered at the call boundary: an implicit Stop with the
                // response left as-is
                Err(panic) => error!(
                    url = %ctx.request.url.path,
                    panic = %panic_message(&panic),
                    "handler panicked"
                ),
            }
        }
        Resolution::NotFound => {
            info!(method = %method, path = %path, "no route matched");
            ctx.response.status = 404;
            ctx.response.set_body("Not Found");
        }
        Resolution::MethodNotSupported => {
            info!(method = %method, path = %path, "route exists but method is not registered");
            ctx.response.status = 501;
            ctx.response.set_body("Not Implemented");
        }
    }
}

fn invoke(intercepter: &dyn Intercepter, ctx: &mut Context, phase: Phase) -> Flow {
    match catch_unwind(AssertUnwindSafe(|| intercepter.handle(ctx, phase))) {
        Ok(flow) => flow,
        Err(panic) => {
            error!(
                url = %ctx.request.url.path,
                ?phase,
                panic = %panic_message(&panic),
                "intercepter panicked"
            );
            Flow::Stop
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
