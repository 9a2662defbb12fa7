use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::json;
use tracing::info;

use super::{Context, Flow, Intercepter, Phase};

const START_KEY: &str = "trace.start_ms";

/// Logs one line when a request enters the chain and one when its response
/// unwinds back out, carrying the elapsed wall-clock time.
pub struct TracingIntercepter;

impl Intercepter for TracingIntercepter {
    fn handle(&self, ctx: &mut Context, phase: Phase) -> Flow {
        match phase {
            Phase::Request => {
                info!(
                    request_id = %ctx.request.id,
                    method = %ctx.request.method,
                    path = %ctx.request.url.path,
                    "request received"
                );
                ctx.set(START_KEY, json!(now_ms()));
            }
            Phase::Response => {
                let elapsed_ms = ctx
                    .get(START_KEY)
                    .and_then(|v| v.as_u64())
                    .map(|start| now_ms().saturating_sub(start))
                    .unwrap_or(0);
                info!(
                    request_id = %ctx.request.id,
                    status = ctx.response.status,
                    elapsed_ms,
                    "response ready"
                );
            }
        }
        Flow::Pass
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
