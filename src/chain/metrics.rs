use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde_json::json;

use super::{Context, Flow, Intercepter, Phase};

const START_KEY: &str = "metrics.start_ms";

/// Request counters sampled through the chain.
///
/// All counters use atomic operations, so one instance can be shared with
/// the embedder (keep a clone of the `Arc` passed to
/// [`Application::add_intercepter`](crate::app::Application::add_intercepter))
/// and read while traffic flows.
#[derive(Default)]
pub struct MetricsIntercepter {
    requests: AtomicUsize,
    total_latency_ms: AtomicU64,
    responses_2xx: AtomicUsize,
    responses_4xx: AtomicUsize,
    responses_5xx: AtomicUsize,
}

impl MetricsIntercepter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }

    /// Mean time between a request entering the chain and its response
    /// unwinding past this intercepter.
    pub fn average_latency(&self) -> Duration {
        let count = self.requests.load(Ordering::Relaxed);
        if count == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(self.total_latency_ms.load(Ordering::Relaxed) / count as u64)
    }

    /// `(2xx, 4xx, 5xx)` response counts.
    pub fn status_counts(&self) -> (usize, usize, usize) {
        (
            self.responses_2xx.load(Ordering::Relaxed),
            self.responses_4xx.load(Ordering::Relaxed),
            self.responses_5xx.load(Ordering::Relaxed),
        )
    }
}

impl Intercepter for MetricsIntercepter {
    fn handle(&self, ctx: &mut Context, phase: Phase) -> Flow {
        match phase {
            Phase::Request => {
                self.requests.fetch_add(1, Ordering::Relaxed);
                ctx.set(START_KEY, json!(now_ms()));
            }
            Phase::Response => {
                if let Some(start) = ctx.get(START_KEY).and_then(|v| v.as_u64()) {
                    self.total_latency_ms
                        .fetch_add(now_ms().saturating_sub(start), Ordering::Relaxed);
                }
                match ctx.response.status {
                    200..=299 => self.responses_2xx.fetch_add(1, Ordering::Relaxed),
                    400..=499 => self.responses_4xx.fetch_add(1, Ordering::Relaxed),
                    500..=599 => self.responses_5xx.fetch_add(1, Ordering::Relaxed),
                    _ => 0,
                };
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
