//! The bidirectional intercepter chain wrapped around every handler.
//!
//! A request walks the chain forward (`Phase::Request`), the resolved
//! handler runs once, and the chain unwinds backward (`Phase::Response`)
//! from wherever the forward walk ended: the conventional middleware onion,
//! except that a `Stop` during the Request phase curtails the unwind to the
//! intercepters that actually ran.

mod context;
pub mod engine;
mod error_page;
mod metrics;
mod tracing;

use std::sync::Arc;

pub use context::Context;
pub use error_page::ErrorPageIntercepter;
pub use metrics::MetricsIntercepter;
pub use self::tracing::TracingIntercepter;

/// Which direction the chain cursor is moving when an intercepter runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Request,
    Response,
}

/// An intercepter's verdict: keep walking the chain, or cut it short.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Pass,
    Stop,
}

/// A middleware unit invoked on the way in (Request phase) and, if it ran on
/// the way in, again on the way out (Response phase) in reverse order.
///
/// Implementations decide exactly one [`Flow`] per invocation. Running
/// inside a coroutine, an intercepter is free to suspend (socket reads,
/// collaborator calls) before returning its verdict.
pub trait Intercepter: Send + Sync {
    fn handle(&self, ctx: &mut Context, phase: Phase) -> Flow;
}

/// A route handler: reads the request, writes the response (plain or
/// chunked), and signals completion with the same Pass/Stop vocabulary the
/// intercepters use.
pub type Handler = Arc<dyn Fn(&mut Context) -> Flow + Send + Sync>;
