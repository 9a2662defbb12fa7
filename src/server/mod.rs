//! Socket-facing layer: accept loop, I/O worker pool, per-connection
//! lifecycle, and the response writer.

mod connection;
mod server;
mod worker_pool;
pub mod writer;

pub use connection::{Connection, ConnectionError};
pub use server::{Server, ServerHandle};
pub use worker_pool::{IoPool, IoPoolMetrics};
