//! Environment variable-based configuration for the server runtime.
//!
//! ## Environment Variables
//!
//! - `GANTRY_WORKERS`: number of I/O worker contexts in the pool.
//!   Default: hardware concurrency minus one, floored at 1.
//! - `GANTRY_STACK_SIZE`: coroutine stack size in bytes, decimal (`16384`)
//!   or hexadecimal (`0x4000`). Default: `0x10000` (64 KB).
//! - `GANTRY_READ_BUF`: per-connection read buffer size in bytes.
//!   Default: `16384`.
//! - `GANTRY_HOUSEKEEPING_SECS`: interval of the idle housekeeping timer
//!   that drives collaborator maintenance (template reload checks).
//!   Default: `30`.

use std::env;
use std::time::Duration;

/// Runtime configuration loaded from environment variables.
///
/// Load this at startup using [`RuntimeConfig::from_env()`]; the server
/// applies it to the `may` scheduler before accepting connections.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeConfig {
    /// Number of I/O worker contexts (default: hardware concurrency - 1)
    pub workers: usize,
    /// Stack size for coroutines in bytes (default: 64 KB / 0x10000)
    pub stack_size: usize,
    /// Per-connection read buffer size in bytes (default: 16 KB)
    pub read_buffer_size: usize,
    /// Interval of the housekeeping timer (default: 30 s)
    pub housekeeping_interval: Duration,
}

impl RuntimeConfig {
    /// Load configuration from environment variables, falling back to the
    /// documented defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let workers = env::var("GANTRY_WORKERS")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|&n| n > 0)
            .unwrap_or_else(default_workers);

        let stack_size = env::var("GANTRY_STACK_SIZE")
            .ok()
            .and_then(|s| parse_size(&s))
            .unwrap_or(0x10000);

        let read_buffer_size = env::var("GANTRY_READ_BUF")
            .ok()
            .and_then(|s| parse_size(&s))
            .filter(|&n| n > 0)
            .unwrap_or(16 * 1024);

        let housekeeping_interval = env::var("GANTRY_HOUSEKEEPING_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(30));

        RuntimeConfig {
            workers,
            stack_size,
            read_buffer_size,
            housekeeping_interval,
        }
    }

    /// Apply the worker count and stack size to the `may` scheduler.
    ///
    /// Must happen before any coroutine is spawned; the scheduler reads the
    /// configuration once when it starts.
    pub fn apply(&self) {
        may::config()
            .set_workers(self.workers)
            .set_stack_size(self.stack_size);
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1))
        .unwrap_or(1)
        .max(1)
}

/// Parse a byte count that may be decimal or `0x`-prefixed hexadecimal.
fn parse_size(val: &str) -> Option<usize> {
    if let Some(hex) = val.strip_prefix("0x") {
        usize::from_str_radix(hex, 16).ok()
    } else {
        val.parse().ok()
    }
}
