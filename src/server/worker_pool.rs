//! Fixed pool of I/O worker contexts.
//!
//! Accepted sockets are dispatched round-robin across the workers at accept
//! time and stay with their worker for the connection's whole lifetime. Each
//! connection runs in its own coroutine, so everything it owns (parser,
//! request, response) is touched strictly sequentially and needs no
//! locking; the chunk queue is the one deliberately cross-context exception.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use may::net::TcpStream;
use may::sync::mpsc;
use tracing::{debug, error, info};

use super::connection::Connection;
use crate::app::Application;
use crate::transport::TcpTransport;

/// Counters exposed by the pool for monitoring.
#[derive(Debug, Default)]
pub struct IoPoolMetrics {
    dispatched: AtomicU64,
    active: AtomicUsize,
}

impl IoPoolMetrics {
    /// Total connections handed to workers since startup.
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    /// Connections currently being serviced.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }
}

/// The worker pool: one queue-draining coroutine per worker context.
pub struct IoPool {
    workers: Vec<mpsc::Sender<TcpStream>>,
    next: AtomicUsize,
    metrics: Arc<IoPoolMetrics>,
}

impl IoPool {
    pub fn new(workers: usize, app: Arc<Application>, read_buffer_size: usize) -> Self {
        let metrics = Arc::new(IoPoolMetrics::default());
        let mut senders = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            let (tx, rx) = mpsc::channel::<TcpStream>();
            let app = Arc::clone(&app);
            let metrics = Arc::clone(&metrics);
            let _ = may::go!(move || {
                debug!(worker_id, "io worker started");
                for stream in rx.iter() {
                    let app = Arc::clone(&app);
                    let metrics = Arc::clone(&metrics);
                    metrics.active.fetch_add(1, Ordering::Relaxed);
                    let _ = may::go!(move || {
                        Connection::new(TcpTransport::new(stream), app, read_buffer_size).run();
                        metrics.active.fetch_sub(1, Ordering::Relaxed);
                    });
                }
                debug!(worker_id, "io worker exited");
            });
            senders.push(tx);
        }
        info!(workers, "io worker pool started");
        Self {
            workers: senders,
            next: AtomicUsize::new(0),
            metrics,
        }
    }

    /// Bind an accepted socket to a worker, chosen round-robin.
    pub fn dispatch(&self, stream: TcpStream) {
        let id = self.next.fetch_add(1, Ordering::Relaxed) % self.workers.len();
        self.metrics.dispatched.fetch_add(1, Ordering::Relaxed);
        if self.workers[id].send(stream).is_err() {
            error!(worker_id = id, "worker channel closed; dropping connection");
        }
    }

    pub fn metrics(&self) -> Arc<IoPoolMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }
}
