use std::io;
use std::net::{SocketAddr, TcpStream as StdTcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use may::coroutine::JoinHandle;
use tracing::{info, warn};

use super::worker_pool::IoPool;
use crate::app::Application;
use crate::runtime_config::RuntimeConfig;

/// The accept loop and everything it owns: the mounted application, the
/// worker pool, and the housekeeping timer.
pub struct Server {
    app: Arc<Application>,
    config: RuntimeConfig,
}

impl Server {
    pub fn new(app: Application) -> Self {
        Self::with_config(app, RuntimeConfig::from_env())
    }

    pub fn with_config(app: Application, config: RuntimeConfig) -> Self {
        Self {
            app: Arc::new(app),
            config,
        }
    }

    pub fn app(&self) -> Arc<Application> {
        Arc::clone(&self.app)
    }

    /// Bind the listener, mount the application (freezing registration),
    /// start the worker pool and the housekeeping timer, and begin
    /// accepting.
    ///
    /// # Errors
    ///
    /// Returns an error when the address is invalid or the port cannot be
    /// bound.
    pub fn start<A: ToSocketAddrs>(self, addr: A) -> io::Result<ServerHandle> {
        let addr = addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid address"))?;

        self.config.apply();
        self.app.mount();

        let listener = may::net::TcpListener::bind(addr)?;
        let local_addr = listener.local_addr()?;
        let pool = IoPool::new(
            self.config.workers.max(1),
            Arc::clone(&self.app),
            self.config.read_buffer_size,
        );

        // idle housekeeping tick; drives collaborator maintenance such as
        // template hot-reload checks
        let app = Arc::clone(&self.app);
        let interval = self.config.housekeeping_interval;
        let _ = may::go!(move || loop {
            may::coroutine::sleep(interval);
            app.housekeeping();
        });

        let handle = may::go!(move || {
            info!(addr = %local_addr, workers = pool.size(), "server listening");
            for stream in listener.incoming() {
                match stream {
                    Ok(s) => {
                        let _ = s.set_nodelay(true);
                        pool.dispatch(s);
                    }
                    Err(err) => warn!(error = %err, "accept failed"),
                }
            }
        });

        Ok(ServerHandle {
            addr: local_addr,
            handle,
        })
    }
}

/// Handle to a running server.
///
/// Lets callers wait until the listener answers, stop the accept loop, or
/// block on it.
pub struct ServerHandle {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl ServerHandle {
    /// The bound address; useful after binding port 0.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Poll the listener with plain TCP connects until it accepts, for tests
    /// that must not race the accept loop.
    ///
    /// # Errors
    ///
    /// Returns `TimedOut` when the server is not ready within ~250ms.
    pub fn wait_ready(&self) -> io::Result<()> {
        for _ in 0..50 {
            if StdTcpStream::connect(self.addr).is_ok() {
                return Ok(());
            }
            thread::sleep(Duration::from_millis(5));
        }
        Err(io::Error::new(io::ErrorKind::TimedOut, "server not ready"))
    }

    /// Cancel the accept coroutine and wait for it to finish. Connections
    /// already dispatched drain on their own workers.
    pub fn stop(self) {
        // SAFETY: cancel() is unsafe in the may runtime; the handle is valid
        // (we own it) and cancelling the accept loop is the intended
        // shutdown path.
        unsafe {
            self.handle.coroutine().cancel();
        }
        let _ = self.handle.join();
    }

    /// Block until the accept coroutine exits.
    ///
    /// # Errors
    ///
    /// Returns an error when the accept coroutine panicked.
    pub fn join(self) -> std::thread::Result<()> {
        self.handle.join()
    }
}
