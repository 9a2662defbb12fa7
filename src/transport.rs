//! Byte-stream abstraction underneath a connection.
//!
//! A [`Transport`] is a duplex byte stream with coroutine-suspending reads
//! and writes; the concrete implementation is a plain TCP socket. All parser
//! and writer code targets the trait so tests can substitute an in-memory
//! stream.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr};

use may::net::TcpStream;

/// Duplex byte stream owned by a [`Connection`](crate::server::Connection).
///
/// `read` and `write_all` suspend the calling coroutine until the socket is
/// ready; they never block the OS thread.
pub trait Transport: Send {
    /// Read into `buf`, returning the number of bytes read. `Ok(0)` means
    /// the peer closed its half of the stream.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write the whole buffer, suspending as needed.
    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()>;

    /// Close both directions of the stream.
    fn close(&mut self) -> io::Result<()>;

    fn peer_addr(&self) -> Option<SocketAddr>;
}

/// TCP transport over a coroutine-aware socket.
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    pub fn new(stream: TcpStream) -> Self {
        Self { stream }
    }
}

impl Transport for TcpTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Read::read(&mut self.stream, buf)
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        Write::write_all(&mut self.stream, data)
    }

    fn flush(&mut self) -> io::Result<()> {
        Write::flush(&mut self.stream)
    }

    fn close(&mut self) -> io::Result<()> {
        self.stream.shutdown(Shutdown::Both)
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        self.stream.peer_addr().ok()
    }
}
