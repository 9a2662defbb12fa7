use std::fmt;
use std::io;
use std::sync::Arc;

use tracing::{debug, warn};

use super::writer;
use crate::app::Application;
use crate::chain::{engine, Context};
use crate::model::{items_from_parts, Request};
use crate::parse::{HttpParser, ParseError};
use crate::transport::Transport;

/// Why a connection died. Both variants are fatal: transport failures leave
/// the stream unusable and half-parsed wire state cannot be trusted.
#[derive(Debug)]
pub enum ConnectionError {
    Io(io::Error),
    Parse(ParseError),
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::Io(err) => write!(f, "transport error: {err}"),
            ConnectionError::Parse(err) => write!(f, "parse error: {err}"),
        }
    }
}

impl std::error::Error for ConnectionError {}

impl From<io::Error> for ConnectionError {
    fn from(err: io::Error) -> Self {
        ConnectionError::Io(err)
    }
}

impl From<ParseError> for ConnectionError {
    fn from(err: ParseError) -> Self {
        ConnectionError::Parse(err)
    }
}

enum ReadOutcome {
    /// A complete message is in the request.
    Message,
    /// The peer closed cleanly between requests.
    Closed,
}

/// One accepted socket: transport, parser state, the live request, and the
/// response writer, driven to completion by [`Connection::run`].
///
/// The request is reused across keep-alive exchanges (reset, not
/// reallocated), and all processing for the connection is strictly
/// sequential inside its own coroutine.
pub struct Connection<T: Transport> {
    transport: T,
    parser: HttpParser,
    request: Request,
    app: Arc<Application>,
    read_buf: Vec<u8>,
}

impl<T: Transport> Connection<T> {
    pub fn new(transport: T, app: Arc<Application>, read_buffer_size: usize) -> Self {
        Self {
            transport,
            parser: HttpParser::new(),
            request: Request::new(),
            app,
            read_buf: vec![0; read_buffer_size.max(512)],
        }
    }

    /// Process requests until the peer closes, keep-alive ends, or an error
    /// kills the connection.
    pub fn run(mut self) {
        let peer = self.transport.peer_addr();
        debug!(?peer, "connection opened");
        loop {
            match self.read_message() {
                Ok(ReadOutcome::Message) => {}
                Ok(ReadOutcome::Closed) => break,
                Err(err) => {
                    warn!(?peer, error = %err, "connection aborted");
                    break;
                }
            }

            let keep_alive = self.request.keep_alive;
            let request = std::mem::take(&mut self.request);
            let mut ctx = Context::new(request, Arc::clone(&self.app));
            engine::run(&mut ctx);
            let (request, mut response) = ctx.into_parts();
            self.request = request;

            if let Err(err) = writer::write_response(&mut self.transport, &mut response, keep_alive)
            {
                warn!(?peer, error = %err, "response write failed");
                break;
            }
            if !keep_alive {
                break;
            }

            // rearm for the next message on this connection
            self.parser.reset();
            self.request.reset();
        }
        let _ = self.transport.close();
        debug!(?peer, "connection closed");
    }

    /// Read transport bytes into the parser until one message completes.
    // TODO: optional per-request read deadline; a stalled peer currently
    // parks this coroutine until the socket dies.
    fn read_message(&mut self) -> Result<ReadOutcome, ConnectionError> {
        loop {
            let n = self.transport.read(&mut self.read_buf)?;
            if n == 0 {
                return if self.parser.is_idle() {
                    Ok(ReadOutcome::Closed)
                } else {
                    Err(ParseError::UnexpectedEof.into())
                };
            }
            let consumed = self.parser.feed(&self.read_buf[..n], &mut self.request)?;
            if consumed != n {
                return Err(ParseError::TrailingBytes.into());
            }
            if self.parser.is_complete() {
                if !self.request.parts.is_empty() {
                    self.request.form_data =
                        items_from_parts(&self.request.parts, self.app.upload_policy().as_ref());
                }
                return Ok(ReadOutcome::Message);
            }
        }
    }
}
