use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use may::sync::mpsc;
use tracing::warn;

use super::request::HeaderMap;

/// One segment of a chunked response body.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub data: Vec<u8>,
    pub last: bool,
}

/// Producer half of a chunked response body.
///
/// Clonable and sendable to other execution contexts; a handler may keep
/// pushing from a background coroutine after it has returned. Pushes after
/// the final chunk are rejected.
#[derive(Clone)]
pub struct ChunkSender {
    tx: mpsc::Sender<Chunk>,
    closed: Arc<AtomicBool>,
}

impl ChunkSender {
    /// Queue a chunk. Returns `false` when the final chunk has already been
    /// pushed or the consumer is gone.
    pub fn push(&self, data: impl Into<Vec<u8>>, last: bool) -> bool {
        if self.closed.load(Ordering::Acquire) {
            warn!("chunk pushed after the final chunk; dropped");
            return false;
        }
        if last {
            self.closed.store(true, Ordering::Release);
        }
        self.tx
            .send(Chunk {
                data: data.into(),
                last,
            })
            .is_ok()
    }
}

/// Consumer half of a chunked response body, drained by the connection's
/// writer. `recv` suspends the calling coroutine while the queue is empty
/// and no producer has pushed yet.
pub struct ChunkReceiver {
    rx: mpsc::Receiver<Chunk>,
}

impl ChunkReceiver {
    /// Pop the next chunk; `None` when every sender is gone.
    pub fn recv(&self) -> Option<Chunk> {
        self.rx.recv().ok()
    }
}

/// Create a chunk queue pair.
pub fn chunk_channel() -> (ChunkSender, ChunkReceiver) {
    let (tx, rx) = mpsc::channel();
    (
        ChunkSender {
            tx,
            closed: Arc::new(AtomicBool::new(false)),
        },
        ChunkReceiver { rx },
    )
}

/// A cookie queued on the response, rendered as one `Set-Cookie` line.
#[derive(Debug, Clone, PartialEq)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
    /// Raw attribute string appended after the pair (e.g. `Path=/; HttpOnly`).
    pub attributes: Option<String>,
}

/// The two mutually exclusive output modes of a response lifecycle.
pub enum Body {
    Empty,
    Plain(String),
    Chunked(ChunkReceiver),
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Empty => f.write_str("Empty"),
            Body::Plain(s) => f.debug_tuple("Plain").field(&s.len()).finish(),
            Body::Chunked(_) => f.write_str("Chunked(..)"),
        }
    }
}

/// Response under construction for the current request.
///
/// Either a single plain body is set, or the response is marked chunked and
/// the body is streamed through a [`ChunkSender`]; once `mark_chunked` has
/// been called the plain body path is refused.
#[derive(Debug)]
pub struct Response {
    pub status: u16,
    pub headers: HeaderMap,
    pub cookies: Vec<SetCookie>,
    body: Body,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    pub fn new() -> Self {
        Self {
            status: 200,
            headers: HeaderMap::new(),
            cookies: Vec::new(),
            body: Body::Empty,
        }
    }

    /// Install the plain body. Returns `false` (and leaves the response
    /// untouched) when the response is already chunked.
    pub fn set_body(&mut self, body: impl Into<String>) -> bool {
        if matches!(self.body, Body::Chunked(_)) {
            warn!("plain body refused: response already marked chunked");
            return false;
        }
        self.body = Body::Plain(body.into());
        true
    }

    /// The plain body, if one is set.
    pub fn body(&self) -> Option<&str> {
        match &self.body {
            Body::Plain(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_chunked(&self) -> bool {
        matches!(self.body, Body::Chunked(_))
    }

    /// Whether any output (plain or chunked) has been installed.
    pub fn has_output(&self) -> bool {
        !matches!(self.body, Body::Empty)
    }

    /// Switch the response to chunked output and return the producer handle.
    /// Returns `None` when a plain body was already set or the response is
    /// already chunked.
    pub fn mark_chunked(&mut self) -> Option<ChunkSender> {
        match self.body {
            Body::Empty => {
                let (tx, rx) = chunk_channel();
                self.body = Body::Chunked(rx);
                Some(tx)
            }
            Body::Plain(_) => {
                warn!("mark_chunked refused: plain body already set");
                None
            }
            Body::Chunked(_) => {
                warn!("mark_chunked refused: response already chunked");
                None
            }
        }
    }

    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.insert(name, value);
    }

    pub fn add_cookie(&mut self, cookie: SetCookie) {
        self.cookies.push(cookie);
    }

    /// Take the body out for writing, leaving the response empty.
    pub(crate) fn take_output(&mut self) -> Body {
        std::mem::replace(&mut self.body, Body::Empty)
    }

    /// Clear the response for reuse on a keep-alive connection.
    pub fn reset(&mut self) {
        self.status = 200;
        self.headers.clear();
        self.cookies.clear();
        self.body = Body::Empty;
    }
}
