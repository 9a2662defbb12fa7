//! Incremental wire parsers for the per-connection pipeline.
//!
//! [`HttpParser`] is a typed state machine fed arbitrary-sized byte slices
//! straight off the transport; a message may span any number of reads and a
//! header name or value may be split at any byte. [`MultipartParser`] is the
//! nested sub-parser the HTTP parser hands body bytes to when the content
//! type is multipart.
//!
//! Parse errors are fatal to the connection: half-parsed state cannot be
//! trusted, so no recovery is attempted.

mod http;
mod multipart;

use std::fmt;

pub use http::{HttpParser, ParseState};
pub use multipart::MultipartParser;

/// Wire-level parse failure. Always fatal for the connection it occurred on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    BadStartLine(String),
    BadHeader(String),
    BadChunkSize,
    BadUrl(String),
    BadMultipart(String),
    /// The peer closed mid-message.
    UnexpectedEof,
    /// Bytes arrived after a complete message; pipelining is unsupported.
    TrailingBytes,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::BadStartLine(line) => write!(f, "malformed start line: {line:?}"),
            ParseError::BadHeader(name) => write!(f, "malformed header: {name:?}"),
            ParseError::BadChunkSize => f.write_str("malformed chunk size"),
            ParseError::BadUrl(url) => write!(f, "unparsable request target: {url}"),
            ParseError::BadMultipart(detail) => write!(f, "malformed multipart body: {detail}"),
            ParseError::UnexpectedEof => f.write_str("connection closed mid-message"),
            ParseError::TrailingBytes => f.write_str("bytes after a complete message"),
        }
    }
}

impl std::error::Error for ParseError {}
