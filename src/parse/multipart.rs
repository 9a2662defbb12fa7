use memchr::{memchr, memmem};
use tracing::trace;

use super::ParseError;
use crate::model::{HeaderMap, MultiPart};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PartState {
    /// Discardable bytes before the first boundary line.
    Preamble,
    /// Sub-headers of the current part.
    Headers,
    /// Payload of the current part, up to the next boundary line.
    Data,
    /// The terminal `--boundary--` was seen; the epilogue is ignored.
    Done,
}

/// What follows a boundary delimiter on its line.
enum Tail {
    /// `--`: the terminal boundary.
    Terminal,
    /// CRLF; the value is the index just past it.
    Crlf(usize),
    /// Not enough bytes buffered to decide.
    Incomplete,
    Garbage,
}

/// Streaming RFC 2046 multipart splitter.
///
/// Fed the body byte-stream by the HTTP parser; emits one [`MultiPart`] per
/// completed part. Part payloads are held until their closing boundary is
/// seen, so a boundary marker split across reads is never mistaken for
/// payload.
pub struct MultipartParser {
    /// `--` + boundary.
    delimiter: Vec<u8>,
    buf: Vec<u8>,
    state: PartState,
    current: HeaderMap,
    parts: Vec<MultiPart>,
}

impl MultipartParser {
    pub fn new(boundary: &str) -> Self {
        let mut delimiter = Vec::with_capacity(boundary.len() + 2);
        delimiter.extend_from_slice(b"--");
        delimiter.extend_from_slice(boundary.as_bytes());
        Self {
            delimiter,
            buf: Vec::new(),
            state: PartState::Preamble,
            current: HeaderMap::new(),
            parts: Vec::new(),
        }
    }

    pub fn feed(&mut self, data: &[u8]) -> Result<(), ParseError> {
        self.buf.extend_from_slice(data);
        self.drain()
    }

    /// Finalize at end of the outer body. Errors when the terminal boundary
    /// never arrived.
    pub fn finish(self) -> Result<Vec<MultiPart>, ParseError> {
        if self.state != PartState::Done {
            return Err(ParseError::BadMultipart(
                "missing terminal boundary".to_string(),
            ));
        }
        Ok(self.parts)
    }

    fn drain(&mut self) -> Result<(), ParseError> {
        loop {
            match self.state {
                PartState::Preamble => {
                    let Some(pos) = find_at_line_start(&self.buf, &self.delimiter) else {
                        self.trim_preamble();
                        return Ok(());
                    };
                    let after = pos + self.delimiter.len();
                    match boundary_tail(&self.buf, after) {
                        Tail::Incomplete => return Ok(()),
                        Tail::Terminal => {
                            self.buf.clear();
                            self.state = PartState::Done;
                        }
                        Tail::Crlf(next) => {
                            self.buf.drain(..next);
                            self.state = PartState::Headers;
                        }
                        Tail::Garbage => {
                            return Err(ParseError::BadMultipart(
                                "garbage after boundary".to_string(),
                            ))
                        }
                    }
                }
                PartState::Headers => {
                    if self.buf.starts_with(b"\r\n") {
                        // part without sub-headers
                        self.buf.drain(..2);
                        self.current = HeaderMap::new();
                        self.state = PartState::Data;
                        continue;
                    }
                    let Some(pos) = memmem::find(&self.buf, b"\r\n\r\n") else {
                        return Ok(());
                    };
                    let mut headers = HeaderMap::new();
                    for line in self.buf[..pos].split(|&b| b == b'\n') {
                        let line = strip_cr(line);
                        if line.is_empty() {
                            continue;
                        }
                        let Some(colon) = memchr(b':', line) else {
                            return Err(ParseError::BadMultipart(
                                "part header without a colon".to_string(),
                            ));
                        };
                        let name = String::from_utf8_lossy(&line[..colon]);
                        let value = String::from_utf8_lossy(&line[colon + 1..]);
                        headers.insert(name.trim(), value.trim());
                    }
                    trace!(headers = headers.len(), "part headers complete");
                    self.buf.drain(..pos + 4);
                    self.current = headers;
                    self.state = PartState::Data;
                }
                PartState::Data => {
                    let mut marker = Vec::with_capacity(self.delimiter.len() + 2);
                    marker.extend_from_slice(b"\r\n");
                    marker.extend_from_slice(&self.delimiter);
                    let Some(pos) = memmem::find(&self.buf, &marker) else {
                        return Ok(());
                    };
                    let after = pos + marker.len();
                    let tail = boundary_tail(&self.buf, after);
                    if matches!(tail, Tail::Incomplete) {
                        return Ok(());
                    }
                    if matches!(tail, Tail::Garbage) {
                        return Err(ParseError::BadMultipart(
                            "garbage after boundary".to_string(),
                        ));
                    }
                    let data = self.buf[..pos].to_vec();
                    trace!(bytes = data.len(), "part complete");
                    self.parts.push(MultiPart {
                        headers: std::mem::take(&mut self.current),
                        data,
                    });
                    match tail {
                        Tail::Terminal => {
                            self.buf.clear();
                            self.state = PartState::Done;
                        }
                        Tail::Crlf(next) => {
                            self.buf.drain(..next);
                            self.state = PartState::Headers;
                        }
                        _ => {}
                    }
                }
                PartState::Done => {
                    self.buf.clear();
                    return Ok(());
                }
            }
        }
    }

    /// Preamble content is discardable; keep only a tail long enough to
    /// contain a partially received delimiter.
    fn trim_preamble(&mut self) {
        let keep = self.delimiter.len() + 2;
        if self.buf.len() > keep {
            let cut = self.buf.len() - keep;
            self.buf.drain(..cut);
        }
    }
}

fn strip_cr(line: &[u8]) -> &[u8] {
    match line.last() {
        Some(b'\r') => &line[..line.len() - 1],
        _ => line,
    }
}

fn find_at_line_start(buf: &[u8], needle: &[u8]) -> Option<usize> {
    let mut from = 0;
    while let Some(off) = memmem::find(&buf[from..], needle) {
        let pos = from + off;
        if pos == 0 || buf[pos - 1] == b'\n' {
            return Some(pos);
        }
        from = pos + 1;
    }
    None
}

/// Classify the bytes following a boundary delimiter, skipping transport
/// padding (spaces and tabs) first.
fn boundary_tail(buf: &[u8], mut i: usize) -> Tail {
    while i < buf.len() && (buf[i] == b' ' || buf[i] == b'\t') {
        i += 1;
    }
    let Some(&b) = buf.get(i) else {
        return Tail::Incomplete;
    };
    match b {
        b'-' => match buf.get(i + 1) {
            None => Tail::Incomplete,
            Some(b'-') => Tail::Terminal,
            Some(_) => Tail::Garbage,
        },
        b'\r' => match buf.get(i + 1) {
            None => Tail::Incomplete,
            Some(b'\n') => Tail::Crlf(i + 2),
            Some(_) => Tail::Garbage,
        },
        // tolerate a bare LF
        b'\n' => Tail::Crlf(i + 1),
        _ => Tail::Garbage,
    }
}
