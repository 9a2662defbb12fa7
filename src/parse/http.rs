use http::{Method, Version};
use memchr::memchr;
use tracing::{debug, trace};

use super::multipart::MultipartParser;
use super::ParseError;
use crate::model::{Request, RequestUrl};

/// Position of the parser inside one HTTP/1.x message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    /// No bytes of the next message seen yet.
    Idle,
    StartLine,
    HeaderField,
    HeaderValue,
    /// Reading a Content-Length delimited body.
    Body,
    ChunkSize,
    ChunkData,
    /// Consuming the CRLF that terminates a chunk.
    ChunkDataEnd,
    Trailer,
    /// A full message has been parsed; `feed` refuses further bytes.
    Complete,
}

/// Incremental HTTP/1.x request parser.
///
/// `feed` consumes an arbitrary byte slice and populates the [`Request`]
/// directly; the message boundary may fall anywhere inside a slice and a
/// message may span many slices. A captured header field/value pair is
/// committed into the header map only when the next field begins or when the
/// blank line arrives, which is what lets a name or value be delivered
/// across reads; a continuation line (leading whitespace) extends the
/// pending value instead. Repeated field names are last-write-wins.
pub struct HttpParser {
    state: ParseState,
    /// Start-line / chunk-size / trailer accumulator.
    line: Vec<u8>,
    /// Raw request target; structured into the URL at headers-complete.
    target: String,
    field: Vec<u8>,
    value: Vec<u8>,
    /// A field/value pair awaits its commit-on-transition.
    pending: bool,
    at_line_start: bool,
    /// Bytes left in the sized body or in the current chunk.
    remaining: usize,
    crlf_skip: u8,
    /// Boundary was absent from the Content-Type; the first body bytes are
    /// being inspected for it.
    sniffing: bool,
    sniff: Vec<u8>,
    multipart: Option<MultipartParser>,
}

impl Default for HttpParser {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpParser {
    pub fn new() -> Self {
        Self {
            state: ParseState::Idle,
            line: Vec::new(),
            target: String::new(),
            field: Vec::new(),
            value: Vec::new(),
            pending: false,
            at_line_start: true,
            remaining: 0,
            crlf_skip: 0,
            sniffing: false,
            sniff: Vec::new(),
            multipart: None,
        }
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    pub fn is_complete(&self) -> bool {
        self.state == ParseState::Complete
    }

    /// True while no byte of the next message has been seen; a peer close in
    /// this state is a clean end of the connection, not an error.
    pub fn is_idle(&self) -> bool {
        self.state == ParseState::Idle
    }

    /// Rearm the parser for the next message on a keep-alive connection,
    /// keeping buffer capacity.
    pub fn reset(&mut self) {
        self.state = ParseState::Idle;
        self.line.clear();
        self.target.clear();
        self.field.clear();
        self.value.clear();
        self.pending = false;
        self.at_line_start = true;
        self.remaining = 0;
        self.crlf_skip = 0;
        self.sniffing = false;
        self.sniff.clear();
        self.multipart = None;
    }

    /// Feed one slice of transport bytes, updating `req` as events fire.
    ///
    /// Returns the number of bytes consumed, which equals `data.len()` on
    /// success; any mismatch surfaces as an error and is fatal to the
    /// connection.
    pub fn feed(&mut self, data: &[u8], req: &mut Request) -> Result<usize, ParseError> {
        let mut i = 0;
        while i < data.len() {
            match self.state {
                ParseState::Complete => return Err(ParseError::TrailingBytes),
                ParseState::Idle => {
                    self.state = ParseState::StartLine;
                }
                ParseState::StartLine => {
                    if let Some(off) = memchr(b'\n', &data[i..]) {
                        self.line.extend_from_slice(&data[i..i + off]);
                        i += off + 1;
                        self.start_line(req)?;
                    } else {
                        self.line.extend_from_slice(&data[i..]);
                        i = data.len();
                    }
                }
                ParseState::HeaderField => {
                    self.header_field_byte(data[i], req)?;
                    i += 1;
                }
                ParseState::HeaderValue => {
                    self.header_value_byte(data[i]);
                    i += 1;
                }
                ParseState::Body => {
                    let take = self.remaining.min(data.len() - i);
                    self.body_bytes(&data[i..i + take], req)?;
                    i += take;
                    self.remaining -= take;
                    if self.remaining == 0 {
                        self.message_complete(req)?;
                    }
                }
                ParseState::ChunkSize => {
                    if let Some(off) = memchr(b'\n', &data[i..]) {
                        self.line.extend_from_slice(&data[i..i + off]);
                        i += off + 1;
                        self.chunk_size()?;
                    } else {
                        self.line.extend_from_slice(&data[i..]);
                        i = data.len();
                    }
                }
                ParseState::ChunkData => {
                    let take = self.remaining.min(data.len() - i);
                    self.body_bytes(&data[i..i + take], req)?;
                    i += take;
                    self.remaining -= take;
                    if self.remaining == 0 {
                        self.crlf_skip = 2;
                        self.state = ParseState::ChunkDataEnd;
                    }
                }
                ParseState::ChunkDataEnd => {
                    let b = data[i];
                    i += 1;
                    match b {
                        b'\r' if self.crlf_skip == 2 => self.crlf_skip = 1,
                        b'\n' => {
                            self.crlf_skip = 0;
                            self.state = ParseState::ChunkSize;
                        }
                        _ => return Err(ParseError::BadChunkSize),
                    }
                }
                ParseState::Trailer => {
                    if let Some(off) = memchr(b'\n', &data[i..]) {
                        self.line.extend_from_slice(&data[i..i + off]);
                        i += off + 1;
                        let blank = self.line.iter().all(|&b| b == b'\r');
                        self.line.clear();
                        if blank {
                            self.message_complete(req)?;
                        }
                    } else {
                        self.line.extend_from_slice(&data[i..]);
                        i = data.len();
                    }
                }
            }
        }
        Ok(i)
    }

    fn start_line(&mut self, req: &mut Request) -> Result<(), ParseError> {
        let mut line = std::mem::take(&mut self.line);
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        // tolerate empty line(s) before the start line (RFC 7230 §3.5)
        if line.is_empty() {
            return Ok(());
        }
        let text = std::str::from_utf8(&line)
            .map_err(|_| ParseError::BadStartLine(String::from_utf8_lossy(&line).into_owned()))?;
        let mut words = text.split_whitespace();
        let (method, target, version) = match (words.next(), words.next(), words.next()) {
            (Some(m), Some(t), Some(v)) if words.next().is_none() => (m, t, v),
            _ => return Err(ParseError::BadStartLine(text.to_string())),
        };

        req.method = Method::from_bytes(method.as_bytes())
            .map_err(|_| ParseError::BadStartLine(text.to_string()))?;
        req.version = match version {
            "HTTP/1.1" => Version::HTTP_11,
            "HTTP/1.0" => Version::HTTP_10,
            _ => return Err(ParseError::BadStartLine(text.to_string())),
        };
        self.target.clear();
        self.target.push_str(target);

        trace!(method = %req.method, target = %self.target, "start line parsed");
        self.state = ParseState::HeaderField;
        self.at_line_start = true;
        Ok(())
    }

    fn header_field_byte(&mut self, b: u8, req: &mut Request) -> Result<(), ParseError> {
        match b {
            b'\r' => {}
            b'\n' => {
                if self.at_line_start {
                    // blank line: commit the pending pair, headers are done
                    self.commit_pending(req);
                    self.headers_complete(req)?;
                } else {
                    return Err(ParseError::BadHeader(
                        String::from_utf8_lossy(&self.field).into_owned(),
                    ));
                }
            }
            b' ' | b'\t' if self.at_line_start && self.pending => {
                // folded continuation line extends the pending value
                self.value.push(b' ');
                self.at_line_start = false;
                self.state = ParseState::HeaderValue;
            }
            b':' => {
                if self.at_line_start {
                    return Err(ParseError::BadHeader(String::new()));
                }
                self.state = ParseState::HeaderValue;
            }
            _ => {
                if self.at_line_start {
                    if self.pending {
                        // commit-on-transition: the next field has begun
                        self.commit_pending(req);
                    }
                    self.at_line_start = false;
                }
                self.field.push(b.to_ascii_lowercase());
            }
        }
        Ok(())
    }

    fn header_value_byte(&mut self, b: u8) {
        match b {
            b'\r' => {}
            b'\n' => {
                self.pending = true;
                self.at_line_start = true;
                self.state = ParseState::HeaderField;
            }
            _ => self.value.push(b),
        }
    }

    fn commit_pending(&mut self, req: &mut Request) {
        if !self.field.is_empty() {
            let name = String::from_utf8_lossy(&self.field);
            let value = String::from_utf8_lossy(&self.value);
            req.headers.insert(&name, value.trim());
            trace!(header = %name, "header committed");
        }
        self.field.clear();
        self.value.clear();
        self.pending = false;
    }

    fn headers_complete(&mut self, req: &mut Request) -> Result<(), ParseError> {
        req.url = RequestUrl::parse(&self.target, req.headers.get("host"))
            .map_err(|e| ParseError::BadUrl(format!("{}: {e}", self.target)))?;

        let connection = req
            .headers
            .get("connection")
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        req.keep_alive = if req.version == Version::HTTP_10 {
            connection.contains("keep-alive")
        } else {
            !connection.contains("close")
        };
        req.upgrade = connection.contains("upgrade") || req.headers.contains("upgrade");

        if let Some(ct) = req.headers.get("content-type") {
            if ct.trim_start().to_ascii_lowercase().starts_with("multipart/") {
                match boundary_param(ct) {
                    Some(boundary) => {
                        self.multipart = Some(MultipartParser::new(&boundary));
                        req.multipart_boundary = Some(boundary);
                    }
                    // some clients put the boundary on the first body line
                    None => self.sniffing = true,
                }
            }
        }

        let te_chunked = req
            .headers
            .get("transfer-encoding")
            .map(|v| v.to_ascii_lowercase().contains("chunked"))
            .unwrap_or(false);
        if te_chunked {
            self.state = ParseState::ChunkSize;
            debug!(request_id = %req.id, "reading chunked body");
            return Ok(());
        }

        let content_length = match req.headers.get("content-length") {
            Some(v) => Some(
                v.trim()
                    .parse::<usize>()
                    .map_err(|_| ParseError::BadHeader("content-length".to_string()))?,
            ),
            None => None,
        };
        match content_length {
            Some(n) if n > 0 => {
                self.remaining = n;
                self.state = ParseState::Body;
                debug!(request_id = %req.id, content_length = n, "reading body");
            }
            _ => self.message_complete(req)?,
        }
        Ok(())
    }

    fn body_bytes(&mut self, bytes: &[u8], req: &mut Request) -> Result<(), ParseError> {
        if self.sniffing {
            self.sniff.extend_from_slice(bytes);
            return self.sniff_boundary(req);
        }
        if let Some(mp) = self.multipart.as_mut() {
            // the sub-parser consumes the stream; the outer body stays empty
            mp.feed(bytes)
        } else {
            req.body.extend_from_slice(bytes);
            Ok(())
        }
    }

    /// Decide whether the undeclared-boundary body really is multipart. The
    /// first body line must begin with the `--` start marker; anything else
    /// downgrades the body to an opaque byte payload.
    fn sniff_boundary(&mut self, req: &mut Request) -> Result<(), ParseError> {
        if self.sniff.len() < 2 {
            return Ok(());
        }
        if !self.sniff.starts_with(b"--") {
            self.sniffing = false;
            req.body.append(&mut self.sniff);
            return Ok(());
        }
        let Some(nl) = memchr(b'\n', &self.sniff) else {
            return Ok(());
        };
        let mut end = nl;
        if end > 0 && self.sniff[end - 1] == b'\r' {
            end -= 1;
        }
        let boundary = String::from_utf8_lossy(&self.sniff[2..end]).into_owned();
        if boundary.is_empty() {
            return Err(ParseError::BadMultipart("empty sniffed boundary".to_string()));
        }
        debug!(request_id = %req.id, boundary = %boundary, "boundary sniffed from body");

        let mut mp = MultipartParser::new(&boundary);
        // replay everything seen so far, including the boundary line itself
        mp.feed(&self.sniff)?;
        self.sniff.clear();
        self.sniffing = false;
        req.multipart_boundary = Some(boundary);
        self.multipart = Some(mp);
        Ok(())
    }

    fn chunk_size(&mut self) -> Result<(), ParseError> {
        let line = std::mem::take(&mut self.line);
        let text = std::str::from_utf8(&line).map_err(|_| ParseError::BadChunkSize)?;
        let size_part = text
            .trim_end_matches('\r')
            .split(';')
            .next()
            .unwrap_or_default()
            .trim();
        let size = usize::from_str_radix(size_part, 16).map_err(|_| ParseError::BadChunkSize)?;
        if size == 0 {
            self.state = ParseState::Trailer;
        } else {
            self.remaining = size;
            self.state = ParseState::ChunkData;
        }
        Ok(())
    }

    fn message_complete(&mut self, req: &mut Request) -> Result<(), ParseError> {
        if self.sniffing {
            // the body ended before the sniff decided; keep the bytes raw
            self.sniffing = false;
            req.body.append(&mut self.sniff);
        }
        if let Some(mp) = self.multipart.take() {
            req.parts = mp.finish()?;
        }
        self.state = ParseState::Complete;
        debug!(
            request_id = %req.id,
            method = %req.method,
            path = %req.url.path,
            body_bytes = req.body.len(),
            parts = req.parts.len(),
            "message complete"
        );
        Ok(())
    }
}

/// Extract the `boundary` parameter from a Content-Type value.
fn boundary_param(content_type: &str) -> Option<String> {
    for segment in content_type.split(';').skip(1) {
        let segment = segment.trim();
        if segment.len() > 9 && segment[..9].eq_ignore_ascii_case("boundary=") {
            let value = segment[9..].trim().trim_matches('"');
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}
