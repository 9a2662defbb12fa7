//! Serializes a finished [`Response`] onto the transport.
//!
//! Framing headers (`Content-Length`, `Transfer-Encoding`, `Connection`) are
//! owned by the writer; values an application put in the header map under
//! those names are dropped rather than duplicated.

use std::io;

use tracing::warn;

use crate::model::{Body, ChunkReceiver, Response};
use crate::transport::Transport;

/// Write the status line, headers, cookies, and body. A chunked response
/// drains its queue here, one in-flight write at a time, until the final
/// chunk has been sent.
pub fn write_response<T: Transport + ?Sized>(
    transport: &mut T,
    response: &mut Response,
    keep_alive: bool,
) -> io::Result<()> {
    let body = response.take_output();

    let mut head = String::with_capacity(256);
    head.push_str(&format!(
        "HTTP/1.1 {} {}\r\n",
        response.status,
        status_reason(response.status)
    ));
    for (name, value) in response.headers.iter() {
        if matches!(name, "content-length" | "transfer-encoding" | "connection") {
            continue;
        }
        head.push_str(&format!("{name}: {value}\r\n"));
    }
    for cookie in &response.cookies {
        match &cookie.attributes {
            Some(attrs) => head.push_str(&format!(
                "Set-Cookie: {}={}; {}\r\n",
                cookie.name, cookie.value, attrs
            )),
            None => head.push_str(&format!("Set-Cookie: {}={}\r\n", cookie.name, cookie.value)),
        }
    }
    match &body {
        Body::Empty => head.push_str("Content-Length: 0\r\n"),
        Body::Plain(s) => head.push_str(&format!("Content-Length: {}\r\n", s.len())),
        Body::Chunked(_) => head.push_str("Transfer-Encoding: chunked\r\n"),
    }
    if !keep_alive {
        head.push_str("Connection: close\r\n");
    }
    head.push_str("\r\n");
    transport.write_all(head.as_bytes())?;

    match body {
        Body::Empty => {}
        Body::Plain(s) => transport.write_all(s.as_bytes())?,
        Body::Chunked(queue) => drain_chunks(transport, queue)?,
    }
    transport.flush()
}

/// Drain the chunk queue in FIFO order. An empty queue suspends this
/// coroutine until a producer pushes; the push wakes the drain loop back up.
/// After the final chunk the terminal zero-length marker is emitted and the
/// response is done.
pub fn drain_chunks<T: Transport + ?Sized>(
    transport: &mut T,
    queue: ChunkReceiver,
) -> io::Result<()> {
    loop {
        match queue.recv() {
            Some(chunk) => {
                if !chunk.data.is_empty() {
                    transport.write_all(format!("{:x}\r\n", chunk.data.len()).as_bytes())?;
                    transport.write_all(&chunk.data)?;
                    transport.write_all(b"\r\n")?;
                }
                if chunk.last {
                    return transport.write_all(b"0\r\n\r\n");
                }
            }
            None => {
                // every producer is gone without marking the end
                warn!("chunk stream ended without a final chunk; terminating response");
                return transport.write_all(b"0\r\n\r\n");
            }
        }
    }
}

fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        413 => "Payload Too Large",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        503 => "Service Unavailable",
        _ => "OK",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_reason() {
        assert_eq!(status_reason(200), "OK");
        assert_eq!(status_reason(404), "Not Found");
        assert_eq!(status_reason(501), "Not Implemented");
        assert_eq!(status_reason(299), "OK");
    }
}
