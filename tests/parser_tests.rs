use gantry::model::Request;
use gantry::parse::{HttpParser, ParseError};
use http::{Method, Version};

mod tracing_util;
use tracing_util::TestTracing;

fn parse_in_chunks(raw: &[u8], chunk_size: usize) -> Result<Request, ParseError> {
    let mut parser = HttpParser::new();
    let mut req = Request::new();
    for piece in raw.chunks(chunk_size.max(1)) {
        parser.feed(piece, &mut req)?;
    }
    assert!(
        parser.is_complete(),
        "message incomplete at chunk size {chunk_size}"
    );
    Ok(req)
}

const SIMPLE: &[u8] = b"POST /items?limit=5&limit=9 HTTP/1.1\r\n\
Host: shop.example:8080\r\n\
X-Trace: abc\r\n\
Content-Length: 11\r\n\
\r\n\
hello world";

#[test]
fn test_one_shot_parse() {
    let _tracing = TestTracing::init();
    let req = parse_in_chunks(SIMPLE, SIMPLE.len()).unwrap();
    assert_eq!(req.method, Method::POST);
    assert_eq!(req.version, Version::HTTP_11);
    assert_eq!(req.url.host, "shop.example");
    assert_eq!(req.url.port, Some(8080));
    assert_eq!(req.url.path, "/items");
    assert_eq!(req.query_param("limit"), Some("9"));
    assert_eq!(req.header("x-trace"), Some("abc"));
    assert_eq!(req.body, b"hello world");
    assert!(req.keep_alive);
    assert!(!req.upgrade);
}

#[test]
fn test_chunk_boundary_invariance() {
    let reference = parse_in_chunks(SIMPLE, SIMPLE.len()).unwrap();
    for size in 1..SIMPLE.len() {
        let req = parse_in_chunks(SIMPLE, size).unwrap();
        assert_eq!(req.method, reference.method, "chunk size {size}");
        assert_eq!(req.url.path, reference.url.path, "chunk size {size}");
        assert_eq!(req.url.host, reference.url.host, "chunk size {size}");
        assert_eq!(
            req.header("x-trace"),
            reference.header("x-trace"),
            "chunk size {size}"
        );
        assert_eq!(req.body, reference.body, "chunk size {size}");
    }
}

#[test]
fn test_header_split_mid_name_and_mid_value() {
    let mut parser = HttpParser::new();
    let mut req = Request::new();
    // the field name and value both straddle feed boundaries
    for piece in [
        &b"GET / HTTP/1.1\r\nHost: h\r\nX-Lo"[..],
        &b"ng-Name: some val"[..],
        &b"ue here\r\n\r\n"[..],
    ] {
        parser.feed(piece, &mut req).unwrap();
    }
    assert!(parser.is_complete());
    assert_eq!(req.header("x-long-name"), Some("some value here"));
}

#[test]
fn test_folded_continuation_line_extends_value() {
    let raw = b"GET / HTTP/1.1\r\nHost: h\r\nX-Fold: first\r\n\tsecond\r\n\r\n";
    let req = parse_in_chunks(raw, raw.len()).unwrap();
    assert_eq!(req.header("x-fold"), Some("first second"));
}

#[test]
fn test_repeated_header_is_last_write_wins() {
    let raw = b"GET / HTTP/1.1\r\nHost: h\r\nX-Dup: one\r\nX-Dup: two\r\n\r\n";
    let req = parse_in_chunks(raw, raw.len()).unwrap();
    assert_eq!(req.header("x-dup"), Some("two"));
    // pinned across arbitrary chunking as well
    for size in 1..raw.len() {
        let req = parse_in_chunks(raw, size).unwrap();
        assert_eq!(req.header("x-dup"), Some("two"), "chunk size {size}");
    }
}

#[test]
fn test_connection_close_clears_keep_alive() {
    let raw = b"GET / HTTP/1.1\r\nHost: h\r\nConnection: close\r\n\r\n";
    let req = parse_in_chunks(raw, raw.len()).unwrap();
    assert!(!req.keep_alive);
}

#[test]
fn test_http_10_defaults_to_close() {
    let raw = b"GET / HTTP/1.0\r\nHost: h\r\n\r\n";
    let req = parse_in_chunks(raw, raw.len()).unwrap();
    assert!(!req.keep_alive);

    let raw = b"GET / HTTP/1.0\r\nHost: h\r\nConnection: keep-alive\r\n\r\n";
    let req = parse_in_chunks(raw, raw.len()).unwrap();
    assert!(req.keep_alive);
}

#[test]
fn test_upgrade_flag_captured() {
    let raw = b"GET /ws HTTP/1.1\r\nHost: h\r\nConnection: Upgrade\r\nUpgrade: websocket\r\n\r\n";
    let req = parse_in_chunks(raw, raw.len()).unwrap();
    assert!(req.upgrade);
}

#[test]
fn test_chunked_body_is_decoded() {
    let raw = b"POST /in HTTP/1.1\r\nHost: h\r\nTransfer-Encoding: chunked\r\n\r\n\
4\r\nWiki\r\n5\r\npedia\r\n0\r\n\r\n";
    for size in [raw.len(), 1, 3, 7] {
        let req = parse_in_chunks(raw, size).unwrap();
        assert_eq!(req.body, b"Wikipedia", "chunk size {size}");
    }
}

#[test]
fn test_chunk_size_extension_is_ignored() {
    let raw = b"POST /in HTTP/1.1\r\nHost: h\r\nTransfer-Encoding: chunked\r\n\r\n\
3;ext=1\r\nabc\r\n0\r\n\r\n";
    let req = parse_in_chunks(raw, raw.len()).unwrap();
    assert_eq!(req.body, b"abc");
}

#[test]
fn test_trailing_bytes_are_fatal() {
    let mut parser = HttpParser::new();
    let mut req = Request::new();
    let raw = b"GET / HTTP/1.1\r\nHost: h\r\n\r\nGET /second HTTP/1.1\r\n";
    let err = parser.feed(raw, &mut req).unwrap_err();
    assert_eq!(err, ParseError::TrailingBytes);
}

#[test]
fn test_bad_start_line_is_fatal() {
    let mut parser = HttpParser::new();
    let mut req = Request::new();
    let err = parser.feed(b"NOT A REQUEST LINE AT ALL\r\n", &mut req).unwrap_err();
    assert!(matches!(err, ParseError::BadStartLine(_)));
}

#[test]
fn test_bad_content_length_is_fatal() {
    let mut parser = HttpParser::new();
    let mut req = Request::new();
    let err = parser
        .feed(b"GET / HTTP/1.1\r\nHost: h\r\nContent-Length: nope\r\n\r\n", &mut req)
        .unwrap_err();
    assert!(matches!(err, ParseError::BadHeader(_)));
}

#[test]
fn test_reset_rearms_for_next_message() {
    let mut parser = HttpParser::new();
    let mut req = Request::new();
    parser.feed(SIMPLE, &mut req).unwrap();
    assert!(parser.is_complete());

    parser.reset();
    req.reset();
    assert!(parser.is_idle());
    parser
        .feed(b"GET /next HTTP/1.1\r\nHost: h\r\n\r\n", &mut req)
        .unwrap();
    assert!(parser.is_complete());
    assert_eq!(req.method, Method::GET);
    assert_eq!(req.url.path, "/next");
    assert!(req.body.is_empty());
}

#[test]
fn test_cookies_parse_lazily() {
    let raw = b"GET / HTTP/1.1\r\nHost: h\r\nCookie: sid=s3cr3t; theme=dark\r\n\r\n";
    let req = parse_in_chunks(raw, raw.len()).unwrap();
    assert_eq!(req.cookie("sid"), Some("s3cr3t"));
    assert_eq!(req.cookie("theme"), Some("dark"));
}
