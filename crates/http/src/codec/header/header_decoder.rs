//! Request header decoder.
//!
//! Driven by a `FramedRead`, the decoder is re-invoked every time more socket bytes land in the
//! read buffer. It waits for the `CRLFCRLF` terminator, then splits the header section off the
//! buffer (leaving any body bytes that arrived with it behind) and decodes:
//!
//! 1. the request line into method, path and query string
//! 2. the header fields, one `name: value` per line, up to the first blank line
//!
//! # Limits
//!
//! - The header section, terminator included, must fit in [`MAX_HEADER_BYTES`]
//! - Header fields are only read when the request line carries a protocol version token

use std::collections::HashMap;

use bytes::BytesMut;
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::codec::percent::{decode_params, decode_percent};
use crate::codec::scanner::{HeaderScanner, Lines};
use crate::ensure;
use crate::protocol::{Method, ParseError, RequestHead};

/// Maximum size in bytes allowed for the entire header section
pub const MAX_HEADER_BYTES: usize = 8 * 1024;

/// Decoder for HTTP request headers implementing the [`Decoder`] trait.
#[derive(Debug, Default)]
pub struct HeaderDecoder {
    scanner: HeaderScanner,
}

impl HeaderDecoder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for HeaderDecoder {
    type Item = RequestHead;
    type Error = ParseError;

    /// Attempts to decode the request head from the bytes read so far.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(head))` once the terminator is present; the header bytes are removed from `src`
    /// - `Ok(None)` if more data is needed
    /// - `Err(ParseError)` if the header outgrew [`MAX_HEADER_BYTES`] or is malformed
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.scanner.scan(src) {
            Some(header_end) => {
                trace!(header_size = header_end, "found header terminator");
                ensure!(header_end <= MAX_HEADER_BYTES, ParseError::too_large_header(MAX_HEADER_BYTES));

                let header_bytes = src.split_to(header_end);
                self.scanner = HeaderScanner::new();
                parse_head(&header_bytes).map(Some)
            }
            None => {
                ensure!(src.len() < MAX_HEADER_BYTES, ParseError::too_large_header(MAX_HEADER_BYTES));
                Ok(None)
            }
        }
    }
}

/// Decodes a complete header section.
pub fn parse_head(header: &[u8]) -> Result<RequestHead, ParseError> {
    let mut lines = Lines::new(header);

    let request_line = lines.next().ok_or(ParseError::SyntaxError)?;
    let mut tokens = request_line.split_ascii_whitespace();

    let method = tokens.next().ok_or(ParseError::SyntaxError)?;
    let raw_uri = tokens.next().ok_or(ParseError::MissingUri)?;

    let mut query_params = HashMap::new();
    let uri = match raw_uri.split_once('?') {
        Some((path, query)) => {
            decode_params(query, &mut query_params);
            decode_percent(path).into_owned()
        }
        None => decode_percent(raw_uri).into_owned(),
    };

    let mut headers = HashMap::new();
    if tokens.next().is_some() {
        for line in lines.take_while(|line| !line.trim().is_empty()) {
            if let Some((name, value)) = line.split_once(':') {
                headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
            }
        }
    }

    let method = method.parse::<Method>()?;

    Ok(RequestHead { method, uri, query_params, headers })
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn crlf(str: &str) -> BytesMut {
        BytesMut::from(str.replace('\n', "\r\n").as_str())
    }

    #[test]
    fn test_bytes_mut_lens() {
        let str = indoc! {r##"
        GET /index.html HTTP/1.1
        Host: 127.0.0.1:8080
        User-Agent: curl/7.79.1
        Accept: */*

        123"##};

        let mut bytes = crlf(str);

        let mut header_decoder = HeaderDecoder::new();

        let result = header_decoder.decode(&mut bytes).unwrap();

        assert!(result.is_some());

        assert_eq!(bytes.len(), 3);
        assert_eq!(&bytes[..], &b"123"[..]);
    }

    #[test]
    fn from_curl() {
        let str = indoc! {r##"
        GET /index.html HTTP/1.1
        Host: 127.0.0.1:8080
        User-Agent: curl/7.79.1
        Accept: */*

        "##};

        let mut buf = crlf(str);

        let head = HeaderDecoder::new().decode(&mut buf).unwrap().unwrap();

        assert!(buf.is_empty());
        assert_eq!(head.method(), Method::Get);
        assert_eq!(head.uri(), "/index.html");
        assert!(head.query_params().is_empty());

        assert_eq!(head.headers().len(), 3);
        assert_eq!(head.headers()["accept"], "*/*");
        assert_eq!(head.headers()["host"], "127.0.0.1:8080");
        assert_eq!(head.headers()["user-agent"], "curl/7.79.1");
    }

    #[test]
    fn from_edge() {
        let str = indoc! {r##"
        GET /index/?a=1&b=2&a=3 HTTP/1.1
        Host: 127.0.0.1:8080
        Connection: keep-alive
        Cache-Control: max-age=0
        sec-ch-ua: "#Not_A Brand";v="99", "Microsoft Edge";v="109", "Chromium";v="109"
        sec-ch-ua-mobile: ?0
        sec-ch-ua-platform: "macOS"
        Upgrade-Insecure-Requests: 1
        Accept-Language: zh-CN,zh;q=0.9,en-US;q=0.8,en;q=0.7

        "##};

        let mut buf = crlf(str);

        let head = HeaderDecoder::new().decode(&mut buf).unwrap().unwrap();

        assert_eq!(head.uri(), "/index/");
        assert_eq!(head.query_params().len(), 2);
        assert_eq!(head.query_params()["a"], "3");
        assert_eq!(head.query_params()["b"], "2");

        assert_eq!(head.headers().len(), 8);
        assert_eq!(head.headers()["connection"], "keep-alive");
        assert_eq!(head.headers()["cache-control"], "max-age=0");
        assert_eq!(head.headers()["sec-ch-ua"], r##""#Not_A Brand";v="99", "Microsoft Edge";v="109", "Chromium";v="109""##);
        assert_eq!(head.headers()["sec-ch-ua-platform"], "\"macOS\"");
        assert_eq!(head.headers()["upgrade-insecure-requests"], "1");
        assert_eq!(head.headers()["accept-language"], "zh-CN,zh;q=0.9,en-US;q=0.8,en;q=0.7");
    }

    #[test]
    fn partial_header_needs_more() {
        let mut decoder = HeaderDecoder::new();
        let mut buf = BytesMut::from("POST /upload HTTP/1.1\r\nContent-");

        assert!(decoder.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"Length: 3\r\n\r\nabc");
        let head = decoder.decode(&mut buf).unwrap().unwrap();

        assert_eq!(head.method(), Method::Post);
        assert_eq!(head.headers()["content-length"], "3");
        assert_eq!(&buf[..], b"abc");
    }

    #[test]
    fn header_fields_are_lowercased_and_trimmed() {
        let mut buf = BytesMut::from("GET / HTTP/1.1\r\n  X-Custom-ID :   42  \r\nno colon here\r\nX-Empty:\r\nx-custom-id: 43\r\n\r\n");

        let head = HeaderDecoder::new().decode(&mut buf).unwrap().unwrap();

        assert_eq!(head.headers().len(), 2);
        assert_eq!(head.headers()["x-custom-id"], "43");
        assert_eq!(head.headers()["x-empty"], "");
    }

    #[test]
    fn value_keeps_later_colons() {
        let head = parse_head(b"GET / HTTP/1.1\r\nHost: example.com:8080\r\n\r\n").unwrap();
        assert_eq!(head.headers()["host"], "example.com:8080");
    }

    #[test]
    fn no_version_skips_headers() {
        let head = parse_head(b"GET /plain\r\nHost: ignored\r\n\r\n").unwrap();

        assert_eq!(head.uri(), "/plain");
        assert!(head.headers().is_empty());
    }

    #[test]
    fn percent_decoded_path() {
        let head = parse_head(b"GET /a%20dir/caf%C3%A9?q=x%26y&name=J+D HTTP/1.1\r\n\r\n").unwrap();

        assert_eq!(head.uri(), "/a dir/café");
        assert_eq!(head.query_params()["q"], "x&y");
        assert_eq!(head.query_params()["name"], "J D");
    }

    #[test]
    fn unknown_method_is_rejected() {
        let result = parse_head(b"BREW /pot HTTP/1.1\r\n\r\n");
        assert!(matches!(result, Err(ParseError::InvalidMethod { ref method }) if method == "BREW"));
    }

    #[test]
    fn missing_uri() {
        let result = parse_head(b"GET\r\n\r\n");
        assert!(matches!(result, Err(ParseError::MissingUri)));
    }

    #[test]
    fn missing_uri_wins_over_bad_method() {
        let result = parse_head(b"BREW\r\n\r\n");
        assert!(matches!(result, Err(ParseError::MissingUri)));
    }

    #[test]
    fn empty_request_line() {
        assert!(matches!(parse_head(b"\r\n\r\n"), Err(ParseError::SyntaxError)));
        assert!(matches!(parse_head(b"   \r\n\r\n"), Err(ParseError::SyntaxError)));
    }

    #[test]
    fn too_large_header() {
        let mut buf = BytesMut::from("GET / HTTP/1.1\r\n");
        buf.extend_from_slice(format!("X-Filler: {}\r\n", "a".repeat(MAX_HEADER_BYTES)).as_bytes());

        let result = HeaderDecoder::new().decode(&mut buf);
        assert!(matches!(result, Err(ParseError::TooLargeHeader { max_size: MAX_HEADER_BYTES })));
    }

    #[test]
    fn terminator_past_limit_is_too_large() {
        let mut buf = BytesMut::from("GET / HTTP/1.1\r\n");
        buf.extend_from_slice(format!("X-Filler: {}\r\n\r\n", "a".repeat(MAX_HEADER_BYTES)).as_bytes());

        let result = HeaderDecoder::new().decode(&mut buf);
        assert!(matches!(result, Err(ParseError::TooLargeHeader { .. })));
    }

    #[test]
    fn exactly_full_buffer_without_terminator_fails() {
        let mut buf = BytesMut::from(&[b'a'; MAX_HEADER_BYTES][..]);
        assert!(HeaderDecoder::new().decode(&mut buf).is_err());

        let mut buf = BytesMut::from(&[b'a'; MAX_HEADER_BYTES - 1][..]);
        assert!(HeaderDecoder::new().decode(&mut buf).unwrap().is_none());
    }
}
