//! Response header encoder.
//!
//! Writes, in order: the status line, `Content-Type` when a mime type is set, a `Date` header
//! unless the caller supplied one, the caller's headers, and finally the framing header chosen
//! by the [`PayloadSize`]. Caller-supplied `Content-Length` and `Transfer-Encoding` headers are
//! dropped so the framing header is the only one on the wire.

use std::io;
use std::io::Write;
use std::time::SystemTime;

use bytes::{BufMut, BytesMut};
use http::header;
use tokio_util::codec::Encoder;

use crate::protocol::{PayloadSize, ResponseHead, SendError};

/// Initial buffer size allocated for header serialization
const INIT_HEADER_SIZE: usize = 4 * 1024;

/// Encoder for HTTP response headers implementing the [`Encoder`] trait.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderEncoder;

impl Encoder<(ResponseHead, PayloadSize)> for HeaderEncoder {
    type Error = SendError;

    fn encode(&mut self, item: (ResponseHead, PayloadSize), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (head, payload_size) = item;

        dst.reserve(INIT_HEADER_SIZE);
        write!(
            FastWrite(dst),
            "HTTP/1.1 {} {}\r\n",
            head.status().as_str(),
            head.status().canonical_reason().unwrap_or_default()
        )?;

        if let Some(mime_type) = head.mime_type() {
            put_header(dst, "Content-Type", mime_type.as_bytes());
        }

        if head.header(header::DATE.as_str()).is_none() {
            put_header(dst, "Date", httpdate::fmt_http_date(SystemTime::now()).as_bytes());
        }

        for (name, value) in head.headers() {
            if name.eq_ignore_ascii_case(header::CONTENT_LENGTH.as_str()) || name.eq_ignore_ascii_case(header::TRANSFER_ENCODING.as_str()) {
                continue;
            }
            put_header(dst, name, value.as_bytes());
        }

        match payload_size {
            PayloadSize::Length(n) => write!(FastWrite(dst), "Content-Length: {n}\r\n")?,
            PayloadSize::Chunked => put_header(dst, "Transfer-Encoding", b"chunked"),
            PayloadSize::Empty => put_header(dst, "Content-Length", b"0"),
        }

        dst.put_slice(b"\r\n");
        Ok(())
    }
}

fn put_header(dst: &mut BytesMut, name: &str, value: &[u8]) {
    dst.put_slice(name.as_bytes());
    dst.put_slice(b": ");
    dst.put_slice(value);
    dst.put_slice(b"\r\n");
}

/// `io::Write` adapter so `write!` can format straight into the buffer.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
