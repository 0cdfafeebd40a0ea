//! HTTP response model.
//!
//! A [`Response`] is built by a [`Handler`](crate::handler::Handler) and serialized exactly once
//! by [`ResponseWriter`](crate::connection::ResponseWriter), after which its body is dropped.
//! Header names keep the case they were supplied with.

use std::fmt::{Debug, Formatter};
use std::io;

use bytes::{Buf, Bytes};
use http::StatusCode;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::protocol::Method;

/// Status line and caller-supplied headers of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub(crate) status: StatusCode,
    pub(crate) mime_type: Option<String>,
    pub(crate) headers: Vec<(String, String)>,
}

impl ResponseHead {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Returns the first header whose name matches `name` case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(key, _)| key.eq_ignore_ascii_case(name)).map(|(_, value)| value.as_str())
    }
}

/// The byte source of a response.
#[derive(Default)]
pub enum ResponseBody {
    #[default]
    Empty,
    Bytes(Bytes),
    /// A streamed source. `available` is the number of bytes the reader can deliver right now and
    /// is what a fixed-length response declares in `Content-Length`.
    Reader { reader: Box<dyn AsyncRead + Send + Unpin>, available: u64 },
}

impl ResponseBody {
    pub fn reader<R>(reader: R, available: u64) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        Self::Reader { reader: Box::new(reader), available }
    }

    /// Bytes that can currently be read without blocking on the producer.
    pub fn available(&self) -> u64 {
        match self {
            Self::Empty => 0,
            Self::Bytes(bytes) => bytes.len() as u64,
            Self::Reader { available, .. } => *available,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.available() == 0
    }

    /// Reads the next slice of the body into `buf`, returning 0 once the source is exhausted.
    pub async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Empty => Ok(0),
            Self::Bytes(bytes) => {
                let len = bytes.len().min(buf.len());
                buf[..len].copy_from_slice(&bytes[..len]);
                bytes.advance(len);
                Ok(len)
            }
            Self::Reader { reader, available } => {
                let read = reader.read(buf).await?;
                *available = available.saturating_sub(read as u64);
                Ok(read)
            }
        }
    }
}

impl Debug for ResponseBody {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::Reader { available, .. } => f.debug_struct("Reader").field("available", available).finish_non_exhaustive(),
        }
    }
}

impl From<Bytes> for ResponseBody {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Vec<u8>> for ResponseBody {
    fn from(vec: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(vec))
    }
}

impl From<String> for ResponseBody {
    fn from(str: String) -> Self {
        Self::Bytes(Bytes::from(str))
    }
}

impl From<&'static str> for ResponseBody {
    fn from(str: &'static str) -> Self {
        Self::Bytes(Bytes::from_static(str.as_bytes()))
    }
}

#[derive(Debug)]
pub struct Response {
    head: ResponseHead,
    body: ResponseBody,
    request_method: Option<Method>,
    chunked: bool,
}

impl Response {
    pub fn new(status: StatusCode, body: impl Into<ResponseBody>) -> Self {
        Self {
            head: ResponseHead { status, mime_type: None, headers: Vec::new() },
            body: body.into(),
            request_method: None,
            chunked: false,
        }
    }

    /// A `200 OK` response with an HTML body.
    pub fn html(body: impl Into<ResponseBody>) -> Self {
        Self::new(StatusCode::OK, body).with_mime_type(mime::TEXT_HTML.as_ref())
    }

    /// A plaintext response, used for every error the server produces itself.
    pub fn text(status: StatusCode, message: impl Into<String>) -> Self {
        Self::new(status, message.into()).with_mime_type(mime::TEXT_PLAIN.as_ref())
    }

    pub fn method_not_allowed(method: Method) -> Self {
        Self::text(StatusCode::METHOD_NOT_ALLOWED, format!("{method} NOT IMPLEMENTED: "))
    }

    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.head.mime_type = Some(mime_type.into());
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_header(name, value);
        self
    }

    /// Sets a header, replacing an earlier value stored under exactly the same name.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let (name, value) = (name.into(), value.into());
        match self.head.headers.iter_mut().find(|(key, _)| *key == name) {
            Some((_, old)) => *old = value,
            None => self.head.headers.push((name, value)),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.head.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.head.status = status;
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.head.mime_type()
    }

    pub fn set_mime_type(&mut self, mime_type: Option<String>) {
        self.head.mime_type = mime_type;
    }

    pub fn head(&self) -> &ResponseHead {
        &self.head
    }

    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    pub fn set_body(&mut self, body: impl Into<ResponseBody>) {
        self.body = body.into();
    }

    pub fn request_method(&self) -> Option<Method> {
        self.request_method
    }

    pub fn set_request_method(&mut self, method: Method) {
        self.request_method = Some(method);
    }

    pub fn is_chunked(&self) -> bool {
        self.chunked
    }

    pub fn set_chunked(&mut self, chunked: bool) {
        self.chunked = chunked;
    }

    pub fn into_parts(self) -> (ResponseHead, ResponseBody, Option<Method>, bool) {
        (self.head, self.body, self.request_method, self.chunked)
    }
}
