//! Parsed HTTP request.
//!
//! A [`Request`] is produced once by [`RequestDecoder`](crate::codec::RequestDecoder) and is
//! read-only afterwards. Paths listed in [`Request::uploaded_files`] point at temporary files
//! that live exactly as long as the connection's
//! [`TempFileManager`](crate::temp::TempFileManager).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::protocol::Method;

/// The field name a raw `PUT` body is recorded under in [`Request::uploaded_files`].
pub const PUT_CONTENT_FIELD: &str = "content";

/// Request line and header fields, as decoded from the header section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    pub(crate) method: Method,
    pub(crate) uri: String,
    pub(crate) query_params: HashMap<String, String>,
    pub(crate) headers: HashMap<String, String>,
}

impl RequestHead {
    pub fn method(&self) -> Method {
        self.method
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn query_params(&self) -> &HashMap<String, String> {
        &self.query_params
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }
}

#[derive(Debug, Clone)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) uri: String,
    pub(crate) query_params: HashMap<String, String>,
    pub(crate) headers: HashMap<String, String>,
    pub(crate) payload: Bytes,
    pub(crate) uploaded_files: HashMap<String, PathBuf>,
}

impl From<RequestHead> for Request {
    fn from(head: RequestHead) -> Self {
        Self {
            method: head.method,
            uri: head.uri,
            query_params: head.query_params,
            headers: head.headers,
            payload: Bytes::new(),
            uploaded_files: HashMap::new(),
        }
    }
}

impl Request {
    pub fn method(&self) -> Method {
        self.method
    }

    /// Percent-decoded request path, without the query string.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Decoded query parameters; for a repeated key the last occurrence wins.
    pub fn query_params(&self) -> &HashMap<String, String> {
        &self.query_params
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(String::as_str)
    }

    /// Request headers keyed by lowercase name, values trimmed.
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Looks up a header; `name` is matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header(http::header::CONTENT_TYPE.as_str())
    }

    /// Body bytes as interpreted for the method: the trimmed text for `POST`, the raw body for
    /// `PUT`, empty otherwise.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn uploaded_files(&self) -> &HashMap<String, PathBuf> {
        &self.uploaded_files
    }

    pub fn uploaded_file(&self, field: &str) -> Option<&Path> {
        self.uploaded_files.get(field).map(PathBuf::as_path)
    }
}
