use http::StatusCode;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request error: {source}")]
    RequestError {
        #[from]
        source: ParseError,
    },

    #[error("response error: {source}")]
    ResponseError {
        #[from]
        source: SendError,
    },
}

/// Failures raised while turning raw socket bytes into a [`Request`](crate::protocol::Request).
///
/// Every variant except [`ParseError::Io`] carries an HTTP status (see [`ParseError::status`])
/// and its `Display` output is used verbatim as the plaintext body of the error response.
/// `Io` covers stream failures before the request head is complete; once the head is parsed an
/// I/O failure becomes [`ParseError::BodyIo`] and is still answered.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("BAD REQUEST: Request header exceeds {max_size} bytes.")]
    TooLargeHeader { max_size: usize },

    #[error("BAD REQUEST: Syntax error. Usage: GET /example/file.html")]
    SyntaxError,

    #[error("BAD REQUEST: Missing URI. Usage: GET /example/file.html")]
    MissingUri,

    #[error("BAD REQUEST: Syntax error. Unsupported method {method}")]
    InvalidMethod { method: String },

    #[error("BAD REQUEST: Invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("BAD REQUEST: Content type is multipart/form-data but boundary missing.")]
    MissingBoundary,

    #[error("BAD REQUEST: Content type is multipart/form-data but next chunk does not start with boundary.")]
    BoundaryMismatch,

    #[error("BAD REQUEST: Content type is multipart/form-data but no content-disposition info found.")]
    MissingDisposition,

    #[error("BAD REQUEST: Content type is multipart/form-data but content-disposition has no name.")]
    MissingFieldName,

    #[error("SERVER INTERNAL ERROR: multipart part {part} has no closing boundary ({found} found).")]
    BoundaryOverflow { part: usize, found: usize },

    #[error("SERVER INTERNAL ERROR: failed to read request body: {source}")]
    BodyIo {
        #[source]
        source: io::Error,
    },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn too_large_header(max_size: usize) -> Self {
        Self::TooLargeHeader { max_size }
    }

    pub fn invalid_method<S: ToString>(method: S) -> Self {
        Self::InvalidMethod { method: method.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    pub fn boundary_overflow(part: usize, found: usize) -> Self {
        Self::BoundaryOverflow { part, found }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }

    pub fn body_io<E: Into<io::Error>>(e: E) -> Self {
        Self::BodyIo { source: e.into() }
    }

    /// The status an error response should carry, or `None` when the failure happened on the
    /// connection itself and no response can be framed.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Io { .. } => None,
            Self::BoundaryOverflow { .. } | Self::BodyIo { .. } => Some(StatusCode::INTERNAL_SERVER_ERROR),
            _ => Some(StatusCode::BAD_REQUEST),
        }
    }

    #[inline]
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}
