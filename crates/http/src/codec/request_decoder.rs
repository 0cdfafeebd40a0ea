//! Request decoding: from a connection's input stream to a complete [`Request`].
//!
//! Decoding runs in two phases over one stream:
//!
//! 1. **Header**: a [`FramedRead`] drives [`HeaderDecoder`] until the header terminator is seen.
//!    Whatever body bytes arrived in the same reads stay in the frame buffer.
//! 2. **Body**: those leftover bytes are chained in front of the live stream and the body is
//!    spooled to a temporary file in [`BODY_CHUNK_SIZE`] reads, bounded by `Content-Length`
//!    (or by the leftover size when the header is absent). A stream that ends early just yields
//!    a shorter body.
//!
//! The spooled body is then interpreted according to the method:
//!
//! - `POST`: the payload is the body text up to the first read ending in `CRLF`, trimmed. With
//!   form decoding enabled, `multipart/form-data` bodies are split into fields and files and
//!   other bodies are additionally read as urlencoded parameters.
//! - `PUT`: the spooled file is recorded under [`PUT_CONTENT_FIELD`] and the payload is the
//!   whole body.
//! - anything else: the body is spooled but never read back.

use std::io;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures::StreamExt;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::codec::FramedRead;
use tracing::{debug, info, warn};

use crate::codec::header::{HeaderDecoder, MAX_HEADER_BYTES};
use crate::codec::multipart::{PartContent, multipart_boundary, parse_parts};
use crate::codec::percent::decode_params;
use crate::protocol::{Method, PUT_CONTENT_FIELD, ParseError, Request};
use crate::temp::TempFileManager;

/// Size of each read while spooling a body to disk.
pub const BODY_CHUNK_SIZE: usize = 512;

/// Decodes one request, spooling its body into files owned by a [`TempFileManager`].
///
/// The decoder borrows the manager mutably, so every file it creates is cleaned up together
/// with the manager once the request is done.
#[derive(Debug)]
pub struct RequestDecoder<'a> {
    temp_files: &'a mut TempFileManager,
    decode_post_forms: bool,
}

/// A body copied to disk; `len` counts the bytes actually received.
#[derive(Debug, Default)]
struct SpooledBody {
    path: Option<PathBuf>,
    len: u64,
}

impl<'a> RequestDecoder<'a> {
    pub fn new(temp_files: &'a mut TempFileManager) -> Self {
        Self { temp_files, decode_post_forms: false }
    }

    /// Enables multipart and urlencoded decoding of `POST` bodies.
    #[must_use]
    pub fn decode_post_forms(mut self, enabled: bool) -> Self {
        self.decode_post_forms = enabled;
        self
    }

    /// Reads and decodes a single request from `reader`.
    ///
    /// # Errors
    ///
    /// - a protocol [`ParseError`] for a malformed request, carrying the response status
    /// - [`ParseError::Io`] when the stream fails, times out or closes before the header ends
    /// - [`ParseError::BodyIo`] when reading or spooling the body fails
    pub async fn decode<R>(mut self, reader: R) -> Result<Request, ParseError>
    where
        R: AsyncRead + Unpin,
    {
        let mut framed = FramedRead::with_capacity(reader, HeaderDecoder::new(), MAX_HEADER_BYTES);

        let head = match framed.next().await {
            Some(head) => head?,
            None => {
                return Err(ParseError::io(io::Error::new(io::ErrorKind::UnexpectedEof, "stream closed before request header")));
            }
        };

        let leftover = framed.read_buffer_mut().split().freeze();
        let body_len = match head.headers().get("content-length") {
            Some(value) => value.parse::<u64>().map_err(|e| ParseError::invalid_content_length(format!("{value:?}: {e}")))?,
            None => leftover.len() as u64,
        };

        let mut request = Request::from(head);
        info!(method = %request.method(), uri = request.uri(), body_len, "processing request");

        let mut body_reader = Cursor::new(leftover).chain(framed.into_inner());
        let body = self.spool_body(&mut body_reader, body_len).await.map_err(ParseError::body_io)?;
        debug!(received = body.len, "request body spooled");

        // other methods leave the spooled body on disk unread
        match (request.method(), body.path) {
            (Method::Post, Some(path)) => self.decode_post(&mut request, &path).await?,
            (Method::Put, Some(path)) if body.len > 0 => {
                request.payload = Bytes::from(tokio::fs::read(&path).await.map_err(ParseError::body_io)?);
                request.uploaded_files.insert(PUT_CONTENT_FIELD.to_string(), path);
            }
            _ => {}
        }

        Ok(request)
    }

    async fn spool_body<R>(&mut self, reader: &mut R, body_len: u64) -> io::Result<SpooledBody>
    where
        R: AsyncRead + Unpin,
    {
        if body_len == 0 {
            return Ok(SpooledBody::default());
        }

        let temp_file = match self.temp_files.create_temp_file().await {
            Ok(temp_file) => temp_file,
            Err(e) => {
                warn!(cause = %e, dir = %self.temp_files.dir().display(), "failed to create temp file, request body dropped");
                return Ok(SpooledBody::default());
            }
        };

        let mut buf = [0u8; BODY_CHUNK_SIZE];
        let mut remaining = body_len;
        while remaining > 0 {
            let want = usize::try_from(remaining).map_or(BODY_CHUNK_SIZE, |remaining| remaining.min(BODY_CHUNK_SIZE));
            let read = reader.read(&mut buf[..want]).await?;
            if read == 0 {
                debug!(missing = remaining, "stream ended before declared body length");
                break;
            }
            temp_file.write_all(&buf[..read]).await?;
            remaining -= read as u64;
        }
        temp_file.close().await?;

        Ok(SpooledBody { path: Some(temp_file.path().to_path_buf()), len: body_len - remaining })
    }

    async fn decode_post(&mut self, request: &mut Request, path: &Path) -> Result<(), ParseError> {
        let mut file = File::open(path).await.map_err(ParseError::body_io)?;
        request.payload = read_post_payload(&mut file).await.map_err(ParseError::body_io)?;

        if !self.decode_post_forms {
            return Ok(());
        }

        let boundary = match request.content_type() {
            Some(content_type) => multipart_boundary(content_type)?,
            None => None,
        };

        match boundary {
            Some(boundary) => {
                // parts are located by offsets into the whole body
                let body = Bytes::from(tokio::fs::read(path).await.map_err(ParseError::body_io)?);
                self.decode_multipart(request, &body, &boundary).await
            }
            None => {
                let form = String::from_utf8_lossy(&request.payload).into_owned();
                decode_params(&form, &mut request.query_params);
                Ok(())
            }
        }
    }

    /// Text fields land in the query parameters. File fields store their filename there and their
    /// contents in a fresh temporary file; the payload becomes the last file saved.
    async fn decode_multipart(&mut self, request: &mut Request, body: &Bytes, boundary: &str) -> Result<(), ParseError> {
        for part in parse_parts(body, boundary)? {
            match part.content {
                PartContent::Text(value) => {
                    request.query_params.insert(part.name, value);
                }
                PartContent::File { filename, range } => {
                    if !range.is_empty() {
                        let contents = body.slice(range);
                        match self.save_file(&contents).await {
                            Ok(path) => {
                                request.uploaded_files.insert(part.name.clone(), path);
                                request.payload = contents;
                            }
                            Err(e) => warn!(field = %part.name, cause = %e, "failed to save uploaded file"),
                        }
                    }
                    request.query_params.insert(part.name, filename);
                }
            }
        }
        Ok(())
    }

    async fn save_file(&mut self, contents: &[u8]) -> io::Result<PathBuf> {
        let temp_file = self.temp_files.create_temp_file().await?;
        temp_file.write_all(contents).await?;
        temp_file.close().await?;
        Ok(temp_file.path().to_path_buf())
    }
}

/// Reads `reader` in [`BODY_CHUNK_SIZE`] chunks up to and including the first one that leaves the
/// text ending in `CRLF`, and returns that text with surrounding whitespace trimmed.
async fn read_post_payload<R>(reader: &mut R) -> io::Result<Bytes>
where
    R: AsyncRead + Unpin,
{
    let mut payload = Vec::new();
    loop {
        let read = (&mut *reader).take(BODY_CHUNK_SIZE as u64).read_to_end(&mut payload).await?;
        if read == 0 || payload.ends_with(b"\r\n") {
            break;
        }
    }

    let payload = Bytes::from(payload);
    Ok(payload.slice_ref(payload.trim_ascii()))
}
