use std::any::Any;
use std::io;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use http::StatusCode;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tracing::{debug, error, warn};

use crate::codec::RequestDecoder;
use crate::connection::registry::{ConnectionRegistry, Registration, TcpStreamBreaker};
use crate::connection::response_writer::ResponseWriter;
use crate::handler::Handler;
use crate::protocol::{HttpError, Request, Response};
use crate::temp::TempFileManager;
use crate::timeout::TimeoutReader;

/// Default limit for a single socket read while a request is being received.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(5000);

/// Per-connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionOptions {
    /// Limit for each individual read of the request.
    pub read_timeout: Duration,
    /// Directory request bodies are spooled into.
    pub temp_dir: PathBuf,
    /// Decode multipart and urlencoded `POST` bodies.
    pub decode_post_forms: bool,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self { read_timeout: DEFAULT_READ_TIMEOUT, temp_dir: std::env::temp_dir(), decode_post_forms: false }
    }
}

/// One request/response exchange on an accepted connection.
///
/// [`process`](Self::process) reads one request, hands it to the handler and writes the
/// response. Whatever the outcome, the write side is shut down and every temporary file of the
/// request is deleted before it returns. Keep-alive is not supported.
///
/// # Type Parameters
///
/// * `R`: The async readable stream type
/// * `W`: The async writable stream type
#[derive(Debug)]
pub struct HttpConnection<R, W> {
    reader: R,
    writer: ResponseWriter<W>,
    options: ConnectionOptions,
    registration: Option<Registration>,
}

impl HttpConnection<OwnedReadHalf, OwnedWriteHalf> {
    /// Wraps an accepted socket and registers it in `registry` for the lifetime of the
    /// connection.
    pub fn accept(stream: TcpStream, registry: &Arc<ConnectionRegistry>, options: ConnectionOptions) -> io::Result<Self> {
        let (stream, breaker) = TcpStreamBreaker::split_off(stream)?;
        let registration = registry.register(breaker);
        let (reader, writer) = stream.into_split();

        let mut connection = Self::new(reader, writer, options);
        connection.registration = Some(registration);
        Ok(connection)
    }
}

impl<R, W> HttpConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W, options: ConnectionOptions) -> Self {
        Self { reader, writer: ResponseWriter::new(writer), options, registration: None }
    }

    /// Serves a single request.
    ///
    /// # Errors
    ///
    /// Returns the [`ParseError`](crate::protocol::ParseError) that ended the exchange early. A
    /// protocol error or a failure while reading the body has already been answered with its
    /// status when this returns; an I/O error before the header ended means no response was sent. Handler failures and failures while writing the response are
    /// handled here and do not surface.
    pub async fn process<H>(self, handler: &H) -> Result<(), HttpError>
    where
        H: Handler + ?Sized,
    {
        let Self { reader, mut writer, options, registration } = self;
        let mut temp_files = TempFileManager::new(&options.temp_dir);

        let reader = Box::pin(TimeoutReader::new(reader, options.read_timeout));
        let parsed = RequestDecoder::new(&mut temp_files).decode_post_forms(options.decode_post_forms).decode(reader).await;

        let result = match parsed {
            Ok(request) => {
                let response = dispatch(handler, &request).await;
                send_response(&mut writer, response).await;
                Ok(())
            }
            Err(e) => match e.status() {
                Some(status) => {
                    warn!(status = status.as_u16(), cause = %e, "rejecting request");
                    send_response(&mut writer, Response::text(status, e.to_string())).await;
                    Err(e.into())
                }
                None => {
                    debug!(cause = %e, "connection failed before a request was read");
                    Err(e.into())
                }
            },
        };

        if let Err(e) = writer.get_mut().shutdown().await {
            debug!(cause = %e, "failed to shut down connection output");
        }
        temp_files.clear();
        drop(registration);

        result
    }
}

/// Runs the handler, turning an error or a panic into a `500` response.
async fn dispatch<H>(handler: &H, request: &Request) -> Response
where
    H: Handler + ?Sized,
{
    let mut response = match AssertUnwindSafe(handler.dispatch(request)).catch_unwind().await {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => {
            error!(method = %request.method(), uri = request.uri(), cause = %e, "handler failed");
            internal_error(&e.to_string())
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            error!(method = %request.method(), uri = request.uri(), cause = message, "handler panicked");
            internal_error(message)
        }
    };

    if response.request_method().is_none() {
        response.set_request_method(request.method());
    }
    response
}

fn internal_error(message: &str) -> Response {
    Response::text(StatusCode::INTERNAL_SERVER_ERROR, format!("SERVER INTERNAL ERROR: {message}"))
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "handler panicked"
    }
}

/// Sends `response`; a failure here cannot be reported to the peer and is only logged.
async fn send_response<W>(writer: &mut ResponseWriter<W>, response: Response)
where
    W: AsyncWrite + Unpin,
{
    let status = response.status();
    if let Err(e) = writer.send(response).await {
        warn!(status = status.as_u16(), cause = %e, "failed to send response");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::HandlerError;
    use crate::protocol::{Method, ParseError};
    use async_trait::async_trait;
    use tokio::io::{AsyncReadExt, DuplexStream, duplex};

    struct TestHandler;

    #[async_trait]
    impl Handler for TestHandler {
        async fn get(&self, request: &Request) -> Result<Response, HandlerError> {
            match request.uri() {
                "/fail" => Err("database is down".into()),
                "/panic" => panic!("boom"),
                uri => Ok(Response::text(StatusCode::OK, format!("you asked for {uri}"))),
            }
        }

        async fn head(&self, _request: &Request) -> Result<Response, HandlerError> {
            Ok(Response::text(StatusCode::OK, "head body"))
        }

        async fn put(&self, request: &Request) -> Result<Response, HandlerError> {
            let path = request.uploaded_file(crate::protocol::PUT_CONTENT_FIELD).ok_or("no upload")?;
            Ok(Response::text(StatusCode::OK, path.display().to_string()))
        }
    }

    fn options(name: &str) -> ConnectionOptions {
        let temp_dir = std::env::temp_dir().join(format!("spool-http-conn-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&temp_dir).unwrap();
        ConnectionOptions { temp_dir, ..ConnectionOptions::default() }
    }

    /// Runs one exchange and returns the result with everything written back.
    async fn exchange(raw: &[u8], options: ConnectionOptions) -> (Result<(), HttpError>, String) {
        let (output, mut peer): (DuplexStream, DuplexStream) = duplex(64 * 1024);
        let connection = HttpConnection::new(raw, output, options);
        let result = connection.process(&TestHandler).await;

        let mut written = String::new();
        peer.read_to_string(&mut written).await.unwrap();
        (result, written)
    }

    #[tokio::test]
    async fn serves_request() {
        let (result, written) = exchange(b"GET /hello HTTP/1.1\r\nHost: x\r\n\r\n", options("ok")).await;

        assert!(matches!(result, Ok(())));
        assert!(written.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(written.contains("Content-Type: text/plain\r\n"));
        assert!(written.ends_with("\r\n\r\nyou asked for /hello"));
    }

    #[tokio::test]
    async fn handler_error_is_500() {
        let (result, written) = exchange(b"GET /fail HTTP/1.1\r\n\r\n", options("fail")).await;

        assert!(matches!(result, Ok(())));
        assert!(written.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
        assert!(written.ends_with("SERVER INTERNAL ERROR: database is down"));
    }

    #[tokio::test]
    async fn handler_panic_is_500() {
        let (_, written) = exchange(b"GET /panic HTTP/1.1\r\n\r\n", options("panic")).await;

        assert!(written.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
        assert!(written.ends_with("SERVER INTERNAL ERROR: boom"));
    }

    #[tokio::test]
    async fn head_response_has_no_body() {
        let (_, written) = exchange(b"HEAD / HTTP/1.1\r\n\r\n", options("head")).await;

        assert!(written.contains("Content-Length: 9\r\n"));
        assert!(written.ends_with("\r\n\r\n"));
    }

    #[tokio::test]
    async fn protocol_error_is_answered() {
        let (result, written) = exchange(b"BREW /pot HTTP/1.1\r\n\r\n", options("brew")).await;

        assert!(matches!(result, Err(HttpError::RequestError { source: ParseError::InvalidMethod { .. } })));
        assert!(written.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(written.ends_with("BAD REQUEST: Syntax error. Unsupported method BREW"));
    }

    #[tokio::test]
    async fn missing_uri_is_answered() {
        let (_, written) = exchange(b"GET\r\n\r\n", options("no-uri")).await;

        assert!(written.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(written.contains("Missing URI"));
    }

    #[tokio::test]
    async fn io_error_sends_nothing() {
        let (result, written) = exchange(b"GET /half", options("half")).await;

        assert!(matches!(result, Err(HttpError::RequestError { ref source }) if source.is_io()));
        assert!(written.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_body_is_answered_with_500() {
        let (mut client, input) = duplex(64);
        client.write_all(b"PUT /doc HTTP/1.1\r\nContent-Length: 10\r\n\r\nabc").await.unwrap();
        let (output, mut peer) = duplex(64 * 1024);

        let result = HttpConnection::new(input, output, options("stalled-body")).process(&TestHandler).await;
        let mut written = String::new();
        peer.read_to_string(&mut written).await.unwrap();

        assert!(matches!(result, Err(HttpError::RequestError { source: ParseError::BodyIo { .. } })));
        assert!(written.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
        assert!(written.contains("SERVER INTERNAL ERROR: failed to read request body"));
        drop(client);
    }

    #[tokio::test]
    async fn temp_files_are_removed_after_response() {
        let options = options("cleanup");
        let (_, written) = exchange(b"PUT /doc HTTP/1.1\r\nContent-Length: 4\r\n\r\ndata", options.clone()).await;

        let path = written.rsplit("\r\n\r\n").next().unwrap();
        assert!(path.starts_with(options.temp_dir.to_str().unwrap()));
        assert!(!std::path::Path::new(path).exists());
    }

    #[tokio::test]
    async fn registration_is_released() {
        let registry = Arc::new(ConnectionRegistry::new());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let client = tokio::spawn(async move {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            stream.write_all(b"OPTIONS * HTTP/1.1\r\n\r\n").await.unwrap();
            let mut response = String::new();
            stream.read_to_string(&mut response).await.unwrap();
            response
        });

        let (stream, _) = listener.accept().await.unwrap();
        let connection = HttpConnection::accept(stream, &registry, options("registry")).unwrap();
        assert_eq!(registry.len(), 1);

        connection.process(&TestHandler).await.unwrap();
        assert!(registry.is_empty());

        let response = client.await.unwrap();
        assert!(response.starts_with("HTTP/1.1 405 Method Not Allowed\r\n"));
        assert!(response.ends_with(&format!("{} NOT IMPLEMENTED: ", Method::Options)));
    }
}
