//! An asynchronous HTTP/1.1 request/response engine that spools request bodies to disk
//!
//! This crate reads exactly one request per connection, hands it to a [`handler::Handler`] and
//! writes a single response, framed either with a fixed `Content-Length` or with chunked
//! transfer coding. Request bodies are staged in temporary files that live exactly as long as
//! the request being served.
//!
//! # Features
//!
//! - Request line and header parsing with an 8 KiB header limit
//! - Percent decoding of paths, query strings and urlencoded forms
//! - `multipart/form-data` decoding, with file parts saved as temporary files
//! - Fixed-length and chunked responses, `HEAD` aware
//! - A per-read timeout while a request is being received
//! - A registry of open connections for forced shutdown
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use http::StatusCode;
//! use tokio::net::TcpListener;
//! use tracing::{error, info, warn, Level};
//! use tracing_subscriber::FmtSubscriber;
//! use spool_http::connection::{ConnectionOptions, ConnectionRegistry, HttpConnection};
//! use spool_http::handler::{Handler, HandlerError};
//! use spool_http::protocol::{Request, Response};
//!
//! struct Hello;
//!
//! #[async_trait]
//! impl Handler for Hello {
//!     async fn get(&self, request: &Request) -> Result<Response, HandlerError> {
//!         info!(uri = request.uri(), "saying hello");
//!         Ok(Response::text(StatusCode::OK, "Hello World!\r\n"))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
//!     tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
//!
//!     let tcp_listener = match TcpListener::bind("127.0.0.1:8080").await {
//!         Ok(tcp_listener) => tcp_listener,
//!         Err(e) => {
//!             error!(cause = %e, "bind server error");
//!             return;
//!         }
//!     };
//!
//!     let registry = Arc::new(ConnectionRegistry::new());
//!     let handler = Arc::new(Hello);
//!
//!     loop {
//!         let (tcp_stream, _remote_addr) = match tcp_listener.accept().await {
//!             Ok(stream_and_addr) => stream_and_addr,
//!             Err(e) => {
//!                 warn!(cause = %e, "failed to accept");
//!                 continue;
//!             }
//!         };
//!
//!         let connection = match HttpConnection::accept(tcp_stream, &registry, ConnectionOptions::default()) {
//!             Ok(connection) => connection,
//!             Err(e) => {
//!                 warn!(cause = %e, "failed to set up connection");
//!                 continue;
//!             }
//!         };
//!
//!         let handler = handler.clone();
//!         tokio::spawn(async move {
//!             if let Err(e) = connection.process(&*handler).await {
//!                 error!(cause = %e, "request failed");
//!             }
//!         });
//!     }
//! }
//! ```
//!
//! # Architecture
//!
//! - [`codec`]: header scanning, request decoding, multipart parsing and response encoding
//! - [`connection`]: the per-connection exchange, the response writer and the registry
//! - [`handler`]: the [`handler::Handler`] trait
//! - [`protocol`]: requests, responses, methods and errors
//! - [`temp`]: temporary files scoped to one request
//! - [`timeout`]: the per-read timeout wrapper
//!
//! ## Error Handling
//!
//! - [`protocol::HttpError`]: Top-level error type
//! - [`protocol::ParseError`]: Request errors; all but I/O failures map to an HTTP status
//! - [`protocol::SendError`]: Response sending errors
//!
//! # Limitations
//!
//! - HTTP/1.1 only, one request per connection
//! - No TLS support (use a reverse proxy for HTTPS)
//! - Request bodies are buffered through disk, not streamed to the handler
//! - Maximum header size: 8KB

pub mod codec;
pub mod connection;
pub mod handler;
pub mod protocol;
pub mod temp;
pub mod timeout;

mod utils;
pub(crate) use utils::ensure;
