//! Connection handling: one request and one response per accepted socket.
//!
//! # Components
//!
//! - [`HttpConnection`]: reads a request under a per-read timeout, dispatches it to a
//!   [`Handler`](crate::handler::Handler) and writes the response, then shuts the connection
//!   down and deletes the request's temporary files
//! - [`ResponseWriter`]: frames a [`Response`](crate::protocol::Response) onto a writer with a
//!   fixed `Content-Length` or chunked transfer coding
//! - [`ConnectionRegistry`]: the set of open connections, so a stopping server can force every
//!   one of them closed
//!
//! There is no keep-alive and no `Expect: 100-continue` handling.

mod http_connection;
mod registry;
mod response_writer;

pub use http_connection::{ConnectionOptions, DEFAULT_READ_TIMEOUT, HttpConnection};
pub use registry::{Breaker, ConnectionRegistry, Registration, TcpStreamBreaker};
pub use response_writer::{RESPONSE_CHUNK_SIZE, ResponseWriter};
