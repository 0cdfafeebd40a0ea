//! Process boundary for the `spool-http` engine.
//!
//! [`Server`] binds a listener and hands each accepted connection to a spawned task, with at
//! most `workers` of them serving a request at once. Connections beyond that bound wait for a
//! free permit. Stopping the server force-closes every open connection through the
//! [`ConnectionRegistry`](spool_http::connection::ConnectionRegistry).
//!
//! ```no_run
//! use std::sync::Arc;
//! use spool_server::{EchoHandler, Server};
//!
//! # async fn serve() -> Result<(), Box<dyn std::error::Error>> {
//! let server = Server::builder().port(8080).workers(10).build()?;
//! server.run(Arc::new(EchoHandler), async { let _ = tokio::signal::ctrl_c().await; }).await?;
//! # Ok(())
//! # }
//! ```

mod echo;
mod server;

pub use echo::EchoHandler;
pub use server::{BoundServer, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_WORKERS, Server, ServerBuildError, ServerBuilder, ServerConfig, ServerError};
