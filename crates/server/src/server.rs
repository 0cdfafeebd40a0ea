use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use spool_http::connection::{ConnectionOptions, ConnectionRegistry, HttpConnection};
use spool_http::handler::Handler;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_WORKERS: usize = 10;

/// Settings of a [`Server`], produced by [`ServerBuilder::build`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound on connections served at the same time.
    pub workers: usize,
    pub connection: ConnectionOptions,
}

#[derive(Debug)]
pub struct ServerBuilder {
    host: String,
    port: u16,
    workers: usize,
    connection: ConnectionOptions,
}

impl ServerBuilder {
    fn new() -> Self {
        Self { host: DEFAULT_HOST.to_owned(), port: DEFAULT_PORT, workers: DEFAULT_WORKERS, connection: ConnectionOptions::default() }
    }

    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Port to listen on; `0` lets the system pick one.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    #[must_use]
    pub fn read_timeout(mut self, read_timeout: Duration) -> Self {
        self.connection.read_timeout = read_timeout;
        self
    }

    #[must_use]
    pub fn temp_dir(mut self, temp_dir: impl Into<PathBuf>) -> Self {
        self.connection.temp_dir = temp_dir.into();
        self
    }

    #[must_use]
    pub fn decode_post_forms(mut self, decode_post_forms: bool) -> Self {
        self.connection.decode_post_forms = decode_post_forms;
        self
    }

    pub fn build(self) -> Result<Server, ServerBuildError> {
        if self.host.is_empty() {
            return Err(ServerBuildError::MissingHost);
        }
        if self.workers == 0 || self.workers > Semaphore::MAX_PERMITS {
            return Err(ServerBuildError::InvalidWorkers { workers: self.workers });
        }
        if self.connection.read_timeout.is_zero() {
            return Err(ServerBuildError::ZeroReadTimeout);
        }

        let config = ServerConfig { host: self.host, port: self.port, workers: self.workers, connection: self.connection };
        Ok(Server { config })
    }
}

#[derive(Error, Debug)]
pub enum ServerBuildError {
    #[error("host must be set")]
    MissingHost,
    #[error("worker count must be between 1 and {}, got {workers}", Semaphore::MAX_PERMITS)]
    InvalidWorkers { workers: usize },
    #[error("read timeout must not be zero")]
    ZeroReadTimeout,
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

/// A configured, not yet listening server.
#[derive(Debug)]
pub struct Server {
    config: ServerConfig,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Opens the listening socket.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] when the address cannot be resolved or bound.
    pub async fn bind(self) -> Result<BoundServer, ServerError> {
        let address = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&address).await.map_err(|source| {
            error!(%address, cause = %source, "bind server error");
            ServerError::Bind { address: address.clone(), source }
        })?;

        let local_addr = listener.local_addr()?;
        info!(%local_addr, workers = self.config.workers, "start listening");
        Ok(BoundServer { listener, config: self.config, registry: Arc::new(ConnectionRegistry::new()) })
    }

    /// Binds and serves until `shutdown` completes. See [`BoundServer::run`].
    pub async fn run<H>(self, handler: Arc<H>, shutdown: impl Future<Output = ()>) -> Result<(), ServerError>
    where
        H: Handler + 'static,
    {
        self.bind().await?.run(handler, shutdown).await
    }
}

/// A server with an open listening socket.
#[derive(Debug)]
pub struct BoundServer {
    listener: TcpListener,
    config: ServerConfig,
    registry: Arc<ConnectionRegistry>,
}

impl BoundServer {
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Accepts connections until `shutdown` completes.
    ///
    /// Every accepted connection is registered right away and then waits for one of the
    /// `workers` permits before its request is read. On shutdown the listener is closed, every
    /// registered connection is forced shut, and the call returns once all connection tasks
    /// have finished.
    pub async fn run<H>(self, handler: Arc<H>, shutdown: impl Future<Output = ()>) -> Result<(), ServerError>
    where
        H: Handler + 'static,
    {
        let Self { listener, config, registry } = self;
        let semaphore = Arc::new(Semaphore::new(config.workers));
        let tracker = TaskTracker::new();
        tokio::pin!(shutdown);

        loop {
            let (tcp_stream, remote_addr) = tokio::select! {
                () = &mut shutdown => break,
                accepted = listener.accept() => match accepted {
                    Ok(stream_and_addr) => stream_and_addr,
                    Err(e) => {
                        warn!(cause = %e, "failed to accept");
                        continue;
                    }
                },
            };

            let connection = match HttpConnection::accept(tcp_stream, &registry, config.connection.clone()) {
                Ok(connection) => connection,
                Err(e) => {
                    warn!(%remote_addr, cause = %e, "failed to set up connection");
                    continue;
                }
            };

            let handler = Arc::clone(&handler);
            let semaphore = Arc::clone(&semaphore);
            tracker.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };

                match connection.process(&*handler).await {
                    Ok(()) => debug!(%remote_addr, "finished process, connection shutdown"),
                    Err(e) => info!(%remote_addr, cause = %e, "request aborted, connection shutdown"),
                }
            });
        }

        info!("shutting down");
        drop(listener);
        registry.close_all();

        tracker.close();
        tracker.wait().await;
        info!("server stopped");
        Ok(())
    }
}
