//! Registry of open connections, used to force them closed on shutdown.
//!
//! The registry is an explicit object owned by the server and shared through an [`Arc`]; there
//! is no process-global state. Every mutation and the close-all sweep take the same lock.

use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::io;
use std::net::Shutdown;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::net::TcpStream;
use tracing::{debug, info, warn};

/// Something that can tear down a live connection from outside the task serving it.
pub trait Breaker: Send {
    fn disconnect(&self) -> io::Result<()>;
}

/// A [`Breaker`] holding a duplicate handle of an accepted socket.
#[derive(Debug)]
pub struct TcpStreamBreaker(std::net::TcpStream);

impl TcpStreamBreaker {
    /// Duplicates the socket behind `stream`, handing the stream back together with a breaker
    /// for it.
    pub fn split_off(stream: TcpStream) -> io::Result<(TcpStream, Self)> {
        let stream = stream.into_std()?;
        let breaker = stream.try_clone()?;
        Ok((TcpStream::from_std(stream)?, Self(breaker)))
    }
}

impl Breaker for TcpStreamBreaker {
    fn disconnect(&self) -> io::Result<()> {
        match self.0.shutdown(Shutdown::Both) {
            // already closed by the peer or by the connection task
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            result => result,
        }
    }
}

#[derive(Default)]
pub struct ConnectionRegistry {
    next_id: AtomicU64,
    connections: Mutex<HashMap<u64, Box<dyn Breaker>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection. It stays registered until the returned [`Registration`] is dropped.
    pub fn register(self: &Arc<Self>, breaker: impl Breaker + 'static) -> Registration {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().insert(id, Box::new(breaker));
        debug!(connection_id = id, "connection registered");
        Registration { id, registry: Arc::clone(self) }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Disconnects and forgets every registered connection, returning how many there were.
    pub fn close_all(&self) -> usize {
        let mut connections = self.lock();
        let count = connections.len();
        for (id, breaker) in connections.drain() {
            if let Err(e) = breaker.disconnect() {
                warn!(connection_id = id, cause = %e, "failed to close connection");
            }
        }
        info!(count, "closed open connections");
        count
    }

    fn unregister(&self, id: u64) {
        if self.lock().remove(&id).is_some() {
            debug!(connection_id = id, "connection unregistered");
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u64, Box<dyn Breaker>>> {
        // the map stays consistent even if a holder panicked
        self.connections.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry").field("connections", &self.len()).finish()
    }
}

/// Membership of one connection in a [`ConnectionRegistry`]; unregisters on drop.
#[derive(Debug)]
pub struct Registration {
    id: u64,
    registry: Arc<ConnectionRegistry>,
}

impl Registration {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.unregister(self.id);
    }
}
