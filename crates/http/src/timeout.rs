//! Per-read timeout for the connection input stream.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use pin_project_lite::pin_project;
use tokio::io::{AsyncRead, ReadBuf};
use tokio::time::{Instant, Sleep, sleep};

pin_project! {
    /// An [`AsyncRead`] that fails with [`io::ErrorKind::TimedOut`] when a single read waits
    /// longer than `timeout` for data.
    ///
    /// The clock starts when a read first has to wait and is cleared once it completes, so time
    /// spent by the consumer between reads does not count.
    ///
    /// Must be created inside a tokio runtime.
    #[derive(Debug)]
    pub struct TimeoutReader<R> {
        #[pin]
        inner: R,
        #[pin]
        sleep: Sleep,
        timeout: Duration,
        waiting: bool,
    }
}

impl<R: AsyncRead> TimeoutReader<R> {
    pub fn new(inner: R, timeout: Duration) -> Self {
        Self { inner, sleep: sleep(timeout), timeout, waiting: false }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: AsyncRead> AsyncRead for TimeoutReader<R> {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        let mut this = self.project();

        if let Poll::Ready(result) = this.inner.poll_read(cx, buf) {
            *this.waiting = false;
            return Poll::Ready(result);
        }

        if !*this.waiting {
            *this.waiting = true;
            this.sleep.as_mut().reset(Instant::now() + *this.timeout);
        }

        match this.sleep.poll(cx) {
            Poll::Ready(()) => {
                *this.waiting = false;
                Poll::Ready(Err(io::Error::new(io::ErrorKind::TimedOut, "read timed out")))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
