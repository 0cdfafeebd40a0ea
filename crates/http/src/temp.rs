//! Scoped on-disk scratch space for request bodies.
//!
//! Every connection gets its own [`TempFileManager`]. Files created through it are removed when
//! [`TempFileManager::clear`] runs or the manager is dropped, whichever happens first. Removal is
//! best effort: a file that cannot be deleted is logged and skipped.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{trace, warn};

/// Filename prefix of every temporary file this crate creates.
pub const TEMP_FILE_PREFIX: &str = "spool-http-";

const MAX_CREATE_ATTEMPTS: usize = 32;

static TEMP_FILE_COUNTER: AtomicU64 = AtomicU64::new(1);

/// A temporary file with at most one open write handle.
#[derive(Debug)]
pub struct TempFile {
    path: PathBuf,
    file: Option<File>,
}

impl TempFile {
    async fn create(dir: &Path) -> io::Result<Self> {
        let ts_nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos();

        for _ in 0..MAX_CREATE_ATTEMPTS {
            let counter = TEMP_FILE_COUNTER.fetch_add(1, Ordering::Relaxed);
            let path = dir.join(format!("{TEMP_FILE_PREFIX}{}-{ts_nanos}-{counter}", std::process::id()));

            match OpenOptions::new().create_new(true).write(true).open(&path).await {
                Ok(file) => return Ok(Self { path, file: Some(file) }),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(e),
            }
        }

        Err(io::Error::new(io::ErrorKind::AlreadyExists, "failed to allocate a unique temp file"))
    }

    /// Absolute path of the file on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `bytes` through the write handle.
    ///
    /// # Errors
    ///
    /// Fails with `BrokenPipe` once the handle has been closed, or with the underlying write error.
    pub async fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        match &mut self.file {
            Some(file) => file.write_all(bytes).await,
            None => Err(io::Error::new(io::ErrorKind::BrokenPipe, "temp file already closed")),
        }
    }

    /// Flushes and releases the write handle. Closing twice is a no-op.
    pub async fn close(&mut self) -> io::Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
        }
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    fn delete(&mut self) -> io::Result<()> {
        self.file.take();
        std::fs::remove_file(&self.path)
    }
}

#[derive(Debug)]
pub struct TempFileManager {
    dir: PathBuf,
    files: Vec<TempFile>,
}

impl TempFileManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), files: Vec::new() }
    }

    /// A manager rooted at the platform temp directory.
    pub fn in_system_temp() -> Self {
        Self::new(std::env::temp_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Creates a new empty file, tracked for deletion.
    pub async fn create_temp_file(&mut self) -> io::Result<&mut TempFile> {
        let temp_file = TempFile::create(&self.dir).await?;
        trace!(path = %temp_file.path.display(), "created temp file");
        self.files.push(temp_file);
        let index = self.files.len() - 1;
        Ok(&mut self.files[index])
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(TempFile::path)
    }

    /// Deletes every tracked file.
    pub fn clear(&mut self) {
        for mut temp_file in self.files.drain(..) {
            match temp_file.delete() {
                Ok(()) => trace!(path = %temp_file.path.display(), "deleted temp file"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %temp_file.path.display(), cause = %e, "failed to delete temp file"),
            }
        }
    }
}

impl Drop for TempFileManager {
    fn drop(&mut self) {
        self.clear();
    }
}
