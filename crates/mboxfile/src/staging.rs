//! Key-addressable temporary storage for message bodies.
//!
//! The two Content-Length dialects cannot be written in one pass: the
//! declared length depends on the transformed body, which is only known
//! after transformation, yet the header must reach the destination
//! first. [`MboxWriter`](crate::MboxWriter) therefore buffers each body
//! through a [`Staging`] implementation keyed by the envelope address.
//!
//! In production, use [`FileStaging`] which stages bodies in temporary
//! files. In tests, or when bodies are known to be small, use
//! [`MemoryStaging`] to keep everything in memory and to observe the
//! resource lifecycle deterministically.

use std::collections::HashMap;
use std::env;
use std::fs::{self, File};
use std::io::{self, Cursor, Read, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

/// Abstraction over the temporary read/write resource used while a
/// message body is buffered and its byte length computed.
///
/// Keys are opaque strings (the writer uses the envelope address). One
/// staging unit is live for the duration of a single `write_mail` call
/// and is removed before that call returns, on every exit path.
pub trait Staging {
    /// The writable resource produced by [`Staging::open_writer`].
    type Writer: Write;
    /// The readable resource produced by [`Staging::open_reader`].
    type Reader: Read;

    /// Opens a writable resource for the given key.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource cannot be created.
    fn open_writer(&mut self, key: &str) -> io::Result<Self::Writer>;

    /// Opens a readable resource over bytes previously written for the
    /// given key.
    ///
    /// # Errors
    ///
    /// Returns a `NotFound` error if [`Staging::open_writer`] was not
    /// called for the key first.
    fn open_reader(&mut self, key: &str) -> io::Result<Self::Reader>;

    /// Removes any resource associated with the given key.
    ///
    /// # Errors
    ///
    /// Returns a `NotFound` error if [`Staging::open_writer`] was not
    /// called for the key first.
    fn remove(&mut self, key: &str) -> io::Result<()>;
}

/// File-system-backed staging using temporary files under a base
/// directory.
#[derive(Debug)]
pub struct FileStaging {
    /// The folder in which staging files are created.
    base: PathBuf,
    /// Paths of previously created staging files, by key.
    names: HashMap<String, PathBuf>,
}

impl FileStaging {
    /// Creates a staging area under the given base directory.
    #[must_use]
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            names: HashMap::new(),
        }
    }

    /// Derives a file-name prefix from a key, keeping it portable by
    /// replacing anything outside `[A-Za-z0-9]` with `_`.
    fn file_prefix(key: &str) -> String {
        let mut prefix: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        prefix.push('_');
        prefix
    }

    fn missing(key: &str) -> io::Error {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("no staging file for key {key:?}; open_writer was not called"),
        )
    }
}

impl Default for FileStaging {
    /// Stages into the system temporary directory.
    fn default() -> Self {
        Self::new(env::temp_dir())
    }
}

impl Staging for FileStaging {
    type Writer = File;
    type Reader = File;

    fn open_writer(&mut self, key: &str) -> io::Result<Self::Writer> {
        let (file, path) = tempfile::Builder::new()
            .prefix(&Self::file_prefix(key))
            .suffix(".txt")
            .tempfile_in(&self.base)?
            .keep()
            .map_err(|e| e.error)?;
        debug!("created staging file {} for key {key}", path.display());
        self.names.insert(key.to_string(), path);
        Ok(file)
    }

    fn open_reader(&mut self, key: &str) -> io::Result<Self::Reader> {
        let path = self.names.get(key).ok_or_else(|| Self::missing(key))?;
        File::open(path)
    }

    fn remove(&mut self, key: &str) -> io::Result<()> {
        let path = self.names.remove(key).ok_or_else(|| Self::missing(key))?;
        fs::remove_file(&path)?;
        debug!("removed staging file {} for key {key}", path.display());
        Ok(())
    }
}

/// In-memory staging over a shared map.
///
/// Handles are cheap to clone and share state, so a test can keep one
/// clone while handing another to the writer, then assert on the
/// recorded lifecycle afterwards.
#[derive(Debug, Clone, Default)]
pub struct MemoryStaging {
    inner: Arc<Mutex<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    entries: HashMap<String, Vec<u8>>,
    removals: HashMap<String, usize>,
}

impl MemoryStaging {
    /// Creates an empty in-memory staging area.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many times [`Staging::remove`] has been called for
    /// the key, successfully or not.
    #[must_use]
    pub fn removals(&self, key: &str) -> usize {
        self.lock().removals.get(key).copied().unwrap_or(0)
    }

    /// Returns true while staged bytes exist for the key.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.lock().entries.contains_key(key)
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn missing(key: &str) -> io::Error {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("no staging entry for key {key:?}; open_writer was not called"),
        )
    }
}

impl Staging for MemoryStaging {
    type Writer = MemoryWriter;
    type Reader = Cursor<Vec<u8>>;

    fn open_writer(&mut self, key: &str) -> io::Result<Self::Writer> {
        self.lock().entries.insert(key.to_string(), Vec::new());
        Ok(MemoryWriter {
            key: key.to_string(),
            inner: Arc::clone(&self.inner),
        })
    }

    fn open_reader(&mut self, key: &str) -> io::Result<Self::Reader> {
        let state = self.lock();
        let bytes = state.entries.get(key).ok_or_else(|| Self::missing(key))?;
        Ok(Cursor::new(bytes.clone()))
    }

    fn remove(&mut self, key: &str) -> io::Result<()> {
        let mut state = self.lock();
        *state.removals.entry(key.to_string()).or_insert(0) += 1;
        state
            .entries
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| Self::missing(key))
    }
}

/// Writable handle into a [`MemoryStaging`] entry.
#[derive(Debug)]
pub struct MemoryWriter {
    key: String,
    inner: Arc<Mutex<MemoryState>>,
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let bytes = state
            .entries
            .get_mut(&self.key)
            .ok_or_else(|| MemoryStaging::missing(&self.key))?;
        bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
