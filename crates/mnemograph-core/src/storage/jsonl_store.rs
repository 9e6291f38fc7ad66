//! Line-delimited JSON backing file.

use super::lock::StoreLock;
use crate::formats::{graph_from_text, graph_to_text};
use crate::graph::{Graph, GraphStore};
use crate::primitives::{
    DEFAULT_IO_RETRIES, DEFAULT_LOCK_TIMEOUT, IO_RETRY_BACKOFF, LOCK_SUFFIX,
};
use crate::{GraphError, Timestamp};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

// =============================================================================
// OPTIONS
// =============================================================================

/// Tuning for file access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// How long a mutation waits for another holder of the lock file.
    pub lock_timeout: Duration,
    /// Extra attempts on `Interrupted`, `WouldBlock` or `TimedOut`.
    pub io_retries: u32,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            io_retries: DEFAULT_IO_RETRIES,
        }
    }
}

// =============================================================================
// JSONL STORE
// =============================================================================

/// A `GraphStore` over one line-delimited JSON file.
///
/// - A missing file loads as an empty graph.
/// - `save` writes a sibling temp file, fsyncs it, and renames it over the
///   target, so readers see either the old or the new graph, never a torn one.
#[derive(Debug, Clone)]
pub struct JsonlStore {
    path: PathBuf,
    options: StoreOptions,
}

impl JsonlStore {
    /// A store over `path` with default options.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_options(path, StoreOptions::default())
    }

    /// A store over `path` with explicit options.
    #[must_use]
    pub fn with_options(path: impl Into<PathBuf>, options: StoreOptions) -> Self {
        Self {
            path: path.into(),
            options,
        }
    }

    /// The backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The options in effect.
    #[must_use]
    pub fn options(&self) -> StoreOptions {
        self.options
    }

    /// `<path>.lock`
    #[must_use]
    pub fn lock_path(&self) -> PathBuf {
        let mut path: OsString = self.path.as_os_str().to_os_string();
        path.push(LOCK_SUFFIX);
        PathBuf::from(path)
    }

    /// Read the file as text; `None` when it does not exist.
    fn read_text(&self) -> Result<Option<String>, GraphError> {
        let bytes = match retry_transient(self.options.io_retries, || fs::read(&self.path)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(GraphError::Io(format!("{}: {e}", self.path.display()))),
        };
        String::from_utf8(bytes).map(Some).map_err(|_| {
            GraphError::Io(format!(
                "{}: contains non-UTF-8 byte sequence(s)",
                self.path.display()
            ))
        })
    }

    /// Replace the file contents atomically.
    fn write_text(&self, text: &str) -> Result<(), GraphError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .map_err(|e| GraphError::Io(format!("{}: {e}", parent.display())))?;
        }

        retry_transient(self.options.io_retries, || self.write_once(text))
            .map_err(|e| GraphError::Io(format!("{}: {e}", self.path.display())))?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            sync_dir(parent).map_err(|e| GraphError::Io(format!("{}: {e}", parent.display())))?;
        }

        Ok(())
    }

    fn write_once(&self, text: &str) -> io::Result<()> {
        let tmp_path = tmp_write_path(&self.path);
        let written = (|| -> io::Result<()> {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            writer.write_all(text.as_bytes())?;
            writer.flush()?;
            let file = writer.into_inner().map_err(|e| e.into_error())?;
            file.sync_all()
        })();

        if let Err(error) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(error);
        }

        fs::rename(&tmp_path, &self.path).inspect_err(|_| {
            let _ = fs::remove_file(&tmp_path);
        })
    }
}

impl GraphStore for JsonlStore {
    type Guard = StoreLock;

    fn load(&self, now: Timestamp) -> Result<Graph, GraphError> {
        let graph = match self.read_text()? {
            Some(text) => graph_from_text(&text, now)?,
            None => Graph::new(),
        };
        tracing::debug!(
            path = %self.path.display(),
            entities = graph.entities.len(),
            relations = graph.relations.len(),
            "Loaded graph"
        );
        Ok(graph)
    }

    fn save(&self, graph: &Graph) -> Result<(), GraphError> {
        let text = graph_to_text(graph)?;
        self.write_text(&text)?;
        tracing::debug!(
            path = %self.path.display(),
            entities = graph.entities.len(),
            relations = graph.relations.len(),
            bytes = text.len(),
            "Saved graph"
        );
        Ok(())
    }

    fn acquire(&self) -> Result<Self::Guard, GraphError> {
        StoreLock::acquire(&self.lock_path(), self.options.lock_timeout)
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn is_transient(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

/// Run `op`, retrying up to `retries` extra times on transient errors.
fn retry_transient<T>(retries: u32, mut op: impl FnMut() -> io::Result<T>) -> io::Result<T> {
    let mut attempt = 0;
    loop {
        match op() {
            Err(e) if is_transient(&e) && attempt < retries => {
                attempt += 1;
                tracing::debug!(attempt, error = %e, "Retrying transient I/O error");
                thread::sleep(IO_RETRY_BACKOFF);
            }
            result => return result,
        }
    }
}

/// Persist the rename by syncing the containing directory.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

fn tmp_write_path(path: &Path) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let mut tmp: OsString = path.as_os_str().to_os_string();
    tmp.push(format!(".tmp.{}.{}", std::process::id(), unique));
    PathBuf::from(tmp)
}

// =============================================================================
// TESTS
// =============================================================================
