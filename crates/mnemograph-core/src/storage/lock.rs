//! Lock file guarding a load→save window on the backing file.

use crate::GraphError;
use crate::primitives::LOCK_POLL_INTERVAL;
use chrono::Utc;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(0);

/// Exclusive lock over one backing file.
///
/// Holding a `StoreLock` means this guard created `<path>.lock` and wrote its
/// ownership token into it. On drop the file is removed only if it still
/// carries that token.
///
/// A lock file is never reclaimed by age: a holder that is merely slow keeps
/// its lock. A file left behind by a crashed process surfaces as
/// `GraphError::LockBusy` until it is removed by hand.
#[derive(Debug)]
pub struct StoreLock {
    lock_path: PathBuf,
    token: String,
}

impl StoreLock {
    /// Create the lock file, waiting up to `timeout` for a current holder.
    pub fn acquire(lock_path: &Path, timeout: Duration) -> Result<Self, GraphError> {
        if let Some(parent) = lock_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .map_err(|e| GraphError::Io(format!("{}: {e}", parent.display())))?;
        }

        let token = new_token();
        let deadline = Instant::now() + timeout;
        loop {
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(lock_path)
            {
                Ok(mut file) => {
                    if let Err(e) = writeln!(file, "{token}").and_then(|()| file.sync_all()) {
                        let _ = fs::remove_file(lock_path);
                        return Err(GraphError::Io(format!("{}: {e}", lock_path.display())));
                    }
                    return Ok(Self {
                        lock_path: lock_path.to_path_buf(),
                        token,
                    });
                }
                Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                    if Instant::now() >= deadline {
                        return Err(GraphError::LockBusy(format!(
                            "{} (remove it if no other process is using the store)",
                            lock_path.display()
                        )));
                    }
                    thread::sleep(LOCK_POLL_INTERVAL);
                }
                Err(err) => {
                    return Err(GraphError::Io(format!("{}: {err}", lock_path.display())));
                }
            }
        }
    }

    /// Path of the lock file this guard owns.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.lock_path
    }

    /// Ownership token written into the lock file.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    fn still_owned(&self) -> bool {
        fs::read_to_string(&self.lock_path)
            .is_ok_and(|text| text.lines().next() == Some(self.token.as_str()))
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if self.still_owned() {
            let _ = fs::remove_file(&self.lock_path);
        } else {
            tracing::warn!(
                lock = %self.lock_path.display(),
                "Store lock was replaced while held; leaving it in place"
            );
        }
    }
}

/// `pid-utc_nanos-counter`: distinct across processes and across guards
/// within one process.
fn new_token() -> String {
    format!(
        "{}-{}-{}",
        std::process::id(),
        Utc::now().timestamp_nanos_opt().unwrap_or_default(),
        NEXT_TOKEN.fetch_add(1, Ordering::Relaxed)
    )
}
