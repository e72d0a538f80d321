//! Cross-process lock on a storage root.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{AtticError, Result};

/// Exclusive advisory lock on `<root>/attic.lock`, released on drop.
#[derive(Debug)]
pub struct StoreLock {
    lock_file: File,
    lock_path: PathBuf,
}

impl StoreLock {
    pub const LOCK_FILENAME: &'static str = "attic.lock";

    fn open(root: &Path) -> Result<(File, PathBuf)> {
        let lock_path = root.join(Self::LOCK_FILENAME);
        fs::create_dir_all(root)?;

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| AtticError::LockFailed(format!("open {}: {e}", lock_path.display())))?;
        Ok((lock_file, lock_path))
    }

    fn record_holder(lock_path: &Path) {
        let holder = LockHolder {
            pid: std::process::id(),
            acquired_at: Utc::now(),
            hostname: hostname::get()
                .ok()
                .and_then(|h| h.into_string().ok())
                .unwrap_or_else(|| "unknown".to_string()),
        };
        match serde_json::to_string(&holder) {
            Ok(json) => {
                if let Err(err) = fs::write(lock_path, json) {
                    debug!("could not record lock holder: {err}");
                }
            }
            Err(err) => debug!("could not encode lock holder: {err}"),
        }
    }

    /// Acquire the lock, blocking until it is free.
    pub fn acquire(root: &Path) -> Result<Self> {
        let (lock_file, lock_path) = Self::open(root)?;
        lock_file
            .lock_exclusive()
            .map_err(|e| AtticError::LockFailed(format!("acquire exclusive lock: {e}")))?;

        Self::record_holder(&lock_path);
        debug!("Acquired store lock at {:?}", lock_path);
        Ok(Self {
            lock_file,
            lock_path,
        })
    }

    /// Try to acquire the lock without blocking.
    pub fn try_acquire(root: &Path) -> Result<Option<Self>> {
        let (lock_file, lock_path) = Self::open(root)?;

        match lock_file.try_lock_exclusive() {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                debug!("Store lock held by another holder");
                return Ok(None);
            }
            Err(e) => return Err(AtticError::LockFailed(format!("try acquire lock: {e}"))),
        }

        Self::record_holder(&lock_path);
        debug!("Acquired store lock (non-blocking) at {:?}", lock_path);
        Ok(Some(Self {
            lock_file,
            lock_path,
        }))
    }

    /// Acquire with a deadline, polling every 50ms.
    pub fn acquire_timeout(root: &Path, timeout: Duration) -> Result<Self> {
        let start = Instant::now();
        let poll_interval = Duration::from_millis(50);

        loop {
            if let Some(lock) = Self::try_acquire(root)? {
                return Ok(lock);
            }
            if start.elapsed() >= timeout {
                break;
            }
            std::thread::sleep(poll_interval);
        }

        warn!("Timeout waiting for store lock after {:?}", start.elapsed());
        let holder = Self::status(root)
            .ok()
            .flatten()
            .map_or_else(String::new, |h| format!(" (held by pid {} on {})", h.pid, h.hostname));
        Err(AtticError::LockTimeout(format!(
            "{} after {}ms{holder}",
            root.join(Self::LOCK_FILENAME).display(),
            timeout.as_millis()
        )))
    }

    /// Who last took the lock, if that process still exists.
    pub fn status(root: &Path) -> Result<Option<LockHolder>> {
        let lock_path = root.join(Self::LOCK_FILENAME);
        if !lock_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&lock_path)?;
        if content.is_empty() {
            return Ok(None);
        }

        let holder: LockHolder = serde_json::from_str(&content)
            .map_err(|e| AtticError::LockFailed(format!("parse lock holder: {e}")))?;

        #[cfg(target_os = "linux")]
        {
            if !Path::new(&format!("/proc/{}", holder.pid)).exists() {
                return Ok(None);
            }
        }

        Ok(Some(holder))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = self.lock_file.unlock() {
            debug!("Failed to release store lock: {}", e);
        }
        debug!("Released store lock");
    }
}

/// Information about the current lock holder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockHolder {
    pub pid: u32,
    pub acquired_at: DateTime<Utc>,
    pub hostname: String,
}
