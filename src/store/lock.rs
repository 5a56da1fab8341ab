//! Filesystem-based locking for cross-process coordination
//!
//! A run holds an exclusive `flock()` on a file derived from the store
//! location for as long as it reads, merges and writes that store, so two
//! concurrent runs can never interleave their read-modify-write cycles.

use crate::error::StoreError;
use fs2::FileExt;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Lock file for a store location inside `lock_dir`
pub fn lock_file_path(lock_dir: &Path, location: &str) -> PathBuf {
    let mut hasher = Sha256::new();
    hasher.update(location.as_bytes());
    let hash = format!("{:x}", hasher.finalize());
    lock_dir.join(format!("{}.lock", &hash[..16]))
}

fn lock_error(location: &str, reason: impl std::fmt::Display) -> StoreError {
    StoreError::LockFailed {
        location: location.to_string(),
        reason: reason.to_string(),
    }
}

/// Guard that holds an exclusive store lock
///
/// The lock is released when the guard is dropped, or by the OS if the
/// process dies.
#[derive(Debug)]
pub struct StoreLock {
    _file: File,
    path: PathBuf,
}

impl StoreLock {
    /// Try to lock a store location without waiting
    ///
    /// Returns `Ok(None)` while another holder has it.
    pub fn try_acquire(lock_dir: &Path, location: &str) -> Result<Option<Self>, StoreError> {
        let lock_path = lock_file_path(lock_dir, location);

        fs::create_dir_all(lock_dir).map_err(|e| lock_error(location, e))?;
        let file = File::create(&lock_path).map_err(|e| lock_error(location, e))?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                tracing::debug!("Acquired store lock for {} ({:?})", location, lock_path);
                Ok(Some(Self {
                    _file: file,
                    path: lock_path,
                }))
            }
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                tracing::debug!("Store lock for {} is held elsewhere", location);
                Ok(None)
            }
            Err(e) => Err(lock_error(location, e)),
        }
    }

    /// Lock a store location, polling until `timeout` expires
    pub fn acquire(lock_dir: &Path, location: &str, timeout: Duration) -> Result<Self, StoreError> {
        let start = Instant::now();
        let mut announced = false;

        loop {
            if let Some(guard) = Self::try_acquire(lock_dir, location)? {
                if announced {
                    tracing::info!("Acquired store lock after {:?}", start.elapsed());
                }
                return Ok(guard);
            }

            if start.elapsed() >= timeout {
                tracing::warn!(
                    "Timeout waiting for store lock on {} after {:?}",
                    location,
                    timeout
                );
                return Err(StoreError::LockTimeout {
                    location: location.to_string(),
                    seconds: timeout.as_secs(),
                });
            }

            if !announced {
                tracing::info!(
                    "Store {} is in use by another run, waiting up to {:?}",
                    location,
                    timeout
                );
                announced = true;
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        // Closing the file releases the flock; the file itself is reused
        tracing::debug!("Releasing store lock {:?}", self.path);
    }
}
