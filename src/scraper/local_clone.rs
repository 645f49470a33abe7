//! Exclusive ownership of a repository's clone directory
//!
//! The directory is guarded two ways: an flock() on a per-directory lock file
//! keeps other processes out, and the guard's `Drop` removes the directory on
//! every exit path of a scrape.

use crate::cache::ensure_single_component;
use crate::error::{GitError, ScrapeError};
use fs2::FileExt;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

const LOCK_DIR: &str = ".locks";

/// Lock file for a clone directory, named by a hash of its path
fn lock_file_path(checkout_root: &Path, clone_path: &Path) -> PathBuf {
    let mut hasher = Sha256::new();
    hasher.update(clone_path.to_string_lossy().as_bytes());
    let hash = format!("{:x}", hasher.finalize());
    checkout_root
        .join(LOCK_DIR)
        .join(format!("{}.lock", &hash[..16]))
}

/// Guard over `<checkout_root>/<name>` for the duration of one scrape
///
/// Released (directory removed, lock dropped) when the guard goes out of scope.
#[derive(Debug)]
pub struct LocalClone {
    path: PathBuf,
    _lock: File,
}

impl LocalClone {
    /// Lock the clone directory for `name` and clear out any stale copy
    pub fn acquire(checkout_root: &Path, name: &str) -> Result<Self, ScrapeError> {
        ensure_single_component(name)?;
        if name == LOCK_DIR {
            return Err(ScrapeError::other(format!(
                "Repository name '{}' is reserved",
                name
            )));
        }

        let path = checkout_root.join(name);
        let lock_path = lock_file_path(checkout_root, &path);

        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(&lock_path)?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                tracing::debug!(
                    "Acquired checkout lock for {} (lock_file={:?})",
                    path.display(),
                    lock_path
                );
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                return Err(GitError::CheckoutLocked(path.display().to_string()).into());
            }
            Err(e) => return Err(e.into()),
        }

        if path.exists() {
            tracing::debug!("Removing stale checkout at {}", path.display());
            fs::remove_dir_all(&path)?;
        }

        Ok(Self { path, _lock: file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LocalClone {
    fn drop(&mut self) {
        if self.path.exists()
            && let Err(e) = fs::remove_dir_all(&self.path)
        {
            tracing::warn!(
                "Failed to remove checkout at {}: {}",
                self.path.display(),
                e
            );
        }
        // The flock is released when the file handle closes; the lock file
        // itself is left for reuse.
    }
}
