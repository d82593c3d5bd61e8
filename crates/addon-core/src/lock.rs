//! Re-entrancy guard for load passes
//!
//! One pass at a time: an atomic flag rejects a second pass in the same
//! process, and an exclusive advisory lock on `<state file>.lock` rejects one
//! from another process. Both are released when the guard drops.

use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use fs2::FileExt;

use crate::error::{Error, Result};

struct BusyFlag<'a>(&'a AtomicBool);

impl Drop for BusyFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Held for the duration of a load pass.
pub struct PassGuard<'a> {
    file: File,
    _flag: BusyFlag<'a>,
}

impl<'a> PassGuard<'a> {
    /// Claim `busy` and the lock file.
    ///
    /// # Errors
    ///
    /// Returns `Error::LoaderBusy` when either is already held.
    pub fn acquire(busy: &'a AtomicBool, lock_path: &Path) -> Result<Self> {
        if busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::LoaderBusy);
        }
        let flag = BusyFlag(busy);

        if let Some(parent) = lock_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(lock_path)?;
        if file.try_lock_exclusive().is_err() {
            tracing::debug!(path = %lock_path.display(), "Lock file held by another process");
            return Err(Error::LoaderBusy);
        }

        Ok(Self { file, _flag: flag })
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn second_guard_in_process_is_rejected() {
        let dir = tempdir().unwrap();
        let lock = dir.path().join("state.toml.lock");
        let busy = AtomicBool::new(false);

        let guard = PassGuard::acquire(&busy, &lock).unwrap();
        assert!(matches!(PassGuard::acquire(&busy, &lock), Err(Error::LoaderBusy)));

        drop(guard);
        assert!(!busy.load(Ordering::Acquire));
        assert!(PassGuard::acquire(&busy, &lock).is_ok());
    }

    #[test]
    fn held_lock_file_is_rejected() {
        let dir = tempdir().unwrap();
        let lock = dir.path().join("state.toml.lock");
        let other = File::create(&lock).unwrap();
        other.lock_exclusive().unwrap();

        let busy = AtomicBool::new(false);
        assert!(matches!(PassGuard::acquire(&busy, &lock), Err(Error::LoaderBusy)));
        // The flag is released again when the file lock fails.
        assert!(!busy.load(Ordering::Acquire));
    }
}
