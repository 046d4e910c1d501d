//! Inter-process exclusive lock on `.conductor/state.lock`.
//!
//! Held across a whole load-mutate-save cycle. The lock file itself stays on
//! disk; only the advisory lock is released.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;
use tracing::{debug, warn};

use crate::error::StateError;

const MAX_BACKOFF: Duration = Duration::from_millis(500);

/// Exclusive advisory lock, released on drop.
#[derive(Debug)]
pub struct StateLock {
    file: File,
    path: PathBuf,
}

impl StateLock {
    /// Try to take the lock, backing off exponentially from `retry` until
    /// `timeout` has elapsed.
    pub fn acquire(path: &Path, timeout: Duration, retry: Duration) -> Result<Self, StateError> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .map_err(|err| StateError::io(path, err))?;

        let started = Instant::now();
        let mut delay = retry.max(Duration::from_millis(1));
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    debug!(path = %path.display(), waited_ms = started.elapsed().as_millis() as u64, "lock acquired");
                    return Ok(Self {
                        file,
                        path: path.to_path_buf(),
                    });
                }
                Err(err) if err.kind() == fs2::lock_contended_error().kind() => {}
                Err(err) => return Err(StateError::io(path, err)),
            }

            let elapsed = started.elapsed();
            if elapsed >= timeout {
                warn!(path = %path.display(), "lock timeout");
                return Err(StateError::LockTimeout {
                    path: path.to_path_buf(),
                    waited_ms: elapsed.as_millis() as u64,
                });
            }
            thread::sleep(delay.min(timeout - elapsed));
            delay = (delay * 2).min(MAX_BACKOFF);
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if let Err(err) = FileExt::unlock(&self.file) {
            warn!(path = %self.path.display(), error = %err, "failed to release lock");
        }
    }
}
