//! Filesystem helpers shared by the resolver.

use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use crate::error::{CollectError, CollectResult};

/// A clock the deletion-wait loop can be driven by.
///
/// Production code uses [`SystemClock`]; tests inject a fake so slow
/// filesystems can be simulated without real sleeping.
pub trait Clock {
    /// Current instant.
    fn now(&self) -> Instant;

    /// Block for `duration`.
    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by std.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Outcome of waiting for a recursive deletion to become observable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalWait {
    /// The path is no longer visible on the filesystem.
    Observed,

    /// The path was still visible when the timeout elapsed.
    TimedOut,
}

/// Recursively delete `path`, then poll until the deletion is observable.
///
/// Some filesystems report deletion asynchronously; the poll bounds how long
/// the caller waits before proceeding. A missing `path` counts as already
/// observed.
///
/// # Errors
///
/// `RemoveFailed` when the deletion itself fails for a reason other than the
/// path being absent. A timed-out wait is not an error; the caller decides
/// how to react to [`RemovalWait::TimedOut`].
pub fn remove_dir_all_observed(
    path: &Path,
    clock: &dyn Clock,
    timeout: Duration,
    poll_interval: Duration,
) -> CollectResult<RemovalWait> {
    match fs::remove_dir_all(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(RemovalWait::Observed),
        Err(e) => {
            return Err(CollectError::RemoveFailed {
                path: path.to_path_buf(),
                source: e,
            })
        }
    }

    Ok(wait_for_removal(path, clock, timeout, poll_interval))
}

/// Poll until `path` is no longer visible or `timeout` elapses.
fn wait_for_removal(
    path: &Path,
    clock: &dyn Clock,
    timeout: Duration,
    poll_interval: Duration,
) -> RemovalWait {
    let deadline = clock.now() + timeout;

    loop {
        if !path.exists() {
            return RemovalWait::Observed;
        }
        if clock.now() >= deadline {
            return RemovalWait::TimedOut;
        }
        clock.sleep(poll_interval);
    }
}

/// Recursively copy a directory tree.
pub fn copy_dir_recursive(source: &Path, dest: &Path) -> CollectResult<()> {
    fs::create_dir_all(dest).map_err(|e| CollectError::CreateDirFailed {
        path: dest.to_path_buf(),
        source: e,
    })?;

    for entry in fs::read_dir(source).map_err(|e| CollectError::ReadFailed {
        path: source.to_path_buf(),
        source: e,
    })? {
        let entry = entry.map_err(|e| CollectError::ReadFailed {
            path: source.to_path_buf(),
            source: e,
        })?;

        let source_path = entry.path();
        let dest_path = dest.join(entry.file_name());

        if source_path.is_dir() {
            copy_dir_recursive(&source_path, &dest_path)?;
        } else {
            fs::copy(&source_path, &dest_path).map_err(|e| CollectError::WriteFailed {
                path: dest_path,
                source: e,
            })?;
        }
    }

    Ok(())
}
