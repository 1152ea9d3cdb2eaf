//! Filesystem cleanup with bounded retries.
//!
//! Scratch directories full of page rasters can be briefly locked by an
//! OCR process that has not fully exited. Removal retries a bounded
//! number of times with a delay, and reports a named error once the
//! attempts are exhausted instead of silently leaving files behind.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

/// Removal failed after exhausting all retry attempts.
#[derive(Debug, Error)]
#[error("failed to remove {path} after {attempts} attempts: {source}")]
pub struct RemoveError {
    /// Path that could not be removed.
    pub path: PathBuf,
    /// Number of attempts made.
    pub attempts: usize,
    /// Error from the final attempt.
    #[source]
    pub source: std::io::Error,
}

/// Remove a file, retrying if it is temporarily locked.
///
/// A missing file counts as success (the goal is "gone").
pub fn remove_file_with_retry(
    path: &Path,
    attempts: usize,
    delay: Duration,
) -> Result<(), RemoveError> {
    remove_with_retry(path, attempts, delay, |p| std::fs::remove_file(p))
}

/// Remove a directory tree, retrying if any entry is temporarily locked.
pub fn remove_dir_with_retry(
    path: &Path,
    attempts: usize,
    delay: Duration,
) -> Result<(), RemoveError> {
    remove_with_retry(path, attempts, delay, |p| std::fs::remove_dir_all(p))
}

fn remove_with_retry<F>(
    path: &Path,
    attempts: usize,
    delay: Duration,
    remove: F,
) -> Result<(), RemoveError>
where
    F: Fn(&Path) -> std::io::Result<()>,
{
    let attempts = attempts.max(1);
    let mut last_err = None;

    for attempt in 1..=attempts {
        match remove(path) {
            Ok(()) => return Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                tracing::debug!(
                    "Removal of {} failed (attempt {}/{}): {}",
                    path.display(),
                    attempt,
                    attempts,
                    e
                );
                last_err = Some(e);
                if attempt < attempts {
                    std::thread::sleep(delay);
                }
            }
        }
    }

    Err(RemoveError {
        path: path.to_path_buf(),
        attempts,
        source: last_err
            .unwrap_or_else(|| std::io::Error::other("removal failed with no recorded error")),
    })
}
