//! Removal of working copies after a run.
//!
//! Cleanup never fails a run. Every error is logged and folded into a
//! [`CleanupReport`]. Removal is retried with exponential backoff and repairs
//! permission bits on entries that refuse deletion, which covers read-only pack
//! files left by git.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::CleanupError;
use crate::types::WorkingCopy;

/// Retry policy for removing a directory tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// Delay after the given failed attempt (1-indexed).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = self
            .multiplier
            .max(1)
            .saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// What one cleanup did.
#[derive(Debug, Default)]
pub struct CleanupReport {
    /// Where the output subdirectory was moved, if it was.
    pub relocated_output: Option<PathBuf>,
    pub removed: bool,
    /// Stale output copies pruned from the local path.
    pub pruned: Vec<PathBuf>,
    pub errors: Vec<CleanupError>,
}

/// Deletes working copies, optionally preserving the output subdirectory.
#[derive(Debug, Clone)]
pub struct WorkspaceCleaner {
    settle_delay: Duration,
    policy: RetryPolicy,
    preserve_output: Option<String>,
}

impl Default for WorkspaceCleaner {
    fn default() -> Self {
        Self::new(Duration::from_millis(1000), RetryPolicy::default())
    }
}

impl WorkspaceCleaner {
    pub fn new(settle_delay: Duration, policy: RetryPolicy) -> Self {
        Self {
            settle_delay,
            policy,
            preserve_output: None,
        }
    }

    /// Move `<root>/<name>` out of the working copy before deleting it.
    pub fn preserving(mut self, output_dir_name: impl Into<String>) -> Self {
        self.preserve_output = Some(output_dir_name.into());
        self
    }

    /// Remove the working copy. Safe to call on a root that no longer exists.
    pub async fn clean(&self, mut working_copy: WorkingCopy) -> CleanupReport {
        if !working_copy.root().exists() {
            debug!(path = %working_copy.root().display(), "Nothing to clean");
            return CleanupReport::default();
        }

        if working_copy.release_repository() {
            debug!("Released git handle");
        }
        tokio::time::sleep(self.settle_delay).await;

        let root = working_copy.root().to_path_buf();
        let local_path = working_copy.local_path().to_path_buf();
        drop(working_copy);

        let cleaner = self.clone();
        let task_root = root.clone();
        let report = tokio::task::spawn_blocking(move || cleaner.remove_working_copy(&task_root, &local_path))
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "Cleanup task failed");
                CleanupReport::default()
            });

        for error in &report.errors {
            warn!(error = %error, "Cleanup problem");
        }
        if report.removed {
            info!(path = %root.display(), "Working copy removed");
        }
        report
    }

    fn remove_working_copy(&self, root: &Path, local_path: &Path) -> CleanupReport {
        let mut report = CleanupReport::default();

        if let Some(name) = &self.preserve_output {
            let output = root.join(name);
            if output.is_dir() {
                let destination = relocation_target(local_path, name);
                match fs::rename(&output, &destination) {
                    Ok(()) => {
                        info!(to = %destination.display(), "Relocated output");
                        report.relocated_output = Some(destination);
                    }
                    Err(source) => report.errors.push(CleanupError::Io {
                        path: output,
                        source,
                    }),
                }
            }
        }

        match force_remove_dir(root, &self.policy) {
            Ok(()) => report.removed = true,
            Err(e) => report.errors.push(e),
        }

        if let (Some(name), Some(kept)) = (&self.preserve_output, report.relocated_output.clone()) {
            prune_stale_outputs(local_path, name, &kept, &self.policy, &mut report);
        }

        report
    }
}

fn relocation_target(local_path: &Path, name: &str) -> PathBuf {
    let stamp = Utc::now().format("%Y%m%d%H%M%S%3f");
    let mut target = local_path.join(format!("{}-{}", name, stamp));
    let mut suffix = 1;
    while target.exists() {
        target = local_path.join(format!("{}-{}-{}", name, stamp, suffix));
        suffix += 1;
    }
    target
}

/// Remove earlier relocated copies of the output directory.
fn prune_stale_outputs(
    local_path: &Path,
    name: &str,
    kept: &Path,
    policy: &RetryPolicy,
    report: &mut CleanupReport,
) {
    let entries = match fs::read_dir(local_path) {
        Ok(entries) => entries,
        Err(source) => {
            report.errors.push(CleanupError::Io {
                path: local_path.to_path_buf(),
                source,
            });
            return;
        }
    };

    let prefix = format!("{}-", name);
    for entry in entries.flatten() {
        let path = entry.path();
        let stale = path != kept
            && path.is_dir()
            && entry.file_name().to_string_lossy().starts_with(&prefix);
        if !stale {
            continue;
        }
        match force_remove_dir(&path, policy) {
            Ok(()) => report.pruned.push(path),
            Err(e) => report.errors.push(e),
        }
    }
}

/// Remove a directory tree, repairing permissions and retrying with backoff.
///
/// A path that does not exist counts as removed.
pub fn force_remove_dir(path: &Path, policy: &RetryPolicy) -> Result<(), CleanupError> {
    let attempts = policy.max_attempts.max(1);
    for attempt in 1..=attempts {
        match remove_tree(path) {
            Ok(()) => return Ok(()),
            Err(e) if attempt < attempts => {
                let delay = policy.backoff(attempt);
                debug!(
                    path = %path.display(),
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Removal failed, retrying"
                );
                thread::sleep(delay);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Removal failed");
            }
        }
    }
    Err(CleanupError::Exhausted {
        path: path.to_path_buf(),
        attempts,
    })
}

fn remove_tree(path: &Path) -> Result<(), CleanupError> {
    if fs::symlink_metadata(path).is_err() {
        return Ok(());
    }

    for entry in WalkDir::new(path).contents_first(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.io_error().map(io::Error::kind) == Some(io::ErrorKind::NotFound) => continue,
            Err(e) => {
                let path = e.path().unwrap_or(path).to_path_buf();
                return Err(CleanupError::Io {
                    path,
                    source: e.into_io_error().unwrap_or_else(|| io::Error::other("walk loop")),
                });
            }
        };
        remove_entry(entry.path(), entry.file_type().is_dir())?;
    }
    Ok(())
}

fn remove_entry(path: &Path, is_dir: bool) -> Result<(), CleanupError> {
    let remove = |p: &Path| if is_dir { fs::remove_dir(p) } else { fs::remove_file(p) };

    match remove(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            if let Some(parent) = path.parent() {
                clear_readonly(parent, true);
            }
            clear_readonly(path, is_dir);
            match remove(path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(source) => Err(CleanupError::Io {
                    path: path.to_path_buf(),
                    source,
                }),
            }
        }
        Err(source) => Err(CleanupError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(unix)]
fn clear_readonly(path: &Path, is_dir: bool) {
    use std::os::unix::fs::PermissionsExt;

    if let Ok(metadata) = fs::symlink_metadata(path) {
        if metadata.file_type().is_symlink() {
            return;
        }
        let mut permissions = metadata.permissions();
        let bits = if is_dir { 0o700 } else { 0o600 };
        permissions.set_mode(permissions.mode() | bits);
        let _ = fs::set_permissions(path, permissions);
    }
}

#[cfg(not(unix))]
fn clear_readonly(path: &Path, _is_dir: bool) {
    if let Ok(metadata) = fs::symlink_metadata(path) {
        let mut permissions = metadata.permissions();
        #[allow(clippy::permissions_set_readonly_false)]
        permissions.set_readonly(false);
        let _ = fs::set_permissions(path, permissions);
    }
}
