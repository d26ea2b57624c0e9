//! Temporary file bookkeeping.
//!
//! A [`TemporaryFileSet`] records every file created while decoding one
//! request. Deleting the set is idempotent: a path leaves the set once its
//! removal has been attempted, missing files are not errors, and one failed
//! deletion never stops the others. If an async deletion is abandoned part
//! way, the paths not yet processed stay tracked.

use std::path::{Path, PathBuf};

/// The files written while decoding one request body.
#[derive(Debug, Default)]
pub struct TemporaryFileSet {
    paths: Vec<PathBuf>,
}

impl TemporaryFileSet {
    /// Creates an empty set.
    pub const fn new() -> Self {
        Self { paths: Vec::new() }
    }

    /// Records a path for later deletion.
    pub fn track(&mut self, path: impl Into<PathBuf>) {
        self.paths.push(path.into());
    }

    /// The tracked paths, in creation order.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Returns `true` if `path` is tracked.
    pub fn contains(&self, path: &Path) -> bool {
        self.paths.iter().any(|p| p == path)
    }

    /// The number of tracked paths.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Returns `true` if nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Deletes every tracked file and clears the set.
    ///
    /// Returns the number of files actually removed. Files that are already
    /// gone are skipped silently; other failures are logged and skipped.
    pub async fn delete_all(&mut self) -> usize {
        let tracked = self.paths.len();
        let mut removed = 0;
        while let Some(path) = self.paths.last() {
            let result = tokio::fs::remove_file(path).await;
            if let Some(path) = self.paths.pop() {
                match result {
                    Ok(()) => removed += 1,
                    Err(e) => log_failure(&path, &e),
                }
            }
        }
        tracing::debug!(removed, tracked, "temporary files deleted");
        removed
    }

    /// Blocking variant of [`delete_all`](Self::delete_all), for use where
    /// no executor is available (e.g. `Drop`).
    pub fn delete_all_blocking(&mut self) -> usize {
        let paths = std::mem::take(&mut self.paths);
        let mut removed = 0;
        for path in &paths {
            match std::fs::remove_file(path) {
                Ok(()) => removed += 1,
                Err(e) => log_failure(path, &e),
            }
        }
        removed
    }
}

fn log_failure(path: &Path, error: &std::io::Error) {
    if error.kind() != std::io::ErrorKind::NotFound {
        tracing::warn!(path = %path.display(), error = %error, "failed to delete temporary file");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_delete_all_removes_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        std::fs::write(&a, b"1").unwrap();
        std::fs::write(&b, b"2").unwrap();

        let mut set = TemporaryFileSet::new();
        set.track(&a);
        set.track(&b);
        assert_eq!(set.len(), 2);
        assert!(set.contains(&a));

        assert_eq!(set.delete_all().await, 2);
        assert!(set.is_empty());
        assert!(!a.exists());
        assert!(!b.exists());
    }

    #[tokio::test]
    async fn test_delete_all_twice_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        std::fs::write(&a, b"1").unwrap();

        let mut set = TemporaryFileSet::new();
        set.track(&a);
        assert_eq!(set.delete_all().await, 1);
        assert_eq!(set.delete_all().await, 0);
        assert!(set.is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_does_not_stop_others() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("never-created");
        let a_directory = dir.path().join("subdir");
        let present = dir.path().join("present");
        std::fs::create_dir(&a_directory).unwrap();
        std::fs::write(&present, b"x").unwrap();

        let mut set = TemporaryFileSet::new();
        set.track(&missing);
        // remove_file on a directory fails with something other than NotFound.
        set.track(&a_directory);
        set.track(&present);

        assert_eq!(set.delete_all().await, 1);
        assert!(set.is_empty());
        assert!(!present.exists());
        assert!(a_directory.exists());
    }

    #[tokio::test]
    async fn test_abandoned_delete_keeps_remaining_paths() {
        let dir = tempfile::tempdir().unwrap();
        let mut set = TemporaryFileSet::new();
        for i in 0..5 {
            let path = dir.path().join(format!("f{i}"));
            std::fs::write(&path, b"x").unwrap();
            set.track(path);
        }

        {
            let fut = set.delete_all();
            futures::pin_mut!(fut);
            let _ = futures::poll!(fut.as_mut());
        }

        set.delete_all_blocking();
        assert!(set.is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_delete_all_blocking() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        std::fs::write(&a, b"1").unwrap();

        let mut set = TemporaryFileSet::new();
        set.track(&a);
        set.track(dir.path().join("gone"));
        assert_eq!(set.delete_all_blocking(), 1);
        assert!(set.is_empty());
        assert!(!a.exists());
        assert_eq!(set.delete_all_blocking(), 0);
    }
}
