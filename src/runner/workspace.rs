// Scratch workspace for one smoke run
//
// The directory is uniquely named and deliberately left on disk after the
// run so the artifacts can be inspected.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::errors::SmokeError;

const PREFIX: &str = "rlsmoke.";

/// Uniquely named directory owned by a single run
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Create a fresh directory under `parent`, or the system temp dir
    pub fn create(parent: Option<&Path>) -> Result<Self, SmokeError> {
        let parent = parent
            .map(Path::to_path_buf)
            .unwrap_or_else(std::env::temp_dir);

        let dir = tempfile::Builder::new()
            .prefix(PREFIX)
            .tempdir_in(&parent)
            .map_err(|e| SmokeError::filesystem(&parent, e))?;

        // Detach from TempDir so nothing is removed on drop
        let root = dir.keep();
        info!(path = %root.display(), "Created smoke workspace");

        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Path of a workspace-relative location
    pub fn join(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    /// Delete the whole tree
    pub fn remove(self) -> Result<(), SmokeError> {
        fs::remove_dir_all(&self.root).map_err(|e| SmokeError::filesystem(&self.root, e))?;
        debug!(path = %self.root.display(), "Removed smoke workspace");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspaces_are_unique_and_persist() {
        let parent = tempfile::tempdir().unwrap();

        let first = Workspace::create(Some(parent.path())).unwrap();
        let second = Workspace::create(Some(parent.path())).unwrap();

        assert_ne!(first.path(), second.path());
        assert!(first.path().starts_with(parent.path()));

        let kept = first.path().to_path_buf();
        drop(first);
        assert!(kept.is_dir());
    }

    #[test]
    fn test_missing_parent_is_filesystem_error() {
        let parent = tempfile::tempdir().unwrap();
        let missing = parent.path().join("does/not/exist");

        let err = Workspace::create(Some(&missing)).unwrap_err();
        assert!(matches!(err, SmokeError::Filesystem { .. }));
    }

    #[test]
    fn test_remove() {
        let parent = tempfile::tempdir().unwrap();
        let ws = Workspace::create(Some(parent.path())).unwrap();
        fs::create_dir_all(ws.join("a/b")).unwrap();
        let root = ws.path().to_path_buf();

        ws.remove().unwrap();
        assert!(!root.exists());
    }
}
