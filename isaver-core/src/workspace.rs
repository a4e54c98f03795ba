//! Request-scoped temporary storage.
//!
//! Every download request gets its own workspace directory holding the two
//! fetched elementary streams and the muxed output. The workspace is removed
//! exactly once, on every exit path: pipeline error, panic, completed
//! delivery, or client disconnect. Nothing inside it survives the request.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A temporary directory bound to a single request.
///
/// Wraps [`tempfile::TempDir`], which removes the directory tree when
/// dropped. Delivery hands ownership to the response body stream so removal
/// fires only after the last byte has been sent (or the client went away).
#[derive(Debug)]
pub struct ScopedWorkspace {
    dir: TempDir,
}

impl ScopedWorkspace {
    /// Creates a fresh workspace under `root`, or the system temp directory
    /// when `root` is `None`.
    ///
    /// # Errors
    ///
    /// - `std::io::Error` - The directory could not be created
    pub fn create(root: Option<&Path>) -> std::io::Result<Self> {
        let dir = match root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                TempDir::with_prefix_in("isaver-", root)?
            }
            None => TempDir::with_prefix("isaver-")?,
        };

        tracing::debug!("Created workspace {}", dir.path().display());
        Ok(Self { dir })
    }

    /// Path of the workspace directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Joins a file name onto the workspace directory.
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Removes the workspace now, reporting any filesystem error.
    ///
    /// Dropping the workspace removes it as well; this variant exists for
    /// callers that want the error surfaced instead of logged.
    ///
    /// # Errors
    ///
    /// - `std::io::Error` - The directory tree could not be removed
    pub fn close(self) -> std::io::Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close()?;
        tracing::debug!("Removed workspace {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workspace_is_removed_on_drop() {
        let workspace = ScopedWorkspace::create(None).unwrap();
        let path = workspace.path().to_path_buf();
        std::fs::write(workspace.file("video.mp4"), b"data").unwrap();
        assert!(path.exists());

        drop(workspace);
        assert!(!path.exists());
    }

    #[test]
    fn workspace_close_reports_success() {
        let workspace = ScopedWorkspace::create(None).unwrap();
        let path = workspace.path().to_path_buf();
        workspace.close().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn workspace_respects_custom_root() {
        let root = tempfile::tempdir().unwrap();
        let workspace = ScopedWorkspace::create(Some(root.path())).unwrap();
        assert!(workspace.path().starts_with(root.path()));
    }
}
