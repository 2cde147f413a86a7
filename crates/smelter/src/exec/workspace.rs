//! Scratch workspace lifecycle
//!
//! Each execution gets its own uniquely-named directory under the
//! platform temp root, holding exactly the source file and any build
//! artifact. The directory is removed when the workspace is dropped, so
//! cleanup happens on every exit path.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

use crate::exec::ExecError;

/// Prefix for scratch directory names under the temp root.
const SCRATCH_PREFIX: &str = "smelter-exec-";

/// A disposable, isolated directory owning one execution's files.
///
/// Never shared across requests and never read after the owning call
/// returns. Deletion is recursive and best-effort.
#[derive(Debug)]
pub struct ScratchWorkspace {
    dir: TempDir,
}

impl ScratchWorkspace {
    /// Create a new scratch directory with owner-only permissions.
    pub fn create() -> Result<Self, ExecError> {
        let dir = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir()
            .map_err(ExecError::WorkspaceCreate)?;

        #[cfg(unix)]
        {
            use std::fs::Permissions;
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(dir.path(), Permissions::from_mode(0o700))
                .map_err(ExecError::WorkspaceCreate)?;
        }

        debug!(path = %dir.path().display(), "created scratch workspace");
        Ok(Self { dir })
    }

    /// The workspace directory
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Host path for a file inside the workspace.
    ///
    /// Returns an error if the name contains path traversal attempts.
    pub fn file_path(&self, name: &str) -> Result<PathBuf, ExecError> {
        if name.contains("..") || name.starts_with('/') {
            return Err(ExecError::InvalidPath(format!(
                "path traversal not allowed: {name}"
            )));
        }
        Ok(self.dir.path().join(name))
    }

    /// Write a source file into the workspace and return its path.
    pub fn write_source(&self, name: &str, content: &str) -> Result<PathBuf, ExecError> {
        let path = self.file_path(name)?;
        std::fs::write(&path, content)?;
        debug!(path = %path.display(), len = content.len(), "wrote source file");
        Ok(path)
    }

    /// Check if a file exists in the workspace
    pub fn file_exists(&self, name: &str) -> bool {
        self.file_path(name).map(|p| p.exists()).unwrap_or(false)
    }
}
