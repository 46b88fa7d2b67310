//! Per-request scratch directory
//!
//! Each pipeline run gets its own directory under the workspace root. The
//! directory is removed on [`Workspace::release`], or on drop if the run
//! unwinds or is cancelled first, so nothing is left behind on any path.

use crate::error::{PipelineError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Prefix for request directories under the workspace root
const DIR_PREFIX: &str = "vdub-";

/// Owned scratch directory, deleted when released or dropped
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    released: bool,
}

impl Workspace {
    /// Create a fresh, uniquely named directory under `root`
    ///
    /// `root` is created if missing.
    pub fn acquire(root: &Path) -> Result<Self> {
        let path = root.join(format!("{}{}", DIR_PREFIX, Uuid::new_v4()));
        std::fs::create_dir_all(&path).map_err(|e| {
            PipelineError::Workspace(format!("Failed to create {}: {}", path.display(), e))
        })?;

        debug!("Acquired workspace {}", path.display());
        Ok(Self {
            path,
            released: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path for a named file inside the workspace
    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Write `bytes` to `name` inside the workspace
    pub async fn write_file(&self, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.file(name);
        tokio::fs::write(&path, bytes).await.map_err(|e| {
            PipelineError::Workspace(format!("Failed to write {}: {}", path.display(), e))
        })?;
        Ok(path)
    }

    /// Delete the directory and everything in it on the blocking pool
    ///
    /// # Errors
    /// `Workspace` if removal fails. The drop guard does not retry.
    pub async fn release(mut self) -> Result<()> {
        self.released = true;
        let path = self.path.clone();
        match tokio::task::spawn_blocking(move || remove(&path)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(PipelineError::Workspace(format!(
                "Failed to remove {}: {}",
                self.path.display(),
                e
            ))),
            Err(e) => Err(PipelineError::Workspace(format!(
                "Cleanup of {} did not finish: {}",
                self.path.display(),
                e
            ))),
        }
    }
}

// Synchronous: only reached when a run unwinds without releasing.
impl Drop for Workspace {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = remove(&self.path) {
            warn!("Failed to clean up workspace {}: {}", self.path.display(), e);
        }
    }
}

fn remove(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => {
            debug!("Released workspace {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
