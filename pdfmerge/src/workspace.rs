//! Request-scoped scratch directories.
//!
//! Every request gets its own [`Workspace`]: a uniquely named directory with
//! an `input/` partition for staged uploads and an `output/` partition for
//! the merged artifact. The directory is removed exactly once, either
//! explicitly through [`Workspace::destroy`] or, if the workspace is dropped
//! first (cancelled request, panic), by the drop hook of the underlying
//! [`tempfile::TempDir`].

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tokio::task;

use crate::error::{MergeError, Result};

const WORKSPACE_PREFIX: &str = "pdfmerge-";

/// An exclusively owned per-request directory tree.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
    input: PathBuf,
    output: PathBuf,
}

impl Workspace {
    /// Create a new workspace under `root`, or the system temp dir.
    ///
    /// Both partitions exist when this returns.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::Workspace`] if the directories cannot be created.
    pub async fn create(root: Option<&Path>) -> Result<Self> {
        let root = root.map(Path::to_path_buf);

        task::spawn_blocking(move || {
            let mut builder = tempfile::Builder::new();
            builder.prefix(WORKSPACE_PREFIX);

            let dir = match &root {
                Some(root) => builder.tempdir_in(root),
                None => builder.tempdir(),
            }
            .map_err(|source| MergeError::Workspace { source })?;

            let input = dir.path().join("input");
            let output = dir.path().join("output");
            std::fs::create_dir_all(&input).map_err(|source| MergeError::Workspace { source })?;
            std::fs::create_dir_all(&output).map_err(|source| MergeError::Workspace { source })?;

            tracing::debug!(path = %dir.path().display(), "Created workspace");

            Ok(Self { dir, input, output })
        })
        .await?
    }

    /// Root of the workspace.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Partition holding staged uploads.
    pub fn input_dir(&self) -> &Path {
        &self.input
    }

    /// Partition holding merge artifacts.
    pub fn output_dir(&self) -> &Path {
        &self.output
    }

    /// Recursively remove the workspace.
    ///
    /// Consumes the workspace, so it cannot be destroyed twice.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::Workspace`] if removal fails. The directory may
    /// then be partially left behind.
    pub async fn destroy(self) -> Result<()> {
        let path = self.dir.path().to_path_buf();

        task::spawn_blocking(move || self.dir.close())
            .await?
            .map_err(|source| MergeError::Workspace { source })?;

        tracing::debug!(path = %path.display(), "Removed workspace");
        Ok(())
    }
}
