//! Upload staging.
//!
//! Validates uploaded file names and writes their bytes into a workspace's
//! input partition.

use std::collections::HashSet;
use std::path::PathBuf;

use crate::error::{MergeError, Result};
use crate::utils::{is_pdf_name, sanitize_file_name};
use crate::workspace::Workspace;

/// A single uploaded file, fully buffered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    /// Name declared by the client.
    pub filename: String,
    /// File content.
    pub content: Vec<u8>,
}

impl Upload {
    /// Create an upload from a declared name and its bytes.
    pub fn new(filename: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }
}

/// Writes validated uploads into a workspace.
#[derive(Debug, Clone, Default)]
pub struct UploadStager;

impl UploadStager {
    /// Create a new stager.
    pub fn new() -> Self {
        Self
    }

    /// Resolve the on-disk name for an upload, or reject it.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::MissingFilename`] for an empty name and
    /// [`MergeError::NotAPdf`] for anything that is not `*.pdf`.
    pub fn staged_name(&self, declared: &str) -> Result<String> {
        if declared.trim().is_empty() {
            return Err(MergeError::MissingFilename);
        }

        let name = sanitize_file_name(declared).ok_or_else(|| MergeError::not_a_pdf(declared))?;

        if !is_pdf_name(&name) {
            return Err(MergeError::not_a_pdf(declared));
        }

        Ok(name)
    }

    /// Validate every upload, then write them into the input partition.
    ///
    /// Names are checked before the first write, so a single bad name leaves
    /// the partition untouched. Uploads sharing a name overwrite each other
    /// in order; the last one wins.
    ///
    /// Returns the staged paths in upload order, without duplicates.
    pub async fn stage(&self, workspace: &Workspace, uploads: &[Upload]) -> Result<Vec<PathBuf>> {
        let names = uploads
            .iter()
            .map(|upload| self.staged_name(&upload.filename))
            .collect::<Result<Vec<_>>>()?;

        let mut seen = HashSet::new();
        let mut staged = Vec::with_capacity(uploads.len());

        for (upload, name) in uploads.iter().zip(names) {
            let path = workspace.input_dir().join(&name);

            if !seen.insert(name.clone()) {
                tracing::warn!(filename = %name, "Duplicate upload name, later file replaces earlier");
            } else {
                staged.push(path.clone());
            }

            tokio::fs::write(&path, &upload.content).await?;
            tracing::debug!(
                filename = %name,
                bytes = upload.content.len(),
                "Staged upload"
            );
        }

        Ok(staged)
    }
}
