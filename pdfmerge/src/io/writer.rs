//! PDF writing and saving operations.
//!
//! This module provides safe PDF writing with:
//! - Atomic writes (write to temp file, then rename)
//! - Removal of the temp file when a write fails
//! - Write statistics
//!
//! # Examples
//!
//! ```no_run
//! use pdfmerge::io::PdfWriter;
//! use lopdf::Document;
//! use std::path::Path;
//!
//! # async fn example(doc: Document) -> Result<(), Box<dyn std::error::Error>> {
//! let writer = PdfWriter::new();
//! writer.save(doc, Path::new("output.pdf")).await?;
//! # Ok(())
//! # }
//! ```

use lopdf::Document;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::task;

use crate::error::{MergeError, Result};
use crate::utils::format_file_size;

/// Buffer size for serialising documents (in bytes).
const BUFFER_SIZE: usize = 64 * 1024;

/// Statistics about a write operation.
#[derive(Debug, Clone)]
pub struct WriteStatistics {
    /// Time taken to write the file.
    pub write_time: Duration,

    /// Size of the written file in bytes.
    pub file_size: u64,

    /// Path where the file was written.
    pub output_path: PathBuf,
}

impl WriteStatistics {
    /// Format file size as human-readable string.
    pub fn format_file_size(&self) -> String {
        format_file_size(self.file_size)
    }
}

/// Atomic PDF writer.
#[derive(Debug, Clone, Default)]
pub struct PdfWriter;

impl PdfWriter {
    /// Create a new PDF writer.
    pub fn new() -> Self {
        Self
    }

    /// Save a PDF document to a file.
    ///
    /// Parent directories are created as needed. The document is written to a
    /// temp sibling and renamed into place, so `path` either receives the
    /// complete document or is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::FailedToWrite`] if the file cannot be created,
    /// serialised, flushed, or moved into place.
    pub async fn save(&self, doc: Document, path: &Path) -> Result<WriteStatistics> {
        let path_buf = path.to_path_buf();

        task::spawn_blocking(move || write_document(doc, path_buf)).await?
    }
}

fn write_document(mut doc: Document, path: PathBuf) -> Result<WriteStatistics> {
    let start = Instant::now();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| MergeError::FailedToWrite {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let write_path = path.with_extension("tmp");

    let written = serialize_to(&mut doc, &write_path).and_then(|()| {
        std::fs::rename(&write_path, &path).map_err(|source| MergeError::FailedToWrite {
            path: path.clone(),
            source,
        })
    });

    if let Err(err) = written {
        // No partial artifact may survive a failed write.
        let _ = std::fs::remove_file(&write_path);
        return Err(err);
    }

    let file_size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);

    Ok(WriteStatistics {
        write_time: start.elapsed(),
        file_size,
        output_path: path,
    })
}

fn serialize_to(doc: &mut Document, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path).map_err(|source| MergeError::FailedToWrite {
        path: path.to_path_buf(),
        source,
    })?;

    let mut writer = std::io::BufWriter::with_capacity(BUFFER_SIZE, file);

    doc.save_to(&mut writer)
        .map_err(|e| MergeError::FailedToWrite {
            path: path.to_path_buf(),
            source: std::io::Error::other(e),
        })?;

    writer.flush().map_err(|source| MergeError::FailedToWrite {
        path: path.to_path_buf(),
        source,
    })
}
