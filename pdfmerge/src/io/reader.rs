//! PDF discovery and loading.
//!
//! [`ordered_pdf_paths`] decides the merge order of a staged input partition;
//! [`PdfReader`] parses the files in that order.
//!
//! # Examples
//!
//! ```no_run
//! use pdfmerge::io::{PdfReader, ordered_pdf_paths};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let paths = ordered_pdf_paths(Path::new("/tmp/ws/input"))?;
//! let loaded = PdfReader::new().load_all(&paths, 4).await?;
//! println!("{} documents", loaded.len());
//! # Ok(())
//! # }
//! ```

use futures::stream::{self, StreamExt, TryStreamExt};
use lopdf::{Document, Object};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::task;
use walkdir::WalkDir;

use crate::error::{MergeError, Result};
use crate::utils::is_pdf_name;

/// A loaded PDF document with metadata.
#[derive(Debug)]
pub struct LoadedPdf {
    /// The PDF document.
    pub document: Document,

    /// Path to the source file.
    pub path: PathBuf,

    /// Number of pages in the document.
    pub page_count: usize,

    /// Time taken to load the document.
    pub load_time: Duration,

    /// File size in bytes.
    pub file_size: u64,
}

/// List the PDFs of a directory in merge order.
///
/// Only regular files directly inside `dir` whose names end in `.pdf`
/// (case-insensitive) are returned, sorted lexicographically by full path.
/// `b10.pdf` therefore sorts before `b2.pdf`.
///
/// # Errors
///
/// Returns [`MergeError::NoValidPdfs`] when no file qualifies, or an I/O
/// error if the directory cannot be read.
pub fn ordered_pdf_paths(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| {
            MergeError::Io(
                e.into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory walk failed")),
            )
        })?;

        if entry.file_type().is_file() && is_pdf_name(&entry.file_name().to_string_lossy()) {
            paths.push(entry.into_path());
        }
    }

    if paths.is_empty() {
        return Err(MergeError::NoValidPdfs);
    }

    paths.sort();
    Ok(paths)
}

/// Parses staged PDFs off the async runtime.
#[derive(Debug, Clone, Default)]
pub struct PdfReader;

impl PdfReader {
    /// Create a new PDF reader.
    pub fn new() -> Self {
        Self
    }

    /// Load a single PDF document.
    ///
    /// Parsing runs on the blocking thread pool. Documents that only carry an
    /// owner password open with the empty user password; they are decrypted
    /// on load and their security handler is dropped, so they merge like any
    /// other input.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - File cannot be read or parsed
    /// - PDF is encrypted with a non-empty user password
    /// - PDF has no pages
    pub async fn load(&self, path: &Path) -> Result<LoadedPdf> {
        let path_buf = path.to_path_buf();

        task::spawn_blocking(move || {
            let start = Instant::now();

            let mut document = Document::load(&path_buf)
                .map_err(|e| MergeError::failed_to_load_pdf(path_buf.clone(), e.to_string()))?;

            if document.is_encrypted() {
                if document.encryption_state.is_none() {
                    return Err(MergeError::encrypted_pdf(path_buf));
                }
                strip_encryption(&mut document);
                tracing::debug!(path = %path_buf.display(), "Removed owner-password protection");
            }

            let page_count = document.get_pages().len();
            if page_count == 0 {
                return Err(MergeError::failed_to_load_pdf(path_buf, "PDF has no pages"));
            }

            let file_size = std::fs::metadata(&path_buf).map(|m| m.len()).unwrap_or(0);

            Ok(LoadedPdf {
                document,
                path: path_buf,
                page_count,
                load_time: start.elapsed(),
                file_size,
            })
        })
        .await?
    }

    /// Load several PDFs concurrently, keeping input order.
    ///
    /// At most `workers` documents are parsed at once. The first failure
    /// aborts the whole batch.
    pub async fn load_all(&self, paths: &[PathBuf], workers: usize) -> Result<Vec<LoadedPdf>> {
        let reader = self.clone();

        stream::iter(paths.to_vec())
            .map(move |path| {
                let reader = reader.clone();
                async move { reader.load(&path).await }
            })
            .buffered(workers.max(1))
            .try_collect()
            .await
    }
}

/// Drop the security handler of a document whose objects are already
/// decrypted.
fn strip_encryption(document: &mut Document) {
    if let Ok(Object::Reference(id)) = document.trailer.get(b"Encrypt") {
        let id = *id;
        document.objects.remove(&id);
    }
    document.trailer.remove(b"Encrypt");
    document.encryption_state = None;
}
