//! Core PDF merging implementation.
//!
//! This module implements the merge algorithm that concatenates multiple PDF
//! documents, in order, into one output file.

use lopdf::{Document, ObjectId};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::task;

use crate::error::{MergeError, Result};
use crate::io::{PdfReader, PdfWriter};
use crate::merge::encryption::apply_password;
use crate::merge::pages::{append_pages, compress_page_contents, page_count};
use crate::utils::format_file_size;

/// Output settings for a merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSettings {
    /// Recompress page content streams while merging.
    pub builtin_compression: bool,

    /// Encrypt the output with this password (user and owner).
    pub password: Option<String>,
}

/// Statistics about a merge operation.
#[derive(Debug, Clone)]
pub struct MergeStatistics {
    /// Number of PDFs merged.
    pub files_merged: usize,

    /// Total number of pages in merged document.
    pub total_pages: usize,

    /// Total time taken for merge, including loading and writing.
    pub merge_time: Duration,

    /// Time taken to load all PDFs.
    pub load_time: Duration,

    /// Total size of input files.
    pub input_size: u64,

    /// Size of the written output.
    pub output_size: u64,

    /// Whether page contents were recompressed.
    pub compressed: bool,

    /// Whether the output is encrypted.
    pub encrypted: bool,
}

impl MergeStatistics {
    /// Format input size as human-readable string.
    pub fn format_input_size(&self) -> String {
        format_file_size(self.input_size)
    }

    /// Format output size as human-readable string.
    pub fn format_output_size(&self) -> String {
        format_file_size(self.output_size)
    }
}

/// PDF merger that combines multiple documents.
#[derive(Debug, Clone)]
pub struct Merger {
    /// Reader for loading PDFs.
    reader: PdfReader,

    /// Writer for the merged output.
    writer: PdfWriter,

    /// Number of documents parsed concurrently.
    jobs: usize,
}

impl Merger {
    /// Create a new merger with default settings.
    pub fn new() -> Self {
        Self::with_jobs(4)
    }

    /// Create a merger that parses up to `jobs` inputs at once.
    pub fn with_jobs(jobs: usize) -> Self {
        Self {
            reader: PdfReader::new(),
            writer: PdfWriter::new(),
            jobs: jobs.max(1),
        }
    }

    /// Merge `inputs`, in the given order, into a single PDF at `output`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `inputs` is empty
    /// - Any input cannot be loaded
    /// - The page tree cannot be rebuilt
    /// - Encryption or writing fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use pdfmerge::merge::{Merger, MergeSettings};
    /// # use std::path::{Path, PathBuf};
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let merger = Merger::new();
    /// let inputs = vec![PathBuf::from("a.pdf"), PathBuf::from("b.pdf")];
    /// let stats = merger
    ///     .merge(&inputs, Path::new("merged.pdf"), &MergeSettings::default())
    ///     .await?;
    /// println!("Merged {} files into {} pages", stats.files_merged, stats.total_pages);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn merge(
        &self,
        inputs: &[PathBuf],
        output: &Path,
        settings: &MergeSettings,
    ) -> Result<MergeStatistics> {
        if inputs.is_empty() {
            return Err(MergeError::NoValidPdfs);
        }

        let merge_start = Instant::now();

        let load_start = Instant::now();
        let loaded = self.reader.load_all(inputs, self.jobs).await?;
        let load_time = load_start.elapsed();

        let files_merged = loaded.len();
        let input_size = loaded.iter().map(|p| p.file_size).sum();
        let documents: Vec<Document> = loaded.into_iter().map(|p| p.document).collect();

        let settings_owned = settings.clone();
        let document = task::spawn_blocking(move || {
            let mut merged = collate(documents)?;

            if settings_owned.builtin_compression {
                compress_page_contents(&mut merged)?;
            }

            if let Some(password) = &settings_owned.password {
                apply_password(&mut merged, password)?;
            }

            Ok::<_, MergeError>(merged)
        })
        .await??;

        let total_pages = page_count(&document);
        let write_stats = self.writer.save(document, output).await?;

        let statistics = MergeStatistics {
            files_merged,
            total_pages,
            merge_time: merge_start.elapsed(),
            load_time,
            input_size,
            output_size: write_stats.file_size,
            compressed: settings.builtin_compression,
            encrypted: settings.password.is_some(),
        };

        tracing::debug!(
            files = statistics.files_merged,
            pages = statistics.total_pages,
            input = %statistics.format_input_size(),
            output = %statistics.format_output_size(),
            "Merged documents"
        );

        Ok(statistics)
    }
}

impl Default for Merger {
    fn default() -> Self {
        Self::new()
    }
}

/// Concatenate documents into a freshly numbered one.
///
/// The first document is the base; the pages of every following document are
/// appended to its root page tree in order. Objects no longer reachable from
/// the trailer (the other documents' catalogs) are dropped.
pub fn collate(documents: Vec<Document>) -> Result<Document> {
    let mut documents = documents.into_iter();

    let mut merged = documents.next().ok_or(MergeError::NoValidPdfs)?;
    let mut max_id = merged.max_id;

    for mut doc in documents {
        // Renumber objects to avoid ID conflicts
        doc.renumber_objects_with(max_id + 1);
        max_id = doc.max_id;

        let doc_pages: Vec<ObjectId> = doc.get_pages().into_values().collect();

        merged.objects.extend(doc.objects);
        append_pages(&mut merged, &doc_pages)?;
    }

    merged.max_id = max_id;
    merged.prune_objects();
    merged.renumber_objects();

    Ok(merged)
}
