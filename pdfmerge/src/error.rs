//! Error types for pdfmerge.
//!
//! Every failure of the merge pipeline is a [`MergeError`]. Errors fall into
//! two categories:
//!
//! - **Validation errors** are caused by the client (bad option values,
//!   non-PDF uploads, nothing left to merge). They carry a human-readable
//!   reason and are reported back unchanged.
//! - **Processing errors** are everything else (unparseable PDFs, I/O
//!   failures, encryption failures). The orchestrator wraps them with the
//!   [`Stage`] they occurred in.
//!
//! Failures of the external compression tool are deliberately *not* errors;
//! see [`crate::compress::CompressionOutcome`].

use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::pipeline::Stage;

/// Result type alias for pdfmerge operations.
pub type Result<T> = std::result::Result<T, MergeError>;

/// Main error type for pdfmerge operations.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// A form option has a value outside its allowed set.
    #[error("Invalid {field}: {value}. Allowed values: {}", AllowedValues(.allowed))]
    InvalidOption {
        /// Human-readable name of the option.
        field: &'static str,
        /// The rejected value.
        value: String,
        /// Values that would have been accepted.
        allowed: &'static [&'static str],
    },

    /// An uploaded file does not carry a `.pdf` name.
    #[error("Only PDF files are allowed (got '{filename}')")]
    NotAPdf {
        /// The declared upload name.
        filename: String,
    },

    /// An uploaded file part had no filename at all.
    #[error("Only PDF files are allowed (upload without a filename)")]
    MissingFilename,

    /// Nothing survived staging and filtering.
    #[error("No valid PDF files found in the uploaded files")]
    NoValidPdfs,

    /// More files were uploaded than the service accepts.
    #[error("Too many files: {count} uploaded, at most {limit} allowed")]
    TooManyFiles {
        /// Number of uploaded files.
        count: usize,
        /// Configured maximum.
        limit: usize,
    },

    /// A staged PDF could not be parsed.
    #[error("Failed to load PDF: {}: {reason}", .path.display())]
    FailedToLoadPdf {
        /// Path to the staged file.
        path: PathBuf,
        /// Parser message.
        reason: String,
    },

    /// A staged PDF is password protected.
    #[error("PDF is encrypted and cannot be merged: {}", .path.display())]
    EncryptedPdf {
        /// Path to the staged file.
        path: PathBuf,
    },

    /// Page tree manipulation failed.
    #[error("Merge operation failed: {reason}")]
    MergeFailed {
        /// Description of what went wrong.
        reason: String,
    },

    /// The document could not be encrypted.
    #[error("Failed to encrypt PDF: {reason}")]
    EncryptionFailed {
        /// Description of what went wrong.
        reason: String,
    },

    /// Serialising a document to disk failed.
    #[error("Failed to write PDF: {}: {source}", .path.display())]
    FailedToWrite {
        /// Path being written to.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The request workspace could not be created or removed.
    #[error("Workspace error: {source}")]
    Workspace {
        /// Underlying I/O error.
        source: io::Error,
    },

    /// A blocking task panicked or was cancelled.
    #[error("Background task failed: {message}")]
    Task {
        /// Join error message.
        message: String,
    },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A processing error tagged with the pipeline stage it occurred in.
    #[error("{source}")]
    Stage {
        /// Stage that was running.
        stage: Stage,
        /// The underlying failure.
        #[source]
        source: Box<MergeError>,
    },
}

/// Renders an allowed-value list as `a, b, c`.
struct AllowedValues(&'static [&'static str]);

impl fmt::Display for AllowedValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(", "))
    }
}

impl From<lopdf::Error> for MergeError {
    fn from(err: lopdf::Error) -> Self {
        Self::merge_failed(err.to_string())
    }
}

impl From<tokio::task::JoinError> for MergeError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task {
            message: err.to_string(),
        }
    }
}

impl MergeError {
    /// Create an InvalidOption error.
    pub fn invalid_option(
        field: &'static str,
        value: impl Into<String>,
        allowed: &'static [&'static str],
    ) -> Self {
        Self::InvalidOption {
            field,
            value: value.into(),
            allowed,
        }
    }

    /// Create a NotAPdf error.
    pub fn not_a_pdf(filename: impl Into<String>) -> Self {
        Self::NotAPdf {
            filename: filename.into(),
        }
    }

    /// Create a FailedToLoadPdf error.
    pub fn failed_to_load_pdf(path: PathBuf, reason: impl Into<String>) -> Self {
        Self::FailedToLoadPdf {
            path,
            reason: reason.into(),
        }
    }

    /// Create an EncryptedPdf error.
    pub fn encrypted_pdf(path: PathBuf) -> Self {
        Self::EncryptedPdf { path }
    }

    /// Create a MergeFailed error.
    pub fn merge_failed(reason: impl Into<String>) -> Self {
        Self::MergeFailed {
            reason: reason.into(),
        }
    }

    /// Create an EncryptionFailed error.
    pub fn encryption_failed(reason: impl Into<String>) -> Self {
        Self::EncryptionFailed {
            reason: reason.into(),
        }
    }

    /// Tag a processing error with the stage it occurred in.
    ///
    /// Validation errors and already-tagged errors are returned unchanged.
    pub fn at_stage(self, stage: Stage) -> Self {
        if self.is_validation() || matches!(self, Self::Stage { .. }) {
            return self;
        }
        Self::Stage {
            stage,
            source: Box::new(self),
        }
    }

    /// The stage a processing error was raised in, if known.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Check if this error was caused by the client's input.
    ///
    /// Validation errors map to a 400 response; everything else is an
    /// internal failure.
    pub fn is_validation(&self) -> bool {
        match self {
            Self::InvalidOption { .. }
            | Self::NotAPdf { .. }
            | Self::MissingFilename
            | Self::NoValidPdfs
            | Self::TooManyFiles { .. } => true,
            Self::Stage { source, .. } => source.is_validation(),
            _ => false,
        }
    }
}
