//! Request orchestration.
//!
//! [`MergeService::process`] drives one request through its stages:
//!
//! ```text
//! Validating -> Staging -> Merging -> [Compressing] -> [Encrypting] -> Responding -> CleaningUp
//! ```
//!
//! Each request owns a [`Workspace`]. On failure it is torn down before the
//! error is returned; on success it travels inside the [`MergedPdf`] until
//! the response has been built.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::compress::{CompressionOutcome, ExternalCompressor};
use crate::config::{CompressionMode, MergeOptions, Quality, ServiceConfig};
use crate::error::{MergeError, Result};
use crate::io::{Upload, UploadStager, ordered_pdf_paths};
use crate::merge::{Encryptor, MergeSettings, Merger};
use crate::utils::format_file_size;
use crate::workspace::Workspace;

/// File name of the merged artifact inside the output partition.
pub const MERGED_FILE_NAME: &str = "merged.pdf";

/// Holds the merged file while the external compressor writes the final one.
const PRE_COMPRESSION_FILE_NAME: &str = "merged.tmp.pdf";

/// Encrypted copy that replaces the merged file.
const ENCRYPTED_FILE_NAME: &str = "merged.encrypted.pdf";

/// A step of request processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Checking options and upload limits.
    Validating,
    /// Creating the workspace and writing uploads into it.
    Staging,
    /// Loading and concatenating the staged PDFs.
    Merging,
    /// Running the external compressor.
    Compressing,
    /// Password-protecting the externally compressed file.
    Encrypting,
    /// Reading the final artifact for the response.
    Responding,
    /// Removing the workspace.
    CleaningUp,
}

impl Stage {
    /// Lowercase stage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validating => "validating",
            Self::Staging => "staging",
            Self::Merging => "merging",
            Self::Compressing => "compressing",
            Self::Encrypting => "encrypting",
            Self::Responding => "responding",
            Self::CleaningUp => "cleaning up",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a client sent in one merge request.
#[derive(Debug, Clone)]
pub struct MergeRequest {
    /// Uploaded files in arrival order.
    pub uploads: Vec<Upload>,
    /// Parsed form options.
    pub options: MergeOptions,
}

impl MergeRequest {
    /// Create a request.
    pub fn new(uploads: Vec<Upload>, options: MergeOptions) -> Self {
        Self { uploads, options }
    }
}

/// Summary of a processed request.
#[derive(Debug, Clone)]
pub struct MergeReport {
    /// Number of PDFs merged.
    pub files_merged: usize,
    /// Pages in the output.
    pub total_pages: usize,
    /// Requested compression mode.
    pub compression: CompressionMode,
    /// Result of the external compressor, for external mode.
    pub external: Option<CompressionOutcome>,
    /// Whether the output is password protected.
    pub encrypted: bool,
    /// Size of the final file.
    pub output_size: u64,
    /// Wall-clock processing time.
    pub elapsed: Duration,
}

/// The finished artifact, still living inside its workspace.
#[derive(Debug)]
pub struct MergedPdf {
    workspace: Workspace,
    path: PathBuf,
    report: MergeReport,
}

impl MergedPdf {
    /// Path of the merged file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Processing summary.
    pub fn report(&self) -> &MergeReport {
        &self.report
    }

    /// Read the merged file into memory.
    pub async fn read(&self) -> Result<Vec<u8>> {
        tokio::fs::read(&self.path)
            .await
            .map_err(|e| MergeError::from(e).at_stage(Stage::Responding))
    }

    /// Schedule workspace removal in the background.
    ///
    /// Failures are logged; the caller does not wait for them.
    pub fn release(self) {
        tokio::spawn(async move {
            if let Err(err) = self.finish().await {
                tracing::warn!(error = %err, "Failed to remove workspace");
            }
        });
    }

    /// Remove the workspace and wait for it.
    pub async fn finish(self) -> Result<()> {
        self.workspace
            .destroy()
            .await
            .map_err(|e| e.at_stage(Stage::CleaningUp))
    }
}

/// Merges uploaded PDFs, one workspace per request.
///
/// Cheap to share: all state is immutable after construction.
#[derive(Debug, Clone)]
pub struct MergeService {
    config: Arc<ServiceConfig>,
    stager: UploadStager,
    merger: Merger,
    compressor: ExternalCompressor,
    encryptor: Encryptor,
}

impl MergeService {
    /// Create a service from validated configuration.
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            stager: UploadStager::new(),
            merger: Merger::with_jobs(config.effective_jobs()),
            compressor: ExternalCompressor::new(&config.compressor),
            encryptor: Encryptor::new(),
            config: Arc::new(config),
        }
    }

    /// The configuration this service runs with.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Process a merge request.
    ///
    /// # Errors
    ///
    /// Validation errors are returned as-is; processing errors are wrapped
    /// with the [`Stage`] they occurred in. Either way no workspace is left
    /// behind.
    pub async fn process(&self, request: MergeRequest) -> Result<MergedPdf> {
        let started = Instant::now();

        self.validate(&request)?;

        let workspace = Workspace::create(self.config.workspace_root.as_deref())
            .await
            .map_err(|e| e.at_stage(Stage::Staging))?;

        let mut stage = Stage::Staging;
        match self.run(&workspace, &request, &mut stage).await {
            Ok(mut report) => {
                let path = workspace.output_dir().join(MERGED_FILE_NAME);
                report.elapsed = started.elapsed();

                tracing::info!(
                    files = report.files_merged,
                    pages = report.total_pages,
                    compression = request.options.compression.as_str(),
                    encrypted = report.encrypted,
                    size = %format_file_size(report.output_size),
                    elapsed_ms = report.elapsed.as_millis() as u64,
                    "Merged PDFs"
                );

                Ok(MergedPdf {
                    workspace,
                    path,
                    report,
                })
            }
            Err(err) => {
                let err = err.at_stage(stage);
                if let Err(cleanup) = workspace.destroy().await {
                    tracing::error!(error = %cleanup, "Failed to remove workspace after error");
                }
                Err(err)
            }
        }
    }

    fn validate(&self, request: &MergeRequest) -> Result<()> {
        let count = request.uploads.len();

        if count == 0 {
            return Err(MergeError::NoValidPdfs);
        }

        if let Some(limit) = self.config.limits.max_files
            && count > limit
        {
            return Err(MergeError::TooManyFiles { count, limit });
        }

        Ok(())
    }

    async fn run(
        &self,
        workspace: &Workspace,
        request: &MergeRequest,
        stage: &mut Stage,
    ) -> Result<MergeReport> {
        let options = &request.options;

        *stage = Stage::Staging;
        self.stager.stage(workspace, &request.uploads).await?;
        let inputs = ordered_pdf_paths(workspace.input_dir())?;

        *stage = Stage::Merging;
        let output = workspace.output_dir().join(MERGED_FILE_NAME);

        let mut external = None;
        let stats = match options.compression {
            CompressionMode::None | CompressionMode::Builtin => {
                let settings = MergeSettings {
                    builtin_compression: options.compression == CompressionMode::Builtin,
                    password: options.password.clone(),
                };
                self.merger.merge(&inputs, &output, &settings).await?
            }
            CompressionMode::External => {
                let stats = self
                    .merger
                    .merge(&inputs, &output, &MergeSettings::default())
                    .await?;

                *stage = Stage::Compressing;
                external = Some(self.compress_in_place(workspace, &output, options.quality).await?);

                if let Some(password) = &options.password {
                    *stage = Stage::Encrypting;
                    self.encrypt_in_place(workspace, &output, password).await?;
                }

                stats
            }
        };

        *stage = Stage::Responding;
        let output_size = tokio::fs::metadata(&output).await?.len();

        Ok(MergeReport {
            files_merged: stats.files_merged,
            total_pages: stats.total_pages,
            compression: options.compression,
            external,
            encrypted: options.is_encrypted(),
            output_size,
            elapsed: Duration::ZERO,
        })
    }

    /// Replace `output` with its externally compressed version, or leave it
    /// as it was when compression does not succeed.
    async fn compress_in_place(
        &self,
        workspace: &Workspace,
        output: &Path,
        quality: Quality,
    ) -> Result<CompressionOutcome> {
        let original = workspace.output_dir().join(PRE_COMPRESSION_FILE_NAME);
        tokio::fs::rename(output, &original).await?;

        let outcome = self.compressor.compress(&original, output, quality).await;

        if outcome.succeeded() {
            tokio::fs::remove_file(&original).await?;
        } else {
            if tokio::fs::try_exists(output).await.unwrap_or(false) {
                tokio::fs::remove_file(output).await?;
            }
            tokio::fs::rename(&original, output).await?;
            tracing::info!(outcome = ?outcome, "Keeping uncompressed output");
        }

        Ok(outcome)
    }

    async fn encrypt_in_place(&self, workspace: &Workspace, output: &Path, password: &str) -> Result<()> {
        let encrypted = workspace.output_dir().join(ENCRYPTED_FILE_NAME);
        self.encryptor.encrypt(output, &encrypted, password).await?;
        tokio::fs::rename(&encrypted, output).await?;
        Ok(())
    }
}
