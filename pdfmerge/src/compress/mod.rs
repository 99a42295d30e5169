//! External compression.
//!
//! Runs a Ghostscript-compatible tool over a finished PDF. The tool is
//! optional: when it is missing, fails, or runs past its timeout the caller
//! keeps the uncompressed document, so every result is reported as a
//! [`CompressionOutcome`] rather than an error.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;

use crate::config::{CompressorConfig, Quality};

/// Result of one external compression attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompressionOutcome {
    /// The output file was written.
    Compressed,
    /// No candidate executable was found.
    ToolUnavailable,
    /// The tool ran but did not produce a usable file.
    Failed {
        /// Exit status or stderr summary.
        reason: String,
    },
    /// The tool was killed after exceeding the timeout.
    TimedOut,
}

impl CompressionOutcome {
    /// Whether the output file is ready to use.
    pub fn succeeded(&self) -> bool {
        matches!(self, Self::Compressed)
    }
}

/// Finds the compressor executable.
#[derive(Debug, Clone)]
pub struct ToolLocator {
    candidates: Vec<String>,
    search_path: Option<Vec<PathBuf>>,
}

impl ToolLocator {
    /// Look for `candidates`, in order, in `search_path` (or `PATH`).
    pub fn new(candidates: Vec<String>, search_path: Option<Vec<PathBuf>>) -> Self {
        Self {
            candidates,
            search_path,
        }
    }

    /// Path of the first candidate found, if any.
    ///
    /// A name containing a path separator is checked as given.
    pub fn locate(&self) -> Option<PathBuf> {
        let dirs: Vec<PathBuf> = match &self.search_path {
            Some(dirs) => dirs.clone(),
            None => std::env::var_os("PATH")
                .map(|path| std::env::split_paths(&path).collect())
                .unwrap_or_default(),
        };

        for candidate in &self.candidates {
            let as_given = Path::new(candidate);
            if as_given.components().count() > 1 {
                if is_executable(as_given) {
                    return Some(as_given.to_path_buf());
                }
                continue;
            }

            for dir in &dirs {
                for name in executable_names(candidate) {
                    let path = dir.join(name);
                    if is_executable(&path) {
                        return Some(path);
                    }
                }
            }
        }

        None
    }
}

fn executable_names(candidate: &str) -> Vec<String> {
    if cfg!(windows) && !candidate.to_lowercase().ends_with(".exe") {
        vec![format!("{candidate}.exe"), candidate.to_string()]
    } else {
        vec![candidate.to_string()]
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Ghostscript-style PDF recompressor.
#[derive(Debug, Clone)]
pub struct ExternalCompressor {
    locator: ToolLocator,
    timeout: Option<Duration>,
}

impl ExternalCompressor {
    /// Create a compressor from service configuration.
    pub fn new(config: &CompressorConfig) -> Self {
        Self {
            locator: ToolLocator::new(config.candidates.clone(), config.search_path.clone()),
            timeout: config.timeout,
        }
    }

    /// Command-line arguments for compressing `input` into `output`.
    pub fn arguments(input: &Path, output: &Path, quality: Quality) -> Vec<OsString> {
        let mut output_arg = OsString::from("-sOutputFile=");
        output_arg.push(output);

        vec![
            "-sDEVICE=pdfwrite".into(),
            "-dCompatibilityLevel=1.4".into(),
            format!("-dPDFSETTINGS={}", quality.preset()).into(),
            "-dNOPAUSE".into(),
            "-dQUIET".into(),
            "-dBATCH".into(),
            output_arg,
            input.as_os_str().to_owned(),
        ]
    }

    /// Compress `input` into `output`.
    ///
    /// `input` is never modified. Unless the outcome is
    /// [`CompressionOutcome::Compressed`], `output` does not exist afterwards.
    pub async fn compress(&self, input: &Path, output: &Path, quality: Quality) -> CompressionOutcome {
        let Some(tool) = self.locator.locate() else {
            tracing::warn!("No external compressor found, keeping uncompressed output");
            return CompressionOutcome::ToolUnavailable;
        };

        let start = Instant::now();
        let outcome = self.run(&tool, input, output, quality).await;

        match &outcome {
            CompressionOutcome::Compressed => {
                tracing::info!(
                    tool = %tool.display(),
                    quality = quality.as_str(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "External compression finished"
                );
            }
            CompressionOutcome::Failed { reason } => {
                tracing::warn!(tool = %tool.display(), %reason, "External compression failed");
            }
            CompressionOutcome::TimedOut => {
                tracing::warn!(
                    tool = %tool.display(),
                    timeout_secs = self.timeout.map(|t| t.as_secs_f64()),
                    "External compression timed out"
                );
            }
            CompressionOutcome::ToolUnavailable => {}
        }

        if !outcome.succeeded() {
            let _ = tokio::fs::remove_file(output).await;
        }

        outcome
    }

    async fn run(&self, tool: &Path, input: &Path, output: &Path, quality: Quality) -> CompressionOutcome {
        let mut command = Command::new(tool);
        command
            .args(Self::arguments(input, output, quality))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let run = command.output();
        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, run).await {
                Ok(result) => result,
                Err(_) => return CompressionOutcome::TimedOut,
            },
            None => run.await,
        };

        let finished = match result {
            Ok(finished) => finished,
            Err(e) => {
                return CompressionOutcome::Failed {
                    reason: format!("could not start {}: {e}", tool.display()),
                };
            }
        };

        if !finished.status.success() {
            let stderr = String::from_utf8_lossy(&finished.stderr);
            let detail = stderr.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("");
            return CompressionOutcome::Failed {
                reason: format!("{} {}", finished.status, detail.trim()).trim().to_string(),
            };
        }

        match tokio::fs::metadata(output).await {
            Ok(meta) if meta.len() > 0 => CompressionOutcome::Compressed,
            _ => CompressionOutcome::Failed {
                reason: "tool produced no output".to_string(),
            },
        }
    }
}
