//! Configuration module for pdfmerge.
//!
//! Two kinds of configuration live here:
//! - Per-request [`MergeOptions`], parsed and validated once from the raw
//!   form fields ([`MergeForm`]) against [`OPTION_TABLE`].
//! - Process-wide [`ServiceConfig`], built by the server from its command
//!   line and environment and validated before the listener starts.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, str::FromStr, time::Duration};

use crate::MergeError;

/// How the merged document is compressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionMode {
    /// Pages are copied as-is.
    #[default]
    None,
    /// Page content streams are recompressed while merging.
    Builtin,
    /// The merged file is passed through the external compressor.
    External,
}

impl CompressionMode {
    /// Accepted values of the `compress` field.
    pub const ALLOWED: &'static [&'static str] = &["none", "builtin", "external"];

    /// Canonical form-field spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Builtin => "builtin",
            Self::External => "external",
        }
    }
}

impl FromStr for CompressionMode {
    type Err = MergeError;

    /// Parse a compression mode from its form value.
    ///
    /// Matching is case-insensitive; `ghostscript` is accepted as an alias of
    /// `external`.
    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "builtin" => Ok(Self::Builtin),
            "external" | "ghostscript" => Ok(Self::External),
            _ => Err(MergeError::invalid_option(
                "compress method",
                s,
                Self::ALLOWED,
            )),
        }
    }
}

/// Optimization preset handed to the external compressor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// Medium resolution, small output.
    #[default]
    Ebook,
    /// High resolution for printing.
    Printer,
    /// Prepress quality, colour preserving.
    Prepress,
}

impl Quality {
    /// Accepted values of the `quality` field.
    pub const ALLOWED: &'static [&'static str] = &["ebook", "printer", "prepress"];

    /// Canonical form-field spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ebook => "ebook",
            Self::Printer => "printer",
            Self::Prepress => "prepress",
        }
    }

    /// The tool's settings preset name, e.g. `/ebook`.
    pub fn preset(&self) -> String {
        format!("/{}", self.as_str())
    }
}

impl FromStr for Quality {
    type Err = MergeError;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ebook" => Ok(Self::Ebook),
            "printer" => Ok(Self::Printer),
            "prepress" => Ok(Self::Prepress),
            _ => Err(MergeError::invalid_option(
                "quality for external compression",
                s,
                Self::ALLOWED,
            )),
        }
    }
}

/// One row of the option table: a form field, its allowed values and the
/// condition under which it is consulted.
#[derive(Debug, Clone, Copy)]
pub struct OptionSpec {
    /// Form field name.
    pub field: &'static str,
    /// Values the field may take.
    pub allowed: &'static [&'static str],
    /// Value used when the field is absent.
    pub default: &'static str,
    /// The field is only validated when this returns true.
    pub applies: fn(CompressionMode) -> bool,
}

/// Every enumerated request option, validated once up front.
pub const OPTION_TABLE: [OptionSpec; 2] = [
    OptionSpec {
        field: "compress",
        allowed: CompressionMode::ALLOWED,
        default: "none",
        applies: always,
    },
    OptionSpec {
        field: "quality",
        allowed: Quality::ALLOWED,
        default: "ebook",
        applies: external_only,
    },
];

fn always(_: CompressionMode) -> bool {
    true
}

fn external_only(mode: CompressionMode) -> bool {
    mode == CompressionMode::External
}

/// Raw, unvalidated request options as they arrive in the form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeForm {
    /// `compress` field.
    pub compress: Option<String>,
    /// `quality` field.
    pub quality: Option<String>,
    /// `password` field.
    pub password: Option<String>,
}

/// Validated per-request options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOptions {
    /// Compression mode.
    pub compression: CompressionMode,
    /// Preset for external compression. Always the default unless
    /// `compression` is [`CompressionMode::External`].
    pub quality: Quality,
    /// Password for the output document; never `Some("")`.
    pub password: Option<String>,
}

impl MergeOptions {
    /// Validate raw form options.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::InvalidOption`] for an unknown compression mode,
    /// or for an unknown quality when the mode is `external`. Quality is not
    /// looked at for the other modes.
    pub fn from_form(form: &MergeForm) -> crate::Result<Self> {
        let [compress_spec, quality_spec] = OPTION_TABLE;

        let compression: CompressionMode = form
            .compress
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(compress_spec.default)
            .parse()?;

        let quality = if (quality_spec.applies)(compression) {
            form.quality
                .as_deref()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(quality_spec.default)
                .parse()?
        } else {
            Quality::default()
        };

        let password = form.password.clone().filter(|p| !p.is_empty());

        Ok(Self {
            compression,
            quality,
            password,
        })
    }

    /// Whether the output will be password protected.
    pub fn is_encrypted(&self) -> bool {
        self.password.is_some()
    }
}

/// Default executable names of the external compressor, in priority order.
pub const DEFAULT_COMPRESSOR_CANDIDATES: [&str; 3] = ["gs", "gswin64c", "gswin32c"];

/// Limits applied to each request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadLimits {
    /// Maximum number of uploaded files; `None` accepts any number.
    pub max_files: Option<usize>,
    /// Maximum request body size in bytes.
    pub max_upload_bytes: usize,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_files: None,
            max_upload_bytes: 100 * 1024 * 1024,
        }
    }
}

/// How the external compressor is found and run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressorConfig {
    /// Executable names tried in order; the first one found wins.
    pub candidates: Vec<String>,
    /// Directories searched instead of `PATH`, when set.
    pub search_path: Option<Vec<PathBuf>>,
    /// Upper bound on a single compressor run.
    pub timeout: Option<Duration>,
}

impl Default for CompressorConfig {
    fn default() -> Self {
        Self {
            candidates: DEFAULT_COMPRESSOR_CANDIDATES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            search_path: None,
            timeout: Some(Duration::from_secs(120)),
        }
    }
}

/// Process-wide configuration of the merge service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Request limits.
    pub limits: UploadLimits,
    /// External compressor settings.
    pub compressor: CompressorConfig,
    /// Parent directory for request workspaces; the system temp dir if unset.
    pub workspace_root: Option<PathBuf>,
    /// Number of PDFs parsed concurrently per request.
    pub jobs: Option<usize>,
}

impl ServiceConfig {
    /// Check the configuration for values the service cannot run with.
    ///
    /// # Errors
    ///
    /// Returns an error if a limit is zero, no compressor candidates are
    /// configured, the timeout is zero, or the workspace root is not an
    /// existing directory.
    pub fn validate(&self) -> Result<()> {
        if self.limits.max_files == Some(0) {
            bail!("Maximum file count must be at least 1");
        }

        if self.limits.max_upload_bytes == 0 {
            bail!("Maximum upload size must be greater than zero");
        }

        if self.compressor.candidates.is_empty()
            || self.compressor.candidates.iter().any(|c| c.trim().is_empty())
        {
            bail!("Compressor candidates must be non-empty executable names");
        }

        if self.compressor.timeout == Some(Duration::ZERO) {
            bail!("Compressor timeout must be greater than zero");
        }

        if let Some(root) = &self.workspace_root
            && !root.is_dir()
        {
            bail!("Workspace root is not a directory: {}", root.display());
        }

        if self.jobs == Some(0) {
            bail!("Number of jobs must be at least 1");
        }

        Ok(())
    }

    /// Get the effective number of concurrent PDF loads.
    pub fn effective_jobs(&self) -> usize {
        self.jobs.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        })
    }
}
