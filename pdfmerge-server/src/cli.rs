//! Command-line and environment configuration for the server.
//!
//! Every flag has an environment fallback so the service can be configured
//! from a `.env` file in container deployments.

use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use pdfmerge::config::{CompressorConfig, DEFAULT_COMPRESSOR_CANDIDATES, ServiceConfig, UploadLimits};

const BYTES_PER_MB: usize = 1024 * 1024;

/// Merge uploaded PDF files over HTTP.
///
/// Serves `POST /merge-pdfs/`, which accepts a multipart form of PDF files
/// and returns them merged into one document, optionally compressed and
/// password protected.
#[derive(Parser, Debug, Clone)]
#[command(name = "pdfmerge-server")]
#[command(version)]
#[command(about = "HTTP service that merges uploaded PDF files", long_about = None)]
#[command(author)]
pub struct Cli {
    /// Address to listen on
    #[arg(long, env = "PDFMERGE_HOST", default_value = "0.0.0.0", value_name = "ADDR")]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// Maximum number of files per request
    ///
    /// Unlimited when not set.
    #[arg(long, env = "PDFMERGE_MAX_FILES", value_name = "N")]
    pub max_files: Option<usize>,

    /// Maximum request body size in megabytes
    #[arg(long, env = "PDFMERGE_MAX_UPLOAD_MB", default_value_t = 100, value_name = "MB")]
    pub max_upload_mb: usize,

    /// Seconds an external compression run may take before it is killed
    ///
    /// Use 0 to disable the timeout.
    #[arg(long, env = "PDFMERGE_COMPRESS_TIMEOUT", default_value_t = 120, value_name = "SECS")]
    pub compress_timeout: u64,

    /// Directory in which request workspaces are created
    ///
    /// Defaults to the system temporary directory.
    #[arg(long, env = "PDFMERGE_WORKSPACE_ROOT", value_name = "DIR")]
    pub workspace_root: Option<PathBuf>,

    /// External compressor executables to look for, in priority order
    #[arg(
        long = "compressor",
        env = "PDFMERGE_COMPRESSOR",
        value_delimiter = ',',
        value_name = "NAME",
        default_values_t = DEFAULT_COMPRESSOR_CANDIDATES.map(String::from).to_vec()
    )]
    pub compressors: Vec<String>,

    /// Number of PDFs parsed concurrently per request
    ///
    /// Defaults to the number of CPU cores.
    #[arg(short, long, env = "PDFMERGE_JOBS", value_name = "N")]
    pub jobs: Option<usize>,
}

impl Cli {
    /// Socket address to bind.
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Convert CLI arguments into service configuration.
    pub fn to_config(&self) -> ServiceConfig {
        ServiceConfig {
            limits: UploadLimits {
                max_files: self.max_files,
                max_upload_bytes: self.max_upload_mb.saturating_mul(BYTES_PER_MB),
            },
            compressor: CompressorConfig {
                candidates: self
                    .compressors
                    .iter()
                    .map(|c| c.trim().to_string())
                    .collect(),
                search_path: None,
                timeout: (self.compress_timeout > 0)
                    .then(|| Duration::from_secs(self.compress_timeout)),
            },
            workspace_root: self.workspace_root.clone(),
            jobs: self.jobs,
        }
    }
}
