//! pdfmerge - Merge uploaded PDF files into a single document.
//!
//! This library implements the request pipeline behind the `pdfmerge-server`
//! HTTP service. It supports:
//!
//! - Ordered merging of any number of PDFs
//! - Built-in content stream compression
//! - Optional recompression with an external Ghostscript-compatible tool
//! - Password protection of the output
//! - Per-request scratch workspaces that are always removed
//!
//! # Examples
//!
//! ## Processing a Request
//!
//! ```no_run
//! use pdfmerge::config::{MergeForm, MergeOptions, ServiceConfig};
//! use pdfmerge::io::Upload;
//! use pdfmerge::pipeline::{MergeRequest, MergeService};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = MergeService::new(ServiceConfig::default());
//!
//! let options = MergeOptions::from_form(&MergeForm {
//!     compress: Some("builtin".into()),
//!     quality: None,
//!     password: Some("secret".into()),
//! })?;
//! let uploads = vec![
//!     Upload::new("a.pdf", std::fs::read("a.pdf")?),
//!     Upload::new("b.pdf", std::fs::read("b.pdf")?),
//! ];
//!
//! let merged = service.process(MergeRequest::new(uploads, options)).await?;
//! let bytes = merged.read().await?;
//! println!("{} bytes, {} pages", bytes.len(), merged.report().total_pages);
//! merged.finish().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Using Individual Components
//!
//! ```no_run
//! use pdfmerge::merge::{MergeSettings, Merger};
//! use std::path::{Path, PathBuf};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let inputs = vec![PathBuf::from("a.pdf"), PathBuf::from("b.pdf")];
//! let stats = Merger::new()
//!     .merge(&inputs, Path::new("merged.pdf"), &MergeSettings::default())
//!     .await?;
//! println!("Created {} page document", stats.total_pages);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod compress;
pub mod config;
pub mod error;
pub mod io;
pub mod merge;
pub mod pipeline;
pub mod utils;
pub mod workspace;

// Re-export commonly used types
pub use config::{CompressionMode, MergeOptions, Quality, ServiceConfig};
pub use error::{MergeError, Result};
pub use pipeline::{MergeRequest, MergeService, MergedPdf, Stage};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
