//! File input/output for the merge pipeline.
//!
//! - [`staging`]: validating uploads and writing them into a workspace
//! - [`reader`]: ordering and parsing staged PDFs
//! - [`writer`]: atomic serialisation of finished documents

pub mod reader;
pub mod staging;
pub mod writer;

pub use reader::{LoadedPdf, PdfReader, ordered_pdf_paths};
pub use staging::{Upload, UploadStager};
pub use writer::{PdfWriter, WriteStatistics};
