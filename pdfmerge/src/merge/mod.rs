//! PDF merging.
//!
//! - [`merger`]: loading inputs and concatenating their page trees
//! - [`pages`]: page tree helpers and content stream compression
//! - [`encryption`]: password protection of finished documents

pub mod encryption;
pub mod merger;
pub mod pages;

pub use encryption::{Encryptor, apply_password};
pub use merger::{MergeSettings, MergeStatistics, Merger, collate};
