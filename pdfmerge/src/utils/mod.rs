//! Utilities for upload names and size formatting.

use globset::{GlobBuilder, GlobMatcher};
use std::path::Path;
use std::sync::OnceLock;

/// Case-insensitive matcher for `*.pdf` file names.
fn pdf_matcher() -> &'static GlobMatcher {
    static MATCHER: OnceLock<GlobMatcher> = OnceLock::new();
    MATCHER.get_or_init(|| {
        GlobBuilder::new("*.pdf")
            .case_insensitive(true)
            .literal_separator(true)
            .build()
            .expect("`*.pdf` is a valid glob")
            .compile_matcher()
    })
}

/// Check whether a bare file name carries a `.pdf` extension.
///
/// Matching is case-insensitive and looks at the name only, so `a.PDF`
/// matches but `a.pdf.txt` does not.
pub fn is_pdf_name(name: &str) -> bool {
    !name.is_empty() && pdf_matcher().is_match(name)
}

/// Reduce a client-declared upload name to its final path component.
///
/// Clients may send names such as `../../etc/x.pdf` or `C:\docs\x.pdf`;
/// only `x.pdf` is ever written. Returns `None` when nothing usable remains.
pub fn sanitize_file_name(declared: &str) -> Option<String> {
    let last = declared.rsplit(['/', '\\']).next()?.trim();

    if last.is_empty() || last == "." || last == ".." {
        return None;
    }

    Path::new(last)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

/// Format file size as human-readable string.
pub fn format_file_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{size} bytes")
    }
}
