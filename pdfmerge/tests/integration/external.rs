//! Integration tests for the external compression path.

use pdfmerge::compress::CompressionOutcome;
use pdfmerge::pipeline::{MERGED_FILE_NAME, MergeRequest};

use crate::common::{TestService, assert_locked, load, options, page_labels, pdf_upload};

#[tokio::test]
async fn test_missing_tool_falls_back_to_plain_merge() {
    let ctx = TestService::new();
    let request = MergeRequest::new(
        vec![pdf_upload("a.pdf", "a", 1), pdf_upload("b.pdf", "b", 1)],
        options(Some("external"), Some("printer"), None),
    );

    let merged = ctx.service.process(request).await.unwrap();

    assert_eq!(merged.report().external, Some(CompressionOutcome::ToolUnavailable));
    assert!(merged.path().ends_with(MERGED_FILE_NAME));
    assert_eq!(page_labels(&load(merged.path())), ["a-1", "b-1"]);
    merged.finish().await.unwrap();
}

#[tokio::test]
async fn test_ghostscript_alias() {
    let ctx = TestService::new();
    let request = MergeRequest::new(
        vec![pdf_upload("a.pdf", "a", 1)],
        options(Some("Ghostscript"), None, None),
    );

    let merged = ctx.service.process(request).await.unwrap();
    assert!(merged.report().external.is_some());
    merged.finish().await.unwrap();
}

#[cfg(unix)]
mod with_fake_tool {
    use super::*;

    const COPY: &str = "#!/bin/sh\nfor a in \"$@\"; do case \"$a\" in -sOutputFile=*) out=\"${a#-sOutputFile=}\";; esac; last=\"$a\"; done\ncp \"$last\" \"$out\"\n";

    const RECORD_ARGS: &str = "#!/bin/sh\nfor a in \"$@\"; do case \"$a\" in -sOutputFile=*) out=\"${a#-sOutputFile=}\";; esac; last=\"$a\"; done\necho \"$@\" > \"$(dirname \"$0\")/args.txt\"\ncp \"$last\" \"$out\"\n";

    #[tokio::test]
    async fn test_compressed_output_is_served() {
        let ctx = TestService::new();
        ctx.install_tool(COPY);
        let request = MergeRequest::new(
            vec![pdf_upload("a.pdf", "a", 2), pdf_upload("b.pdf", "b", 1)],
            options(Some("external"), None, None),
        );

        let merged = ctx.service.process(request).await.unwrap();

        assert_eq!(merged.report().external, Some(CompressionOutcome::Compressed));
        assert_eq!(page_labels(&load(merged.path())), ["a-1", "a-2", "b-1"]);
        let leftovers = std::fs::read_dir(merged.path().parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
        merged.finish().await.unwrap();
    }

    #[tokio::test]
    async fn test_quality_preset_is_passed() {
        let ctx = TestService::new();
        ctx.install_tool(RECORD_ARGS);
        let request = MergeRequest::new(
            vec![pdf_upload("a.pdf", "a", 1)],
            options(Some("external"), Some("prepress"), None),
        );

        let merged = ctx.service.process(request).await.unwrap();
        let args = std::fs::read_to_string(ctx.tools.path().join("args.txt")).unwrap();

        assert!(args.contains("-sDEVICE=pdfwrite"));
        assert!(args.contains("-dPDFSETTINGS=/prepress"));
        assert!(args.contains("-dBATCH"));
        merged.finish().await.unwrap();
    }

    #[tokio::test]
    async fn test_compressed_then_encrypted() {
        let ctx = TestService::new();
        ctx.install_tool(COPY);
        let request = MergeRequest::new(
            vec![pdf_upload("a.pdf", "a", 1)],
            options(Some("external"), Some("ebook"), Some("pw")),
        );

        let merged = ctx.service.process(request).await.unwrap();

        assert!(merged.report().external.as_ref().is_some_and(|o| o.succeeded()));
        assert_locked(merged.path(), "pw", "(a-1)");
        merged.finish().await.unwrap();
    }

    #[tokio::test]
    async fn test_timeout_keeps_uncompressed_merge() {
        let ctx = TestService::with_config(|config| {
            config.compressor.timeout = Some(std::time::Duration::from_millis(300));
        });
        ctx.install_tool("#!/bin/sh\nsleep 30\n");
        let request = MergeRequest::new(
            vec![pdf_upload("a.pdf", "a", 1)],
            options(Some("external"), None, None),
        );

        let merged = ctx.service.process(request).await.unwrap();

        assert_eq!(merged.report().external, Some(CompressionOutcome::TimedOut));
        assert_eq!(page_labels(&load(merged.path())), ["a-1"]);
        merged.finish().await.unwrap();
        assert_eq!(ctx.workspaces_left(), 0);
    }
}
