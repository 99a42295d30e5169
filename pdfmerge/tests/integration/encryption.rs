//! Integration tests for password-protected output.

use pdfmerge::pipeline::MergeRequest;
use rstest::rstest;

use crate::common::{
    TestService, assert_locked, encrypted_pdf_bytes, is_encrypted_bytes, load, opens_with, options,
    page_labels, pdf_upload,
};
use pdfmerge::MergeError;
use pdfmerge::io::Upload;

#[rstest]
#[case::none(None)]
#[case::builtin(Some("builtin"))]
#[case::external_without_tool(Some("external"))]
#[tokio::test]
async fn test_password_encrypts_in_every_mode(#[case] compress: Option<&str>) {
    let ctx = TestService::new();
    let request = MergeRequest::new(
        vec![pdf_upload("a.pdf", "a", 1), pdf_upload("b.pdf", "b", 2)],
        options(compress, None, Some("open sesame")),
    );

    let merged = ctx.service.process(request).await.unwrap();
    let bytes = merged.read().await.unwrap();

    assert!(merged.report().encrypted);
    assert!(is_encrypted_bytes(&bytes));
    assert_eq!(merged.report().total_pages, 3);
    assert_locked(merged.path(), "open sesame", "(b-2)");

    merged.finish().await.unwrap();
}

#[tokio::test]
async fn test_wrong_password_is_refused() {
    let ctx = TestService::new();
    let request = MergeRequest::new(
        vec![pdf_upload("a.pdf", "a", 1)],
        options(None, None, Some("right")),
    );

    let merged = ctx.service.process(request).await.unwrap();
    assert!(opens_with(merged.path(), "right"));
    assert!(!opens_with(merged.path(), "wrong"));
    assert!(!opens_with(merged.path(), "Right"));
    merged.finish().await.unwrap();
}

#[tokio::test]
async fn test_empty_password_means_no_encryption() {
    let ctx = TestService::new();
    let request = MergeRequest::new(vec![pdf_upload("a.pdf", "a", 1)], options(None, None, Some("")));

    let merged = ctx.service.process(request).await.unwrap();
    let bytes = merged.read().await.unwrap();

    assert!(!merged.report().encrypted);
    assert!(!is_encrypted_bytes(&bytes));
    merged.finish().await.unwrap();
}

#[tokio::test]
async fn test_owner_protected_upload_is_merged() {
    let ctx = TestService::new();
    let request = MergeRequest::new(
        vec![
            Upload::new("a.pdf", encrypted_pdf_bytes("a", 2, "", "owner")),
            pdf_upload("b.pdf", "b", 1),
        ],
        options(Some("builtin"), None, None),
    );

    let merged = ctx.service.process(request).await.unwrap();
    let bytes = merged.read().await.unwrap();

    assert!(!is_encrypted_bytes(&bytes));
    assert_eq!(page_labels(&load(merged.path())), ["a-1", "a-2", "b-1"]);
    merged.finish().await.unwrap();
    assert_eq!(ctx.workspaces_left(), 0);
}

#[tokio::test]
async fn test_user_protected_upload_is_refused() {
    let ctx = TestService::new();
    let request = MergeRequest::new(
        vec![
            pdf_upload("a.pdf", "a", 1),
            Upload::new("b.pdf", encrypted_pdf_bytes("b", 1, "user", "owner")),
        ],
        options(None, None, None),
    );

    let err = ctx.service.process(request).await.unwrap_err();

    assert!(!err.is_validation());
    assert!(matches!(
        &err,
        MergeError::Stage { source, .. } if matches!(**source, MergeError::EncryptedPdf { .. })
    ));
    assert_eq!(ctx.workspaces_left(), 0);
}
