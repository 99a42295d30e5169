//! Integration tests for merging without external tools.

use pdfmerge::pipeline::MergeRequest;
use rstest::rstest;
use std::sync::Arc;

use crate::common::{TestService, load, options, page_labels, pdf_upload};

#[tokio::test]
async fn test_merge_keeps_page_order_within_and_across_files() {
    let ctx = TestService::new();
    let request = MergeRequest::new(
        vec![
            pdf_upload("02-second.pdf", "second", 2),
            pdf_upload("01-first.pdf", "first", 3),
            pdf_upload("03-third.pdf", "third", 1),
        ],
        options(None, None, None),
    );

    let merged = ctx.service.process(request).await.unwrap();
    let doc = load(merged.path());

    assert_eq!(
        page_labels(&doc),
        ["first-1", "first-2", "first-3", "second-1", "second-2", "third-1"]
    );
    assert_eq!(merged.report().total_pages, 6);

    merged.finish().await.unwrap();
    assert_eq!(ctx.workspaces_left(), 0);
}

#[tokio::test]
async fn test_order_is_lexicographic_not_numeric() {
    let ctx = TestService::new();
    let request = MergeRequest::new(
        vec![
            pdf_upload("b2.pdf", "b2", 1),
            pdf_upload("b10.pdf", "b10", 1),
            pdf_upload("a.pdf", "a", 1),
        ],
        options(None, None, None),
    );

    let merged = ctx.service.process(request).await.unwrap();
    assert_eq!(page_labels(&load(merged.path())), ["a-1", "b10-1", "b2-1"]);
    merged.finish().await.unwrap();
}

#[tokio::test]
async fn test_single_file_round_trips_pages() {
    let ctx = TestService::new();
    let request = MergeRequest::new(vec![pdf_upload("only.pdf", "only", 4)], options(None, None, None));

    let merged = ctx.service.process(request).await.unwrap();
    assert_eq!(
        page_labels(&load(merged.path())),
        ["only-1", "only-2", "only-3", "only-4"]
    );
    merged.finish().await.unwrap();
}

#[rstest]
#[case::none(None)]
#[case::builtin(Some("builtin"))]
#[case::builtin_uppercase(Some("BUILTIN"))]
#[tokio::test]
async fn test_modes_produce_same_pages(#[case] compress: Option<&str>) {
    let ctx = TestService::new();
    let request = MergeRequest::new(
        vec![pdf_upload("a.pdf", "a", 2), pdf_upload("b.pdf", "b", 2)],
        options(compress, None, None),
    );

    let merged = ctx.service.process(request).await.unwrap();
    assert_eq!(page_labels(&load(merged.path())), ["a-1", "a-2", "b-1", "b-2"]);
    merged.finish().await.unwrap();
}

#[tokio::test]
async fn test_merging_is_repeatable() {
    let ctx = TestService::new();
    let uploads = vec![pdf_upload("x.pdf", "x", 2), pdf_upload("y.pdf", "y", 1)];

    let mut labels = Vec::new();
    for _ in 0..2 {
        let merged = ctx
            .service
            .process(MergeRequest::new(uploads.clone(), options(Some("builtin"), None, None)))
            .await
            .unwrap();
        labels.push(page_labels(&load(merged.path())));
        merged.finish().await.unwrap();
    }

    assert_eq!(labels[0], labels[1]);
    assert_eq!(ctx.workspaces_left(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_use_separate_workspaces() {
    let ctx = TestService::new();

    let handles: Vec<_> = ["first", "second", "third"]
        .into_iter()
        .map(|label| {
            let service = Arc::clone(&ctx.service);
            tokio::spawn(async move {
                let request = MergeRequest::new(
                    vec![pdf_upload("a.pdf", label, 2), pdf_upload("b.pdf", "tail", 1)],
                    options(Some("builtin"), None, None),
                );
                let merged = service.process(request).await.unwrap();
                let path = merged.path().to_path_buf();
                let labels = page_labels(&load(&path));
                merged.finish().await.unwrap();
                (path, labels)
            })
        })
        .collect();

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap());
    }

    assert_ne!(results[0].0, results[1].0);
    assert_ne!(results[1].0, results[2].0);
    assert_eq!(results[0].1, ["first-1", "first-2", "tail-1"]);
    assert_eq!(results[2].1, ["third-1", "third-2", "tail-1"]);
    assert_eq!(ctx.workspaces_left(), 0);
}
