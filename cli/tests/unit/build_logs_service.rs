//! Unit tests for the build log streamer.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use deckhand_cli::application::services::build_logs::stream_build_logs;
use deckhand_cli::domain::build::LogPage;
use deckhand_cli::domain::error::StreamError;
use deckhand_common::{BuildRecord, BuildSource, StreamEnd};

use crate::helpers::{build, page};
use crate::mocks::{MockCloud, RecordingSink};

fn lines(sink: &RecordingSink<BuildRecord>) -> Vec<String> {
    sink.records()
        .into_iter()
        .filter(|r| r.source == BuildSource::BuildLogs)
        .map(|r| r.data)
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_follows_pages_until_complete_and_drained() {
    let cloud = MockCloud::with_builds(
        [build(false, false), build(false, true), build(true, true)],
        [
            page(&["npm ci", "npm run build"], "f/1"),
            page(&["Build finished"], "f/2"),
            page(&[], "f/2"),
        ],
    );
    let sink = RecordingSink::new();

    stream_build_logs(&cloud, "docs-build:1", &sink)
        .await
        .expect("stream");

    assert_eq!(
        sink.records()[0],
        BuildRecord::info("Build docs-build:1 in progress")
    );
    assert_eq!(lines(&sink), vec!["npm ci", "npm run build", "Build finished"]);
    assert_eq!(
        cloud.tokens_seen(),
        vec![None, Some("f/1".to_string()), Some("f/2".to_string())]
    );
    assert_eq!(cloud.build_calls(), 4);
    assert_eq!(sink.end(), StreamEnd::Success);
}

#[tokio::test(start_paused = true)]
async fn test_trailing_newlines_are_trimmed() {
    let cloud = MockCloud::with_builds(
        [build(true, true)],
        [page(&["step 1\n", "step 2\r\n"], "f/1"), page(&[], "f/1")],
    );
    let sink = RecordingSink::new();

    stream_build_logs(&cloud, "docs-build:1", &sink)
        .await
        .expect("stream");

    assert_eq!(lines(&sink), vec!["step 1", "step 2"]);
}

#[tokio::test(start_paused = true)]
async fn test_complete_build_without_logs_ends_at_once() {
    let cloud = MockCloud::with_builds([build(true, false)], Vec::<LogPage>::new());
    let sink = RecordingSink::new();

    stream_build_logs(&cloud, "docs-build:1", &sink)
        .await
        .expect("stream");

    assert!(sink.records().is_empty());
    assert_eq!(cloud.build_calls(), 1);
    assert!(cloud.tokens_seen().is_empty());
    assert_eq!(sink.end(), StreamEnd::Success);
}

#[tokio::test(start_paused = true)]
async fn test_build_lookup_failure_ends_stream_with_failure() {
    let cloud = MockCloud::default();
    let sink = RecordingSink::new();

    let err = stream_build_logs(&cloud, "docs-build:404", &sink)
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<StreamError>(),
        Some(StreamError::Build(_))
    ));
    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].source, BuildSource::SysFailure);
    assert!(records[0].data.contains("docs-build:404 gone"));
    assert!(matches!(sink.end(), StreamEnd::Failure { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_reassumes_role_when_credentials_near_expiry() {
    let cloud = MockCloud {
        credential_ttl: Some(chrono::Duration::seconds(30)),
        ..MockCloud::with_builds(
            [build(false, true), build(true, true)],
            [page(&["npm ci"], "f/1"), page(&[], "f/1")],
        )
    };
    let sink = RecordingSink::new();

    stream_build_logs(&cloud, "docs-build:1", &sink)
        .await
        .expect("stream");

    assert_eq!(lines(&sink), vec!["npm ci"]);
    assert_eq!(cloud.assume_count(), 1 + cloud.build_calls());
    assert_eq!(sink.end(), StreamEnd::Success);
}
