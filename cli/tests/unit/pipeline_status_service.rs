//! Unit tests for the pipeline status streamer.
//!
//! Time is paused so the poll interval elapses instantly.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use deckhand_cli::application::engine::Engine;
use deckhand_cli::application::ports::{PipelineRef, ServiceRegistry};
use deckhand_cli::application::services::pipeline_status::stream_pipeline_status;
use deckhand_cli::domain::error::StreamError;
use deckhand_cli::domain::pipeline::{ActionState, LatestExecution, PipelineState, StageState};
use deckhand_common::PipelineExecutionStatus::{Failed, InProgress, Succeeded};
use deckhand_common::{
    ActionExecutionDetail, ActionStatus, PipelineData, PipelineRecord, PipelineSource, StreamEnd,
};

use crate::helpers::{REGION, action, service_input, settings, site_attributes};
use crate::mocks::{FakeWorkspaces, FlakyRegistry, MockCloud, RecordingSink, ScriptedIac};

const PIPELINE: PipelineRef<'static> = PipelineRef {
    region: REGION,
    name: "docs-pipeline",
};

fn snapshots(sink: &RecordingSink<PipelineRecord>) -> Vec<Vec<ActionExecutionDetail>> {
    sink.records()
        .into_iter()
        .filter_map(|r| match (r.source, r.data) {
            (PipelineSource::PipelineStatus, PipelineData::Actions(actions)) => Some(actions),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_emits_snapshot_only_when_signature_changes() {
    let source_running = vec![action("Source", "Checkout", ActionStatus::InProgress)];
    let build_running = vec![
        action("Source", "Checkout", ActionStatus::Succeeded),
        action("Build", "Build", ActionStatus::InProgress),
    ];
    let build_done = vec![
        action("Source", "Checkout", ActionStatus::Succeeded),
        action("Build", "Build", ActionStatus::Succeeded),
    ];
    let cloud = MockCloud::with_statuses(
        [InProgress, InProgress, InProgress, Succeeded],
        [
            source_running.clone(),
            source_running.clone(),
            build_running.clone(),
            build_done.clone(),
        ],
    );
    let sink = RecordingSink::new();

    stream_pipeline_status(&cloud, PIPELINE, "exec-1", &sink)
        .await
        .expect("stream");

    assert_eq!(
        sink.records()[0],
        PipelineRecord::info("Pipeline docs-pipeline running")
    );
    assert_eq!(
        snapshots(&sink),
        vec![source_running, build_running, build_done]
    );
    assert_eq!(cloud.polled().len(), 4);
    assert_eq!(cloud.assume_count(), 1);
    assert_eq!(sink.end(), StreamEnd::Success);
}

#[tokio::test(start_paused = true)]
async fn test_terminal_status_on_first_poll_still_reports_snapshot() {
    let failed = vec![action("Build", "Build", ActionStatus::Failed)];
    let cloud = MockCloud::with_statuses([Failed], [failed.clone()]);
    let sink = RecordingSink::new();

    stream_pipeline_status(&cloud, PIPELINE, "exec-1", &sink)
        .await
        .expect("stream");

    assert_eq!(snapshots(&sink), vec![failed]);
    assert_eq!(cloud.polled().len(), 1);
    assert_eq!(sink.end(), StreamEnd::Success);
}

#[tokio::test(start_paused = true)]
async fn test_snapshots_carry_build_ids_from_stage_state() {
    let mut cloud = MockCloud::with_statuses(
        [Succeeded],
        [vec![action("Build", "Build", ActionStatus::Succeeded)]],
    );
    cloud.state = PipelineState {
        stage_states: vec![StageState {
            stage_name: "Build".to_string(),
            action_states: vec![ActionState {
                action_name: "Build".to_string(),
                latest_execution: Some(LatestExecution {
                    external_execution_id: Some("docs-build:0f1e".to_string()),
                    summary: Some("Build succeeded".to_string()),
                }),
            }],
        }],
    };
    let sink = RecordingSink::new();

    stream_pipeline_status(&cloud, PIPELINE, "exec-1", &sink)
        .await
        .expect("stream");

    let snapshot = &snapshots(&sink)[0][0];
    assert_eq!(snapshot.external_execution_id.as_deref(), Some("docs-build:0f1e"));
    assert_eq!(snapshot.summary.as_deref(), Some("Build succeeded"));
}

#[tokio::test(start_paused = true)]
async fn test_polls_the_pipeline_region() {
    let cloud = MockCloud::with_statuses([Succeeded], [Vec::new()]);
    let pipeline = PipelineRef {
        region: "us-east-2",
        name: "api-pipeline",
    };

    stream_pipeline_status(&cloud, pipeline, "exec-9", &RecordingSink::new())
        .await
        .expect("stream");

    assert_eq!(
        cloud.polled(),
        vec![("us-east-2".to_string(), "api-pipeline".to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn test_reassumes_role_when_credentials_near_expiry() {
    let running = vec![action("Build", "Build", ActionStatus::InProgress)];
    let cloud = MockCloud {
        credential_ttl: Some(chrono::Duration::minutes(1)),
        ..MockCloud::with_statuses([InProgress, InProgress, Succeeded], [running])
    };
    let sink = RecordingSink::new();

    stream_pipeline_status(&cloud, PIPELINE, "exec-1", &sink)
        .await
        .expect("stream");

    // Every poll finds the credentials inside the refresh margin.
    assert_eq!(cloud.polled().len(), 3);
    assert_eq!(cloud.assume_count(), 4);
    assert_eq!(sink.end(), StreamEnd::Success);
}

#[tokio::test(start_paused = true)]
async fn test_keeps_credentials_that_are_far_from_expiry() {
    let running = vec![action("Build", "Build", ActionStatus::InProgress)];
    let cloud = MockCloud {
        credential_ttl: Some(chrono::Duration::hours(1)),
        ..MockCloud::with_statuses([InProgress, InProgress, Succeeded], [running])
    };

    stream_pipeline_status(&cloud, PIPELINE, "exec-1", &RecordingSink::new())
        .await
        .expect("stream");

    assert_eq!(cloud.polled().len(), 3);
    assert_eq!(cloud.assume_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_credential_failure_ends_stream_with_failure() {
    let cloud = MockCloud {
        fail_assume: true,
        ..MockCloud::default()
    };
    let sink = RecordingSink::new();

    let err = stream_pipeline_status(&cloud, PIPELINE, "exec-1", &sink)
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<StreamError>(),
        Some(StreamError::Pipeline(_))
    ));
    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].source, PipelineSource::SysFailure);
    assert!(matches!(sink.end(), StreamEnd::Failure { .. }));
    assert!(cloud.polled().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_status_lookup_failure_closes_stream() {
    // No scripted status at all: the first get-execution fails.
    let cloud = MockCloud::default();
    let sink = RecordingSink::new();

    let err = stream_pipeline_status(&cloud, PIPELINE, "exec-1", &sink)
        .await
        .unwrap_err();

    assert!(format!("{err}").contains("Throttling"));
    assert_eq!(sink.ends().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_engine_resolves_pipeline_from_registered_service() {
    let engine = Engine::new(
        ScriptedIac::default(),
        FakeWorkspaces::default(),
        FlakyRegistry::new(),
        MockCloud::with_statuses([Succeeded], [Vec::new()]),
        settings(),
    );
    let id = engine
        .registry()
        .create_static_site(&service_input("docs"), &site_attributes())
        .await
        .expect("seed");
    let sink = RecordingSink::new();

    engine
        .stream_pipeline_status(&id, "exec-1", &sink)
        .await
        .expect("stream");

    assert_eq!(
        sink.records()[0],
        PipelineRecord::info("Pipeline docs-pipeline running")
    );
}

#[tokio::test(start_paused = true)]
async fn test_engine_rejects_unknown_service() {
    let engine = Engine::new(
        ScriptedIac::default(),
        FakeWorkspaces::default(),
        FlakyRegistry::new(),
        MockCloud::default(),
        settings(),
    );
    let sink = RecordingSink::new();

    engine
        .stream_pipeline_status("svc-00000000000000ff", "exec-1", &sink)
        .await
        .unwrap_err();

    assert_eq!(sink.records().len(), 1);
    assert!(matches!(sink.end(), StreamEnd::Failure { .. }));
}
