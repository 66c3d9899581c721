//! Application service: pipeline status streamer.
//!
//! Polls one pipeline execution until it leaves the in-progress/stopping
//! set, emitting a snapshot only when the `(stage, action, status)`
//! signature changes.

use anyhow::Result;
use deckhand_common::PipelineRecord;
use tracing::{debug, warn};

use crate::application::ports::{CloudApi, LogSink, PipelineRef};
use crate::application::session::RoleSession;
use crate::application::sink::{end_marker, failure_message};
use crate::domain::error::StreamError;
use crate::domain::pipeline::{POLL_INTERVAL, signature};

/// Stream status snapshots of `execution_id` until it terminates.
///
/// # Errors
///
/// Returns [`StreamError::Pipeline`] if any upstream call fails. The sink
/// has already received a failure record and the terminal marker.
pub async fn stream_pipeline_status(
    cloud: &impl CloudApi,
    pipeline: PipelineRef<'_>,
    execution_id: &str,
    sink: &impl LogSink<PipelineRecord>,
) -> Result<()> {
    let result = poll(cloud, pipeline, execution_id, sink).await;
    if let Err(e) = &result {
        warn!(pipeline = pipeline.name, execution_id, error = %failure_message(e), "pipeline poll failed");
        sink.emit(PipelineRecord::failure(failure_message(e)));
    }
    sink.end(end_marker(&result));
    result.map_err(|e| StreamError::Pipeline(failure_message(&e)).into())
}

async fn poll(
    cloud: &impl CloudApi,
    pipeline: PipelineRef<'_>,
    execution_id: &str,
    sink: &impl LogSink<PipelineRecord>,
) -> Result<()> {
    let mut session = RoleSession::start(cloud).await?;
    let mut last_signature: Option<String> = None;
    let mut announced = false;

    loop {
        let creds = session.credentials().await?;
        let status = cloud.get_execution(creds, pipeline, execution_id).await?;
        let mut details = cloud
            .list_action_executions(creds, pipeline, execution_id)
            .await?;
        // Stage state is read separately and may lag the details by one poll.
        let state = cloud.get_state(creds, pipeline).await?;
        state.enrich(&mut details);

        if !announced {
            sink.emit(PipelineRecord::info(format!(
                "Pipeline {} running",
                pipeline.name
            )));
            announced = true;
        }

        let current = signature(&details);
        debug!(?status, signature = %current, "pipeline polled");
        if last_signature.as_deref() != Some(current.as_str()) {
            sink.emit(PipelineRecord::snapshot(details));
            last_signature = Some(current);
        }

        if !status.is_active() {
            debug!(?status, "pipeline execution finished");
            return Ok(());
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}
