//! `deckhand pipeline-status <id> <execution-id>`: follow a pipeline
//! execution until it leaves the in-progress states.

use std::process::ExitCode;

use anyhow::Result;
use deckhand_common::PipelineRecord;

use crate::app::{AppContext, LiveEngine};
use crate::application::ports::LogSink;
use crate::commands::{finish_streamed, until_interrupted};
use crate::output::JsonSink;

async fn follow(
    engine: &LiveEngine,
    service_id: &str,
    execution_id: &str,
    sink: &impl LogSink<PipelineRecord>,
) -> Result<()> {
    until_interrupted(engine.stream_pipeline_status(service_id, execution_id, sink)).await?
}

/// Run `deckhand pipeline-status`.
///
/// # Errors
///
/// Returns an error if the engine cannot be assembled or the stream is
/// interrupted.
pub async fn run(app: &AppContext, service_id: &str, execution_id: &str) -> Result<ExitCode> {
    let engine = app.engine()?;
    let result = if app.is_json() {
        follow(&engine, service_id, execution_id, &JsonSink).await
    } else {
        follow(&engine, service_id, execution_id, &app.terminal_sink()).await
    };
    finish_streamed(result, |()| Ok(()))
}
