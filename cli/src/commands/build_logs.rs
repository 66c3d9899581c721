//! `deckhand build-logs <build-id>`: follow a build's log stream.

use std::process::ExitCode;

use anyhow::Result;
use deckhand_common::BuildRecord;

use crate::app::{AppContext, LiveEngine};
use crate::application::ports::LogSink;
use crate::commands::{finish_streamed, until_interrupted};
use crate::output::JsonSink;

async fn follow(
    engine: &LiveEngine,
    build_id: &str,
    sink: &impl LogSink<BuildRecord>,
) -> Result<()> {
    until_interrupted(engine.stream_build_logs(build_id, sink)).await?
}

/// Run `deckhand build-logs`.
///
/// # Errors
///
/// Returns an error if the engine cannot be assembled or the stream is
/// interrupted.
pub async fn run(app: &AppContext, build_id: &str) -> Result<ExitCode> {
    let engine = app.engine()?;
    let result = if app.is_json() {
        follow(&engine, build_id, &JsonSink).await
    } else {
        follow(&engine, build_id, &app.terminal_sink()).await
    };
    finish_streamed(result, |()| Ok(()))
}
