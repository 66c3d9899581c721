//! Application service: build log streamer.

use anyhow::Result;
use deckhand_common::BuildRecord;
use tracing::{debug, warn};

use crate::application::ports::{CloudApi, LogSink};
use crate::application::session::RoleSession;
use crate::application::sink::{end_marker, failure_message};
use crate::domain::error::StreamError;
use crate::domain::pipeline::POLL_INTERVAL;

/// Relay a build's log lines until the build is complete and the log
/// stream has no further pages.
///
/// # Errors
///
/// Returns [`StreamError::Build`] if any upstream call fails. The sink has
/// already received a failure record and the terminal marker.
pub async fn stream_build_logs(
    cloud: &impl CloudApi,
    build_id: &str,
    sink: &impl LogSink<BuildRecord>,
) -> Result<()> {
    let result = poll(cloud, build_id, sink).await;
    if let Err(e) = &result {
        warn!(build_id, error = %failure_message(e), "build log poll failed");
        sink.emit(BuildRecord::failure(failure_message(e)));
    }
    sink.end(end_marker(&result));
    result.map_err(|e| StreamError::Build(failure_message(&e)).into())
}

async fn poll(cloud: &impl CloudApi, build_id: &str, sink: &impl LogSink<BuildRecord>) -> Result<()> {
    let mut session = RoleSession::start(cloud).await?;
    let mut token: Option<String> = None;
    let mut first = true;

    loop {
        let creds = session.credentials().await?;
        let build = cloud.get_build(creds, build_id).await?;
        if first && !build.build_complete {
            sink.emit(BuildRecord::info(format!("Build {build_id} in progress")));
        }
        first = false;

        let mut advanced = false;
        if let Some((group, stream)) = build.log_stream() {
            let page = cloud
                .get_log_events(creds, group, stream, token.as_deref())
                .await?;
            for event in page.events {
                sink.emit(BuildRecord::log(event.message.trim_end_matches(['\r', '\n'])));
            }
            if let Some(next) = page.next_forward_token {
                if token.as_deref() != Some(next.as_str()) {
                    token = Some(next);
                    advanced = true;
                }
            }
        }

        debug!(build_id, complete = build.build_complete, advanced, "build polled");
        if build.build_complete && !advanced {
            return Ok(());
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}
