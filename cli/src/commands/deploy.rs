//! `deckhand deploy <id>`: start a new pipeline execution.

use anyhow::Result;

use crate::app::AppContext;
use crate::output::progress;

/// Run `deckhand deploy`.
///
/// # Errors
///
/// Returns an error if the service is unknown or the pipeline API fails.
pub async fn run(app: &AppContext, service_id: &str) -> Result<()> {
    let engine = app.engine()?;
    let pb = progress::spinner(&app.output, "Starting deployment...");
    let started = engine.trigger_deploy(service_id).await;
    progress::finish_clear(&pb);
    let execution_id = started?;
    app.renderer()
        .render_deploy_started(service_id, &execution_id)
}
