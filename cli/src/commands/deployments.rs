//! `deckhand deployments <id>`: recent executions of a service's pipeline.

use anyhow::Result;

use crate::app::AppContext;
use crate::output::progress;

/// Run `deckhand deployments`.
///
/// # Errors
///
/// Returns an error if the service is unknown or the pipeline API fails.
pub async fn run(app: &AppContext, service_id: &str) -> Result<()> {
    let engine = app.engine()?;
    let pb = progress::spinner(&app.output, "Fetching deployments...");
    let executions = engine.list_deployments(service_id).await;
    progress::finish_clear(&pb);
    app.renderer().render_deployments(&executions?)
}
