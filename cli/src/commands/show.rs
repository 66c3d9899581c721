//! `deckhand show <id>`

use anyhow::Result;

use crate::app::AppContext;

/// Run `deckhand show`.
///
/// # Errors
///
/// Returns an error if the id is malformed or no such service exists.
pub async fn run(app: &AppContext, id: &str) -> Result<()> {
    let engine = app.engine()?;
    let record = engine.show_service(id).await?;
    app.renderer().render_service(&record)
}
