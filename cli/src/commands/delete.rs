//! `deckhand delete <kind> <id> [--yes]`: destroy a service's infrastructure
//! and remove it from the registry.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use deckhand_common::{ProvisionRecord, ServiceKind};

use crate::app::{AppContext, LiveEngine};
use crate::application::ports::LogSink;
use crate::commands::{finish_streamed, until_interrupted};
use crate::output::JsonSink;

/// Arguments for the delete command.
#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Kind the service was created as
    #[arg(value_enum)]
    pub kind: ServiceKind,
    /// Service ID
    pub id: String,
    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

async fn delete(
    engine: &LiveEngine,
    args: &DeleteArgs,
    sink: &impl LogSink<ProvisionRecord>,
) -> Result<String> {
    until_interrupted(engine.delete_service(&args.id, args.kind, sink)).await?
}

/// Run `deckhand delete`.
///
/// # Errors
///
/// Returns an error if the prompt fails, the engine cannot be assembled or
/// the run is interrupted.
pub async fn run(app: &AppContext, args: &DeleteArgs) -> Result<ExitCode> {
    if !app.output.quiet && !app.is_json() {
        println!();
        println!(
            "This will destroy all infrastructure of {} {} and remove it from the registry.",
            args.kind, args.id
        );
        println!();
    }
    if !args.yes && !app.confirm("Continue?", false)? {
        println!("Cancelled.");
        return Ok(ExitCode::SUCCESS);
    }

    let engine = app.provisioning_engine()?;
    let result = if app.is_json() {
        delete(&engine, args, &JsonSink).await
    } else {
        delete(&engine, args, &app.terminal_sink()).await
    };
    finish_streamed(result, |id| app.renderer().render_operation("deleted", &id))
}
