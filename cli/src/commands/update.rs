//! `deckhand update`: re-provision a service with changed fields.
//!
//! Omitted flags keep the stored value. Name and region cannot change.

use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Subcommand};
use deckhand_common::ProvisionRecord;

use crate::app::{AppContext, LiveEngine};
use crate::application::ports::LogSink;
use crate::commands::{finish_streamed, until_interrupted};
use crate::domain::payload::{ServiceChanges, UpdatePayload, UpdateServer, UpdateStaticSite};

#[derive(Args, Debug, Clone)]
pub struct ChangeArgs {
    /// Source repository as owner/name
    #[arg(long = "repo")]
    pub repo_id: Option<String>,
    /// Branch the pipeline builds from
    #[arg(long = "branch")]
    pub branch_name: Option<String>,
    /// Directory inside the repository to build
    #[arg(long)]
    pub root_dir: Option<String>,
    /// Group to file the service under
    #[arg(long = "group")]
    pub group_id: Option<String>,
}

impl From<ChangeArgs> for ServiceChanges {
    fn from(args: ChangeArgs) -> Self {
        Self {
            repo_id: args.repo_id,
            branch_name: args.branch_name,
            root_dir: args.root_dir,
            group_id: args.group_id,
        }
    }
}

#[derive(Args, Debug)]
pub struct StaticSiteArgs {
    /// Service ID
    pub id: String,
    #[command(flatten)]
    pub changes: ChangeArgs,
    #[arg(long)]
    pub build_command: Option<String>,
    #[arg(long = "publish-dir")]
    pub publish_directory: Option<String>,
    #[arg(long)]
    pub custom_domain: Option<String>,
    #[arg(long = "tls-cert")]
    pub tls_cert_ref: Option<String>,
}

#[derive(Args, Debug)]
pub struct ServerArgs {
    /// Service ID
    pub id: String,
    #[command(flatten)]
    pub changes: ChangeArgs,
    #[arg(long = "port")]
    pub container_port: Option<u16>,
    #[arg(long)]
    pub instance_size: Option<String>,
    #[arg(long = "dockerfile")]
    pub dockerfile_path: Option<String>,
}

/// Update subcommands, one per kind.
#[derive(Subcommand, Debug)]
pub enum UpdateCommand {
    /// Update a static site
    StaticSite(StaticSiteArgs),
    /// Update a server
    Server(ServerArgs),
}

impl UpdateCommand {
    /// Split into the target id and the payload.
    fn into_parts(self) -> (String, UpdatePayload) {
        match self {
            Self::StaticSite(args) => (
                args.id,
                UpdatePayload::StaticSite(UpdateStaticSite {
                    service: args.changes.into(),
                    build_command: args.build_command,
                    publish_directory: args.publish_directory,
                    custom_domain: args.custom_domain,
                    tls_cert_ref: args.tls_cert_ref,
                }),
            ),
            Self::Server(args) => (
                args.id,
                UpdatePayload::Server(UpdateServer {
                    service: args.changes.into(),
                    container_port: args.container_port,
                    instance_size: args.instance_size,
                    dockerfile_path: args.dockerfile_path,
                }),
            ),
        }
    }
}

async fn update(
    engine: &LiveEngine,
    id: &str,
    payload: &UpdatePayload,
    sink: &impl LogSink<ProvisionRecord>,
) -> Result<String> {
    until_interrupted(engine.update_service(id, payload, sink)).await?
}

/// Run `deckhand update`.
///
/// # Errors
///
/// Returns an error if the engine cannot be assembled or the run is interrupted.
pub async fn run(app: &AppContext, cmd: UpdateCommand) -> Result<ExitCode> {
    let (id, payload) = cmd.into_parts();
    let engine = app.provisioning_engine()?;
    let result = if app.is_json() {
        update(&engine, &id, &payload, &crate::output::JsonSink).await
    } else {
        update(&engine, &id, &payload, &app.terminal_sink()).await
    };
    finish_streamed(result, |id| app.renderer().render_operation("updated", &id))
}
