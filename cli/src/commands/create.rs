//! `deckhand create`: provision and register a new service.

use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Subcommand};
use deckhand_common::ProvisionRecord;

use crate::app::{AppContext, LiveEngine};
use crate::application::ports::LogSink;
use crate::commands::{finish_streamed, until_interrupted};
use crate::domain::payload::{CreatePayload, CreateServer, CreateStaticSite, NewService};
use crate::output::JsonSink;

/// Fields shared by both kinds.
#[derive(Args, Debug, Clone)]
pub struct NewServiceArgs {
    /// Unique service name (lowercase letters, digits and dashes)
    #[arg(long)]
    pub name: String,
    /// Region to deploy into, e.g. eu-west-1
    #[arg(long)]
    pub region: String,
    /// Source repository as owner/name
    #[arg(long = "repo")]
    pub repo_id: String,
    /// Branch the pipeline builds from
    #[arg(long = "branch", default_value = "main")]
    pub branch_name: String,
    /// Directory inside the repository to build
    #[arg(long, default_value = ".")]
    pub root_dir: String,
    /// Group to file the service under
    #[arg(long = "group")]
    pub group_id: Option<String>,
}

impl From<NewServiceArgs> for NewService {
    fn from(args: NewServiceArgs) -> Self {
        Self {
            name: args.name,
            region: args.region,
            repo_id: args.repo_id,
            branch_name: args.branch_name,
            root_dir: args.root_dir,
            group_id: args.group_id,
        }
    }
}

#[derive(Args, Debug)]
pub struct StaticSiteArgs {
    #[command(flatten)]
    pub service: NewServiceArgs,
    /// Command that produces the site
    #[arg(long)]
    pub build_command: String,
    /// Directory the build writes the site to
    #[arg(long = "publish-dir")]
    pub publish_directory: String,
    /// Custom domain served in addition to the CDN domain
    #[arg(long)]
    pub custom_domain: Option<String>,
    /// Certificate reference for the custom domain
    #[arg(long = "tls-cert")]
    pub tls_cert_ref: Option<String>,
}

#[derive(Args, Debug)]
pub struct ServerArgs {
    #[command(flatten)]
    pub service: NewServiceArgs,
    /// Port the container listens on
    #[arg(long = "port")]
    pub container_port: u16,
    /// Compute size of the container task
    #[arg(long, default_value = "small")]
    pub instance_size: String,
    /// Dockerfile path relative to the root dir
    #[arg(long = "dockerfile", default_value = "Dockerfile")]
    pub dockerfile_path: String,
}

/// Create subcommands, one per kind.
#[derive(Subcommand, Debug)]
pub enum CreateCommand {
    /// Static site served from a CDN
    StaticSite(StaticSiteArgs),
    /// Containerized server behind a load balancer
    Server(ServerArgs),
}

impl From<CreateCommand> for CreatePayload {
    fn from(cmd: CreateCommand) -> Self {
        match cmd {
            CreateCommand::StaticSite(args) => Self::StaticSite(CreateStaticSite {
                service: args.service.into(),
                build_command: args.build_command,
                publish_directory: args.publish_directory,
                custom_domain: args.custom_domain,
                tls_cert_ref: args.tls_cert_ref,
            }),
            CreateCommand::Server(args) => Self::Server(CreateServer {
                service: args.service.into(),
                container_port: args.container_port,
                instance_size: args.instance_size,
                dockerfile_path: args.dockerfile_path,
            }),
        }
    }
}

async fn create(
    engine: &LiveEngine,
    payload: &CreatePayload,
    sink: &impl LogSink<ProvisionRecord>,
) -> Result<String> {
    until_interrupted(engine.create_service(payload, sink)).await?
}

/// Run `deckhand create`.
///
/// # Errors
///
/// Returns an error if the engine cannot be assembled or the run is
/// interrupted. Failures inside the run are reported through the record
/// stream and yield a failure exit code.
pub async fn run(app: &AppContext, cmd: CreateCommand) -> Result<ExitCode> {
    let payload = CreatePayload::from(cmd);
    let engine = app.provisioning_engine()?;
    let result = if app.is_json() {
        create(&engine, &payload, &JsonSink).await
    } else {
        create(&engine, &payload, &app.terminal_sink()).await
    };
    finish_streamed(result, |id| app.renderer().render_operation("created", &id))
}
