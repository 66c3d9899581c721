//! CLI argument parsing with clap derive

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, AppFlags, OutputFlags};
use crate::commands;

/// Provision, track and tear down static sites and servers
#[derive(Parser, Debug)]
#[command(
    name = "deckhand",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(
        long,
        global = true,
        env = "NO_COLOR",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Provision and register a new service
    #[command(subcommand)]
    Create(commands::create::CreateCommand),

    /// Re-provision a service with changed settings
    #[command(subcommand)]
    Update(commands::update::UpdateCommand),

    /// Destroy a service and remove it from the registry
    Delete(commands::delete::DeleteArgs),

    /// List registered services
    List(commands::list::ListArgs),

    /// Show one service
    Show {
        /// Service ID
        id: String,
    },

    /// Manage service groups
    #[command(subcommand)]
    Groups(commands::groups::GroupsCommand),

    /// List recent deployments of a service
    Deployments {
        /// Service ID
        id: String,
    },

    /// Start a new deployment of a service
    Deploy {
        /// Service ID
        id: String,
    },

    /// Follow a deployment until it completes
    PipelineStatus {
        /// Service ID
        id: String,
        /// Pipeline execution ID
        execution_id: String,
    },

    /// Follow the log stream of a build
    BuildLogs {
        /// Build ID
        build_id: String,
    },

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),

    /// Show version
    Version,
}

impl Cli {
    /// Whether `--json` was given; errors are then reported as JSON too.
    #[must_use]
    pub fn json(&self) -> bool {
        self.json
    }

    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails before its record stream starts,
    /// or if a streamed command is interrupted.
    pub async fn run(self) -> Result<ExitCode> {
        let Cli {
            no_color,
            quiet,
            json,
            command,
        } = self;
        let app = AppContext::new(&AppFlags {
            output: OutputFlags {
                no_color,
                quiet,
                json,
            },
        });

        match command {
            Command::Create(cmd) => commands::create::run(&app, cmd).await,
            Command::Update(cmd) => commands::update::run(&app, cmd).await,
            Command::Delete(args) => commands::delete::run(&app, &args).await,
            Command::List(args) => done(commands::list::run(&app, args).await),
            Command::Show { id } => done(commands::show::run(&app, &id).await),
            Command::Groups(cmd) => done(commands::groups::run(&app, cmd).await),
            Command::Deployments { id } => done(commands::deployments::run(&app, &id).await),
            Command::Deploy { id } => done(commands::deploy::run(&app, &id).await),
            Command::PipelineStatus { id, execution_id } => {
                commands::pipeline_status::run(&app, &id, &execution_id).await
            }
            Command::BuildLogs { build_id } => commands::build_logs::run(&app, &build_id).await,
            Command::Config(cmd) => commands::config::run(&app, cmd),
            Command::Version => done(commands::version::run(&app)),
        }
    }
}

fn done(result: Result<()>) -> Result<ExitCode> {
    result.map(|()| ExitCode::SUCCESS)
}
