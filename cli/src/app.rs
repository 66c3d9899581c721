//! Application context: unified state passed to every command handler.
//!
//! `AppContext` owns the output context, the config store and the
//! interaction flags. Engines are assembled from the loaded configuration
//! on demand, so commands that never touch the registry never open it.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::application::engine::{Engine, EngineSettings};
use crate::application::ports::ConfigStore;
use crate::application::services::config_service;
use crate::domain::config::DeckhandConfig;
use crate::domain::error::ConfigError;
use crate::domain::iac::{BackendConfig, Overrides};
use crate::infra::aws::AwsCli;
use crate::infra::command_runner::{DEFAULT_CMD_TIMEOUT, TokioCommandRunner};
use crate::infra::config::{YamlConfigStore, deckhand_home};
use crate::infra::iac::IacCli;
use crate::infra::registry::RedbRegistry;
use crate::infra::workspace::TempWorkspaces;
use crate::output::{HumanRenderer, JsonRenderer, OutputContext, Renderer, TerminalSink};

/// The engine wired to real processes, the on-disk registry and the cloud CLI.
pub type LiveEngine = Engine<
    IacCli<TokioCommandRunner>,
    TempWorkspaces,
    RedbRegistry,
    AwsCli<TokioCommandRunner>,
>;

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable terminal output (default).
    Human,
    /// Machine-readable JSON output.
    Json,
}

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Enable JSON output mode.
    pub json: bool,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    pub output: OutputFlags,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Output rendering mode (human vs JSON).
    pub mode: OutputMode,
    /// Configuration persistence.
    pub config_store: YamlConfigStore,
    /// When `true`, skip interactive prompts and use defaults.
    ///
    /// Set when the `CI` or `DECKHAND_YES` environment variables are present.
    pub non_interactive: bool,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    #[must_use]
    pub fn new(flags: &AppFlags) -> Self {
        let non_interactive = std::env::var("CI").is_ok() || std::env::var("DECKHAND_YES").is_ok();
        let mode = if flags.output.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        };
        Self {
            output: OutputContext::new(flags.output.no_color, flags.output.quiet),
            mode,
            config_store: YamlConfigStore::new(),
            non_interactive,
        }
    }

    /// Returns `true` when JSON output mode is active.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    /// Returns the appropriate `Renderer` variant for the current output mode.
    #[must_use]
    pub fn renderer(&self) -> Renderer<'_> {
        match self.mode {
            OutputMode::Human => Renderer::Human(HumanRenderer::new(&self.output)),
            OutputMode::Json => Renderer::Json(JsonRenderer),
        }
    }

    /// Terminal sink for human mode. JSON mode uses [`JsonSink`](crate::output::JsonSink).
    #[must_use]
    pub fn terminal_sink(&self) -> TerminalSink<'_> {
        TerminalSink::new(&self.output)
    }

    /// Ask the user for confirmation.
    ///
    /// When `non_interactive` is `true` (CI or `DECKHAND_YES` env), returns
    /// `default` immediately without prompting.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal prompt fails (e.g. no TTY available).
    pub fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        if self.non_interactive {
            return Ok(default);
        }
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()?;
        Ok(confirmed)
    }

    /// Engine for read-only and pipeline commands. Does not require the
    /// state backend to be configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be loaded or the registry
    /// cannot be opened.
    pub fn engine(&self) -> Result<LiveEngine> {
        let config = config_service::load_config(&self.config_store)?;
        let backend = BackendConfig {
            bucket: config.state.bucket.clone().unwrap_or_default(),
            region: state_region(&config).unwrap_or_default(),
        };
        build_engine(&config, backend)
    }

    /// Engine for create, update and delete. The state backend must be set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] for an unset `state.bucket` or state
    /// region, otherwise as [`AppContext::engine`].
    pub fn provisioning_engine(&self) -> Result<LiveEngine> {
        let config = config_service::load_config(&self.config_store)?;
        let backend = BackendConfig {
            bucket: config
                .state
                .bucket
                .clone()
                .ok_or(ConfigError::Missing("state.bucket"))?,
            region: state_region(&config).ok_or(ConfigError::Missing("state.region"))?,
        };
        build_engine(&config, backend)
    }
}

/// `state.region`, falling back to `aws.region`.
fn state_region(config: &DeckhandConfig) -> Option<String> {
    config
        .state
        .region
        .clone()
        .or_else(|| config.aws.region.clone())
}

fn build_engine(config: &DeckhandConfig, backend: BackendConfig) -> Result<LiveEngine> {
    let home = deckhand_home()?;
    let templates_dir = config
        .iac
        .templates_dir
        .as_ref()
        .map_or_else(|| home.join("templates"), PathBuf::from);
    let registry_path = config
        .registry
        .path
        .as_ref()
        .map_or_else(|| home.join("registry.redb"), PathBuf::from);

    let registry = RedbRegistry::open(&registry_path)
        .with_context(|| format!("cannot open registry at {}", registry_path.display()))?;
    let settings = EngineSettings {
        templates_dir,
        backend,
        overrides: Overrides {
            connection_arn: config.aws.connection_arn.clone(),
        },
        pipeline_suffix: config.pipeline.suffix.clone(),
    };
    Ok(Engine::new(
        IacCli::new(TokioCommandRunner::new(DEFAULT_CMD_TIMEOUT), &config.iac.binary),
        TempWorkspaces::new(),
        registry,
        AwsCli::new(TokioCommandRunner::new(DEFAULT_CMD_TIMEOUT), &config.aws),
        settings,
    ))
}
