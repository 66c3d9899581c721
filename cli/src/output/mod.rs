//! Output formatting module

pub mod human;
pub mod json;
pub mod progress;
pub mod sink;
pub mod styles;

use std::path::Path;

use anyhow::Result;
use console::Term;
use owo_colors::OwoColorize as _;
pub use human::HumanRenderer;
pub use json::JsonRenderer;
pub use sink::{JsonSink, TerminalSink};
pub use styles::Styles;

use crate::domain::config::DeckhandConfig;
use crate::domain::pipeline::PipelineExecutionSummary;
use crate::domain::service::{ServiceGroup, ServiceRecord};

/// Output context carrying styling and terminal state.
pub struct OutputContext {
    /// Stylesheet for colored output.
    pub styles: Styles,
    /// Whether stdout is a TTY.
    pub is_tty: bool,
    /// Whether to suppress non-error output.
    pub quiet: bool,
}

impl OutputContext {
    /// Create output context based on CLI flags and environment.
    #[must_use]
    pub fn new(no_color: bool, quiet: bool) -> Self {
        let is_tty = Term::stdout().is_term();
        let use_colors = !no_color && is_tty && std::env::var("NO_COLOR").is_err();

        let mut styles = Styles::default();
        if use_colors {
            styles.colorize();
        }

        Self {
            styles,
            is_tty,
            quiet,
        }
    }

    /// Check if progress indicators should be shown.
    #[must_use]
    pub fn show_progress(&self) -> bool {
        self.is_tty && !self.quiet
    }

    /// Print a step message prefixed with `→`. Suppressed when `quiet`.
    pub fn step(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "→".style(self.styles.step));
        }
    }

    /// Print a success message prefixed with `✓`. Suppressed when `quiet`.
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "✓".style(self.styles.success));
        }
    }

    /// Print a warning message prefixed with `!`. Suppressed when `quiet`.
    pub fn warn(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "!".style(self.styles.warning));
        }
    }

    /// Print an error message prefixed with `✗` to stderr. Never suppressed.
    pub fn error(&self, msg: &str) {
        eprintln!("  {} {msg}", "✗".style(self.styles.error));
    }

    /// Print an info message prefixed with `ℹ`. Suppressed when `quiet`.
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "ℹ".style(self.styles.info));
        }
    }

    /// Print a section header. Suppressed when `quiet`.
    pub fn header(&self, msg: &str) {
        if !self.quiet {
            println!("  {}", msg.style(self.styles.header));
        }
    }

    /// Print a key-value pair with the key dimmed. Suppressed when `quiet`.
    pub fn kv(&self, key: &str, value: &str) {
        if !self.quiet {
            println!("  {:<20} {value}", key.style(self.styles.dim));
        }
    }
}

/// Renderer selected by the output mode.
pub enum Renderer<'a> {
    Human(HumanRenderer<'a>),
    Json(JsonRenderer),
}

impl Renderer<'_> {
    pub fn render_version(&self, version: &str) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_version(version);
                Ok(())
            }
            Self::Json(_) => JsonRenderer::render_version(version),
        }
    }

    pub fn render_services(&self, records: &[ServiceRecord]) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_services(records);
                Ok(())
            }
            Self::Json(_) => JsonRenderer::render_services(records),
        }
    }

    pub fn render_service(&self, record: &ServiceRecord) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_service(record);
                Ok(())
            }
            Self::Json(_) => JsonRenderer::render_service(record),
        }
    }

    pub fn render_groups(&self, groups: &[ServiceGroup]) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_groups(groups);
                Ok(())
            }
            Self::Json(_) => JsonRenderer::render_groups(groups),
        }
    }

    pub fn render_group_created(&self, group: &ServiceGroup) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_group_created(group);
                Ok(())
            }
            Self::Json(_) => JsonRenderer::render_group(group),
        }
    }

    pub fn render_deployments(&self, executions: &[PipelineExecutionSummary]) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_deployments(executions);
                Ok(())
            }
            Self::Json(_) => JsonRenderer::render_deployments(executions),
        }
    }

    pub fn render_deploy_started(&self, service_id: &str, execution_id: &str) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_deploy_started(service_id, execution_id);
                Ok(())
            }
            Self::Json(_) => JsonRenderer::render_deploy_started(service_id, execution_id),
        }
    }

    pub fn render_operation(&self, verb: &str, id: &str) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_operation(verb, id);
                Ok(())
            }
            Self::Json(_) => JsonRenderer::render_operation(verb, id),
        }
    }

    pub fn render_config(&self, config: &DeckhandConfig, path: &Path) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_config(config, path);
                Ok(())
            }
            Self::Json(_) => JsonRenderer::render_config(config, path),
        }
    }
}
