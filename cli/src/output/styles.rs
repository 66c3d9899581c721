//! Output styles using owo-colors stylesheet pattern

use deckhand_common::{ActionStatus, PipelineExecutionStatus};
use owo_colors::Style;

/// Centralized stylesheet for CLI output colors.
///
/// Every field is a no-op style until [`Styles::colorize`] is called, so
/// `NO_COLOR` and non-terminal output need no special casing at call sites.
#[derive(Default, Clone)]
pub struct Styles {
    pub success: Style,
    pub warning: Style,
    pub error: Style,
    pub info: Style,
    /// Secondary text and relayed subprocess stderr
    pub dim: Style,
    pub bold: Style,
    pub header: Style,
    /// Orchestrator steps and in-flight statuses
    pub step: Style,
}

impl Styles {
    /// Apply colors to the stylesheet.
    pub fn colorize(&mut self) {
        *self = Self {
            success: Style::new().green(),
            warning: Style::new().yellow(),
            error: Style::new().red(),
            info: Style::new().blue(),
            dim: Style::new().dimmed(),
            bold: Style::new().bold(),
            header: Style::new().bold().cyan(),
            step: Style::new().cyan(),
        };
    }

    /// Style for one action's status in a pipeline snapshot.
    #[must_use]
    pub fn action(&self, status: ActionStatus) -> Style {
        match status {
            ActionStatus::Succeeded => self.success,
            ActionStatus::Failed | ActionStatus::Abandoned => self.error,
            ActionStatus::InProgress => self.step,
            ActionStatus::Unknown => self.dim,
        }
    }

    /// Style for a whole execution in the deployments table.
    #[must_use]
    pub fn execution(&self, status: PipelineExecutionStatus) -> Style {
        match status {
            PipelineExecutionStatus::Succeeded => self.success,
            PipelineExecutionStatus::Failed => self.error,
            PipelineExecutionStatus::Cancelled
            | PipelineExecutionStatus::Stopped
            | PipelineExecutionStatus::Superseded => self.warning,
            PipelineExecutionStatus::InProgress | PipelineExecutionStatus::Stopping => self.step,
            PipelineExecutionStatus::Unknown => self.dim,
        }
    }
}
