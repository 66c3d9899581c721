//! `LogSink` implementations for the terminal and for `--json`.
//!
//! Records are written as they arrive. Subprocess stderr and failure lines
//! go to stderr; everything else to stdout.

use deckhand_common::{
    ActionExecutionDetail, BuildRecord, BuildSource, PipelineData,
    PipelineRecord, PipelineSource, ProvisionRecord, ProvisionSource, StreamEnd,
};
use owo_colors::OwoColorize as _;
use serde::Serialize;
use tracing::warn;

use crate::application::ports::LogSink;
use crate::output::{OutputContext, Styles};

/// Human-readable sink over an [`OutputContext`].
pub struct TerminalSink<'a> {
    ctx: &'a OutputContext,
}

impl<'a> TerminalSink<'a> {
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    fn relay(&self, line: &str) {
        if !self.ctx.quiet {
            println!("    {line}");
        }
    }

    fn relay_stderr(&self, line: &str) {
        if !self.ctx.quiet {
            eprintln!("    {}", line.style(self.ctx.styles.dim));
        }
    }
}

/// One aligned row of a pipeline snapshot.
#[must_use]
pub fn format_action(detail: &ActionExecutionDetail, styles: &Styles) -> String {
    let mut row = format!(
        "{:<14} {:<20} {:<11}",
        detail.stage_name,
        detail.action_name,
        detail
            .status
            .as_str()
            .style(styles.action(detail.status))
            .to_string(),
    );
    if let Some(build) = &detail.external_execution_id {
        row.push(' ');
        row.push_str(&build.style(styles.dim).to_string());
    }
    row.trim_end().to_string()
}

impl LogSink<ProvisionRecord> for TerminalSink<'_> {
    fn emit(&self, record: ProvisionRecord) {
        match record.source {
            ProvisionSource::Stdout => self.relay(&record.data),
            ProvisionSource::Stderr => self.relay_stderr(&record.data),
            ProvisionSource::SysInfo => self.ctx.step(&record.data),
            ProvisionSource::SysFailure => self.ctx.error(&record.data),
        }
    }

    fn end(&self, _end: StreamEnd) {}
}

impl LogSink<PipelineRecord> for TerminalSink<'_> {
    fn emit(&self, record: PipelineRecord) {
        match (record.source, record.data) {
            (PipelineSource::SysFailure, PipelineData::Message(msg)) => self.ctx.error(&msg),
            (_, PipelineData::Message(msg)) => self.ctx.step(&msg),
            (_, PipelineData::Actions(actions)) => {
                if self.ctx.quiet {
                    return;
                }
                println!();
                for action in &actions {
                    println!("    {}", format_action(action, &self.ctx.styles));
                }
            }
        }
    }

    fn end(&self, end: StreamEnd) {
        if end.is_success() {
            println!();
            self.ctx.success("Pipeline execution finished");
        }
    }
}

impl LogSink<BuildRecord> for TerminalSink<'_> {
    fn emit(&self, record: BuildRecord) {
        match record.source {
            BuildSource::BuildLogs => {
                if !self.ctx.quiet {
                    println!("{}", record.data);
                }
            }
            BuildSource::SysInfo => self.ctx.step(&record.data),
            BuildSource::SysFailure => self.ctx.error(&record.data),
        }
    }

    fn end(&self, _end: StreamEnd) {}
}

/// Newline-delimited JSON sink: one object per record, then the end marker.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSink;

impl JsonSink {
    fn write(value: &impl Serialize) {
        match serde_json::to_string(value) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!(error = %e, "cannot serialize record"),
        }
    }
}

impl<R: Serialize> LogSink<R> for JsonSink {
    fn emit(&self, record: R) {
        Self::write(&record);
    }

    fn end(&self, end: StreamEnd) {
        Self::write(&end);
    }
}
