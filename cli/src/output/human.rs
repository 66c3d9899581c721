//! Human-readable terminal renderer.

use std::path::Path;

use chrono::{DateTime, Utc};
use owo_colors::OwoColorize as _;

use crate::domain::config::{DeckhandConfig, VALID_CONFIG_KEYS};
use crate::domain::pipeline::PipelineExecutionSummary;
use crate::domain::service::{ServiceGroup, ServiceRecord};
use crate::output::OutputContext;

/// Renders domain types as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() { "-" } else { value }
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Render the CLI version information.
    pub fn render_version(&self, version: &str) {
        println!("deckhand {version}");
    }

    /// Render a table of services.
    pub fn render_services(&self, records: &[ServiceRecord]) {
        if records.is_empty() {
            if !self.ctx.quiet {
                println!("No services found. Create one: deckhand create static-site --help");
            }
            return;
        }
        println!(
            "  {:<22} {:<20} {:<12} {:<14} {}",
            "ID".style(self.ctx.styles.bold),
            "NAME".style(self.ctx.styles.bold),
            "KIND".style(self.ctx.styles.bold),
            "REGION".style(self.ctx.styles.bold),
            "DOMAIN".style(self.ctx.styles.bold),
        );
        for record in records {
            let s = record.service();
            println!(
                "  {:<22} {:<20} {:<12} {:<14} {}",
                s.id,
                s.name,
                s.kind,
                s.region,
                or_dash(&s.public_domain_name)
            );
        }
    }

    /// Render one service with its attribute row. Secrets are never shown.
    pub fn render_service(&self, record: &ServiceRecord) {
        let s = record.service();
        println!();
        self.ctx.header(&format!("{} ({})", s.name, s.kind));
        println!();
        self.ctx.kv("ID:", &s.id);
        self.ctx.kv("Region:", &s.region);
        self.ctx.kv("Repository:", &format!("{}@{}", s.repo_id, s.branch_name));
        self.ctx.kv("Root dir:", &s.root_dir);
        self.ctx.kv("Domain:", or_dash(&s.public_domain_name));
        self.ctx.kv("Group:", s.group_id.as_deref().unwrap_or("-"));
        self.ctx.kv("Created:", &timestamp(s.created_at));
        self.ctx.kv("Updated:", &timestamp(s.updated_at));
        match record {
            ServiceRecord::StaticSite { attributes, .. } => {
                self.ctx.kv("Build command:", &attributes.build_command);
                self.ctx.kv("Publish dir:", &attributes.publish_directory);
                if let Some(domain) = &attributes.custom_domain {
                    self.ctx.kv("Custom domain:", domain);
                }
            }
            ServiceRecord::Server { attributes, .. } => {
                self.ctx
                    .kv("Container port:", &attributes.container_port.to_string());
                self.ctx.kv("Instance size:", &attributes.instance_size);
                self.ctx.kv("Dockerfile:", &attributes.dockerfile_path);
            }
        }
        println!();
    }

    pub fn render_groups(&self, groups: &[ServiceGroup]) {
        if groups.is_empty() {
            if !self.ctx.quiet {
                println!("No groups. Create one: deckhand groups create <name>");
            }
            return;
        }
        for group in groups {
            println!("  {:<22} {}", group.id, group.name);
        }
    }

    pub fn render_group_created(&self, group: &ServiceGroup) {
        self.ctx
            .success(&format!("Group {} created ({})", group.name, group.id));
    }

    /// Render a pipeline's recent executions, newest first as returned.
    pub fn render_deployments(&self, executions: &[PipelineExecutionSummary]) {
        if executions.is_empty() {
            if !self.ctx.quiet {
                println!("No deployments yet. Start one: deckhand deploy <id>");
            }
            return;
        }
        for execution in executions {
            let started = execution
                .start_time
                .map_or_else(|| "-".to_string(), timestamp);
            let status = format!("{:<12}", execution.status.as_str());
            println!(
                "  {:<38} {} {}",
                execution.pipeline_execution_id,
                status.style(self.ctx.styles.execution(execution.status)),
                started.style(self.ctx.styles.dim)
            );
        }
    }

    pub fn render_deploy_started(&self, service_id: &str, execution_id: &str) {
        self.ctx.success(&format!("Deployment started: {execution_id}"));
        self.ctx.info(&format!(
            "Follow it: deckhand pipeline-status {service_id} {execution_id}"
        ));
    }

    /// Closing line of a provisioning run.
    pub fn render_operation(&self, verb: &str, id: &str) {
        self.ctx.success(&format!("Service {id} {verb}"));
    }

    /// Render the current configuration.
    pub fn render_config(&self, config: &DeckhandConfig, path: &Path) {
        println!();
        println!(
            "  {}",
            format!("Configuration ({})", path.display()).style(self.ctx.styles.header)
        );
        println!();
        for key in VALID_CONFIG_KEYS {
            let value = config.get(key).unwrap_or_else(|| "(not set)".to_string());
            println!("  {:<20} {value}", format!("{key}:"));
        }
        println!();
        println!("  {}", "Environment:".style(self.ctx.styles.bold));
        for var in ["DECKHAND_CONFIG", "DECKHAND_HOME", "NO_COLOR"] {
            println!(
                "    {:<18} {}",
                format!("{var}:"),
                std::env::var(var).unwrap_or_else(|_| "(not set)".to_string())
            );
        }
        println!();
    }
}
