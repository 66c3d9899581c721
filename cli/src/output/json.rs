//! JSON output helpers.
//!
//! Pretty-printed documents for one-shot commands and the error object used
//! by every `--json` code path when a command fails. Streamed records are
//! written one per line by [`JsonSink`](crate::output::JsonSink).

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::commands::Interrupted;
use crate::domain::config::DeckhandConfig;
use crate::domain::error::{
    ConfigError, ProcessError, ProvisioningError, RegistryError, ServiceError, StreamError,
    UpstreamError, ValidationError,
};
use crate::domain::pipeline::PipelineExecutionSummary;
use crate::domain::service::{ServiceGroup, ServiceRecord};

/// Format a JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

/// Stable error code for the `code` field of [`format_error`].
#[must_use]
pub fn error_code(err: &anyhow::Error) -> &'static str {
    if err.is::<ValidationError>() {
        "validation"
    } else if let Some(e) = err.downcast_ref::<ServiceError>() {
        match e {
            ServiceError::OperationInProgress { .. } => "in_progress",
            ServiceError::NotFound(_) | ServiceError::NotFoundAsKind { .. } => "not_found",
        }
    } else if let Some(e) = err.downcast_ref::<RegistryError>() {
        match e {
            RegistryError::Conflict { .. } => "conflict",
            RegistryError::NotFound(_) | RegistryError::UnknownGroup(_) => "not_found",
            _ => "registry",
        }
    } else if err.is::<ProvisioningError>() || err.is::<ProcessError>() {
        "provisioning"
    } else if err.is::<UpstreamError>() || err.is::<StreamError>() {
        "upstream"
    } else if err.is::<ConfigError>() {
        "config"
    } else if err.is::<Interrupted>() {
        "interrupted"
    } else {
        "internal"
    }
}

/// Serialized form of a record with the server's shared secret removed.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn redacted(record: &ServiceRecord) -> Result<serde_json::Value> {
    let mut value = serde_json::to_value(record).context("JSON serialization failed")?;
    if let Some(attributes) = value
        .get_mut("attributes")
        .and_then(serde_json::Value::as_object_mut)
    {
        attributes.remove("shared_secret");
    }
    Ok(value)
}

fn print_pretty(value: &impl Serialize) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("JSON serialization failed")?
    );
    Ok(())
}

/// Renders domain types as JSON documents on stdout.
pub struct JsonRenderer;

impl JsonRenderer {
    pub fn render_version(version: &str) -> Result<()> {
        print_pretty(&serde_json::json!({ "version": version }))
    }

    pub fn render_services(records: &[ServiceRecord]) -> Result<()> {
        let values = records.iter().map(redacted).collect::<Result<Vec<_>>>()?;
        print_pretty(&values)
    }

    pub fn render_service(record: &ServiceRecord) -> Result<()> {
        print_pretty(&redacted(record)?)
    }

    pub fn render_groups(groups: &[ServiceGroup]) -> Result<()> {
        print_pretty(&groups)
    }

    pub fn render_group(group: &ServiceGroup) -> Result<()> {
        print_pretty(group)
    }

    pub fn render_deployments(executions: &[PipelineExecutionSummary]) -> Result<()> {
        print_pretty(&executions)
    }

    pub fn render_deploy_started(service_id: &str, execution_id: &str) -> Result<()> {
        print_pretty(&serde_json::json!({
            "serviceId": service_id,
            "pipelineExecutionId": execution_id,
        }))
    }

    /// Closing line of a provisioning run, after the record stream.
    pub fn render_operation(verb: &str, id: &str) -> Result<()> {
        let line = serde_json::json!({ "id": id, "result": verb });
        println!("{line}");
        Ok(())
    }

    pub fn render_config(config: &DeckhandConfig, path: &Path) -> Result<()> {
        print_pretty(&serde_json::json!({
            "path": path.display().to_string(),
            "config": config,
        }))
    }
}
