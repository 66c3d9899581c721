//! Application service: pipeline executions of a registered service.

use anyhow::{Context, Result};
use tracing::info;

use crate::application::ports::{CloudApi, PipelineRef, ServiceRegistry};
use crate::domain::error::ServiceError;
use crate::domain::pipeline::{PipelineExecutionSummary, pipeline_name};
use crate::domain::service::{ServiceRecord, validate_service_id};

/// Look up a service of any kind.
///
/// # Errors
///
/// Returns a validation error for a malformed id and
/// [`ServiceError::NotFound`] if no service has it.
pub async fn find_service(registry: &impl ServiceRegistry, id: &str) -> Result<ServiceRecord> {
    validate_service_id(id)?;
    registry
        .read_by_id(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(id.to_string()).into())
}

/// Executions of the service's pipeline, newest first.
///
/// # Errors
///
/// Returns an error if the service does not exist or the pipeline API fails.
pub async fn list_deployments(
    registry: &impl ServiceRegistry,
    cloud: &impl CloudApi,
    pipeline_suffix: &str,
    service_id: &str,
) -> Result<Vec<PipelineExecutionSummary>> {
    let record = find_service(registry, service_id).await?;
    let service = record.service();
    let pipeline = pipeline_name(&service.name, pipeline_suffix);
    let creds = cloud.assume_role().await?;
    cloud
        .list_executions(
            &creds,
            PipelineRef {
                region: &service.region,
                name: &pipeline,
            },
        )
        .await
        .with_context(|| format!("failed to list executions of {pipeline}"))
}

/// Start a new execution of the service's pipeline. Returns its id.
///
/// # Errors
///
/// Returns an error if the service does not exist or the pipeline API fails.
pub async fn trigger_deploy(
    registry: &impl ServiceRegistry,
    cloud: &impl CloudApi,
    pipeline_suffix: &str,
    service_id: &str,
) -> Result<String> {
    let record = find_service(registry, service_id).await?;
    let service = record.service();
    let pipeline = pipeline_name(&service.name, pipeline_suffix);
    let creds = cloud.assume_role().await?;
    let execution_id = cloud
        .start_execution(
            &creds,
            PipelineRef {
                region: &service.region,
                name: &pipeline,
            },
        )
        .await
        .with_context(|| format!("failed to start {pipeline}"))?;
    info!(service_id, pipeline = %pipeline, execution_id = %execution_id, "deployment triggered");
    Ok(execution_id)
}
