//! The operation surface: orchestration, streaming and deployments behind
//! one facade with a single-flight guard on every mutating operation.

use anyhow::Result;
use deckhand_common::{BuildRecord, PipelineRecord, ProvisionRecord, ServiceKind};

use crate::application::ports::{
    CloudApi, IacRunner, LogSink, PipelineRef, ServiceRegistry, Workspaces,
};
use crate::application::services::provisioning::{Orchestrator, ProvisioningSettings};
use crate::application::services::{build_logs, deployments, pipeline_status};
use crate::application::single_flight::{FlightGuard, Operation, OperationKey, SingleFlight};
use crate::application::sink::{FailureRecord, reject};
use crate::domain::error::ServiceError;
use crate::domain::payload::{CreatePayload, UpdatePayload};
use crate::domain::pipeline::{PipelineExecutionSummary, pipeline_name};
use crate::domain::service::{ServiceFilter, ServiceGroup, ServiceRecord, validate_name};

pub type EngineSettings = ProvisioningSettings;

pub struct Engine<I, W, R, C> {
    iac: I,
    workspaces: W,
    registry: R,
    cloud: C,
    settings: EngineSettings,
    flights: SingleFlight,
}

impl<I, W, R, C> Engine<I, W, R, C>
where
    I: IacRunner,
    W: Workspaces,
    R: ServiceRegistry,
    C: CloudApi,
{
    pub fn new(iac: I, workspaces: W, registry: R, cloud: C, settings: EngineSettings) -> Self {
        Self {
            iac,
            workspaces,
            registry,
            cloud,
            settings,
            flights: SingleFlight::new(),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &R {
        &self.registry
    }

    #[must_use]
    pub fn flights(&self) -> &SingleFlight {
        &self.flights
    }

    fn orchestrator(&self) -> Orchestrator<'_, I, W, R, C> {
        Orchestrator {
            iac: &self.iac,
            workspaces: &self.workspaces,
            registry: &self.registry,
            cloud: &self.cloud,
            settings: &self.settings,
        }
    }

    fn acquire<Rec: FailureRecord>(
        &self,
        key: OperationKey,
        sink: &impl LogSink<Rec>,
    ) -> Result<FlightGuard<'_>> {
        let err = ServiceError::OperationInProgress {
            operation: key.operation.to_string(),
            target: key.target.clone(),
        };
        self.flights
            .acquire(key)
            .ok_or_else(|| reject(sink, err.into()))
    }

    // ── Provisioning ──────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Fails if a create for the same name is in flight or any step fails.
    pub async fn create_service(
        &self,
        payload: &CreatePayload,
        sink: &impl LogSink<ProvisionRecord>,
    ) -> Result<String> {
        let _flight = self.acquire(OperationKey::new(Operation::Create, payload.name()), sink)?;
        self.orchestrator().create_service(payload, sink).await
    }

    /// # Errors
    ///
    /// Fails if an update of the same service is in flight or any step fails.
    pub async fn update_service(
        &self,
        id: &str,
        payload: &UpdatePayload,
        sink: &impl LogSink<ProvisionRecord>,
    ) -> Result<String> {
        let _flight = self.acquire(OperationKey::new(Operation::Update, id), sink)?;
        self.orchestrator().update_service(id, payload, sink).await
    }

    /// # Errors
    ///
    /// Fails if a delete of the same service is in flight or any step fails.
    pub async fn delete_service(
        &self,
        id: &str,
        kind: ServiceKind,
        sink: &impl LogSink<ProvisionRecord>,
    ) -> Result<String> {
        let _flight = self.acquire(OperationKey::new(Operation::Delete, id), sink)?;
        self.orchestrator().delete_service(id, kind, sink).await
    }

    // ── Deployments ───────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Fails if the service does not exist or the pipeline API fails.
    pub async fn list_deployments(&self, service_id: &str) -> Result<Vec<PipelineExecutionSummary>> {
        deployments::list_deployments(
            &self.registry,
            &self.cloud,
            &self.settings.pipeline_suffix,
            service_id,
        )
        .await
    }

    /// # Errors
    ///
    /// Fails if the service does not exist or the pipeline API fails.
    pub async fn trigger_deploy(&self, service_id: &str) -> Result<String> {
        deployments::trigger_deploy(
            &self.registry,
            &self.cloud,
            &self.settings.pipeline_suffix,
            service_id,
        )
        .await
    }

    // ── Streaming ─────────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Fails if the service does not exist or an upstream call fails.
    pub async fn stream_pipeline_status(
        &self,
        service_id: &str,
        execution_id: &str,
        sink: &impl LogSink<PipelineRecord>,
    ) -> Result<()> {
        let record = match deployments::find_service(&self.registry, service_id).await {
            Ok(record) => record,
            Err(e) => return Err(reject(sink, e)),
        };
        let service = record.service();
        let name = pipeline_name(&service.name, &self.settings.pipeline_suffix);
        let pipeline = PipelineRef {
            region: &service.region,
            name: &name,
        };
        pipeline_status::stream_pipeline_status(&self.cloud, pipeline, execution_id, sink).await
    }

    /// # Errors
    ///
    /// Fails if an upstream call fails.
    pub async fn stream_build_logs(
        &self,
        build_id: &str,
        sink: &impl LogSink<BuildRecord>,
    ) -> Result<()> {
        build_logs::stream_build_logs(&self.cloud, build_id, sink).await
    }

    // ── Registry reads ────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Fails if the registry cannot be read.
    pub async fn list_services(&self, filter: &ServiceFilter) -> Result<Vec<ServiceRecord>> {
        self.registry.read_by_filter(filter).await
    }

    /// # Errors
    ///
    /// Fails if the id is malformed or unknown.
    pub async fn show_service(&self, id: &str) -> Result<ServiceRecord> {
        deployments::find_service(&self.registry, id).await
    }

    /// # Errors
    ///
    /// Fails if the name is invalid or already taken.
    pub async fn create_group(&self, name: &str) -> Result<ServiceGroup> {
        validate_name(name)?;
        self.registry.create_group(name).await
    }

    /// # Errors
    ///
    /// Fails if the registry cannot be read.
    pub async fn list_groups(&self) -> Result<Vec<ServiceGroup>> {
        self.registry.list_groups().await
    }
}
