//! Application service: deployment orchestration.
//!
//! Drives one provisioning run per call:
//! `STAGE → INIT → APPLY|DESTROY → COLLECT_OUTPUTS → PERSIST → RETRIGGER → CLEANUP`.
//! Imports only from `crate::domain` and `crate::application`. All I/O is
//! routed through injected port traits.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use deckhand_common::{ProvisionRecord, ServiceKind};
use tracing::{debug, info, warn};

use crate::application::ports::{
    CloudApi, IacRunner, LogSink, OutputLine, PipelineRef, ServiceRegistry, Workspaces,
};
use crate::application::sink::{end_marker, failure_message, reject};
use crate::domain::error::ServiceError;
use crate::domain::iac::{
    BackendConfig, OUTPUT_ARGS, Overrides, TemplateVars, apply_args, destroy_args,
    parse_public_domain, server_vars, static_site_vars,
};
use crate::domain::payload::{CreatePayload, UpdatePayload, merge_server, merge_static_site};
use crate::domain::pipeline::pipeline_name;
use crate::domain::service::{
    ServerAttributes, ServiceInput, ServiceRecord, StaticSiteAttributes, generate_shared_secret,
    validate_service_id,
};

/// Static inputs of every provisioning run.
#[derive(Debug, Clone)]
pub struct ProvisioningSettings {
    /// Holds one template directory per kind, named after the kind.
    pub templates_dir: PathBuf,
    pub backend: BackendConfig,
    pub overrides: Overrides,
    pub pipeline_suffix: String,
}

impl ProvisioningSettings {
    #[must_use]
    pub fn template(&self, kind: ServiceKind) -> PathBuf {
        self.templates_dir.join(kind.as_str())
    }
}

/// The ports one orchestration needs, borrowed for the call.
pub struct Orchestrator<'a, I, W, R, C> {
    pub iac: &'a I,
    pub workspaces: &'a W,
    pub registry: &'a R,
    pub cloud: &'a C,
    pub settings: &'a ProvisioningSettings,
}

/// A staged workspace. Destroyed exactly once, when dropped.
struct StagedWorkspace<'w, W: Workspaces> {
    workspaces: &'w W,
    dir: PathBuf,
}

impl<W: Workspaces> StagedWorkspace<'_, W> {
    fn dir(&self) -> &Path {
        &self.dir
    }
}

impl<W: Workspaces> Drop for StagedWorkspace<'_, W> {
    fn drop(&mut self) {
        debug!(dir = %self.dir.display(), "destroying workspace");
        self.workspaces.destroy(&self.dir);
    }
}

fn not_reconciled(name: &str, action: &str) -> String {
    format!(
        "infrastructure for '{name}' was {action} but the registry was not updated; \
         reconcile manually"
    )
}

fn not_found_as(id: &str, kind: ServiceKind) -> anyhow::Error {
    ServiceError::NotFoundAsKind {
        id: id.to_string(),
        kind,
    }
    .into()
}

impl<'a, I, W, R, C> Orchestrator<'a, I, W, R, C>
where
    I: IacRunner,
    W: Workspaces,
    R: ServiceRegistry,
    C: CloudApi,
{
    // ── Operations ────────────────────────────────────────────────────────────

    /// Provision a new service and register it. Returns the new service id.
    ///
    /// # Errors
    ///
    /// Returns the first failing step's error. The sink has already received
    /// the matching failure record and terminal marker.
    pub async fn create_service(
        &self,
        payload: &CreatePayload,
        sink: &impl LogSink<ProvisionRecord>,
    ) -> Result<String> {
        if let Err(e) = payload.validate() {
            return Err(reject(sink, e));
        }
        info!(name = payload.name(), kind = %payload.kind(), "create started");
        let workspace = self.stage(payload.kind(), sink).await?;
        let result = self.create_steps(payload, workspace.dir(), sink).await;
        Self::finish(workspace, result, sink)
    }

    /// Re-provision an existing service with merged fields, persist the
    /// result and re-trigger its pipeline. Returns the service id.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFoundAsKind`] if `id` is not a service of
    /// the payload's kind, otherwise the first failing step's error.
    pub async fn update_service(
        &self,
        id: &str,
        payload: &UpdatePayload,
        sink: &impl LogSink<ProvisionRecord>,
    ) -> Result<String> {
        if let Err(e) = validate_service_id(id).and_then(|()| payload.validate()) {
            return Err(reject(sink, e));
        }
        info!(id, kind = %payload.kind(), "update started");
        let workspace = self.stage(payload.kind(), sink).await?;
        let result = self.update_steps(id, payload, workspace.dir(), sink).await;
        Self::finish(workspace, result, sink)
    }

    /// Tear down a service's infrastructure and remove it from the registry.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFoundAsKind`] if `id` is not a service of
    /// `kind`, otherwise the first failing step's error.
    pub async fn delete_service(
        &self,
        id: &str,
        kind: ServiceKind,
        sink: &impl LogSink<ProvisionRecord>,
    ) -> Result<String> {
        if let Err(e) = validate_service_id(id) {
            return Err(reject(sink, e));
        }
        info!(id, %kind, "delete started");
        let workspace = self.stage(kind, sink).await?;
        let result = self.delete_steps(id, kind, workspace.dir(), sink).await;
        Self::finish(workspace, result, sink)
    }

    // ── State machines ────────────────────────────────────────────────────────

    async fn create_steps(
        &self,
        payload: &CreatePayload,
        dir: &Path,
        sink: &impl LogSink<ProvisionRecord>,
    ) -> Result<String> {
        let name = payload.name();
        self.init(name, dir, sink).await?;

        let id = match payload {
            CreatePayload::StaticSite(p) => {
                let mut service = p.service.to_input();
                let attributes = StaticSiteAttributes {
                    build_command: p.build_command.clone(),
                    publish_directory: p.publish_directory.clone(),
                    custom_domain: p.custom_domain.clone(),
                    tls_cert_ref: p.tls_cert_ref.clone(),
                };
                self.apply(&static_site_vars(&service, &attributes), dir, sink)
                    .await?;
                service.public_domain_name =
                    self.collect_domain(ServiceKind::StaticSite, dir, sink).await?;
                sink.emit(ProvisionRecord::info("Registering service"));
                self.registry
                    .create_static_site(&service, &attributes)
                    .await
                    .with_context(|| not_reconciled(name, "provisioned"))?
            }
            CreatePayload::Server(p) => {
                let mut service = p.service.to_input();
                let attributes = ServerAttributes {
                    container_port: p.container_port,
                    instance_size: p.instance_size.clone(),
                    dockerfile_path: p.dockerfile_path.clone(),
                    shared_secret: generate_shared_secret(),
                };
                self.apply(&server_vars(&service, &attributes), dir, sink)
                    .await?;
                service.public_domain_name =
                    self.collect_domain(ServiceKind::Server, dir, sink).await?;
                sink.emit(ProvisionRecord::info("Registering service"));
                self.registry
                    .create_server(&service, &attributes)
                    .await
                    .with_context(|| not_reconciled(name, "provisioned"))?
            }
        };

        info!(name, id = %id, "service created");
        sink.emit(ProvisionRecord::info(format!(
            "Service {name} created with ID {id}"
        )));
        Ok(id)
    }

    async fn update_steps(
        &self,
        id: &str,
        payload: &UpdatePayload,
        dir: &Path,
        sink: &impl LogSink<ProvisionRecord>,
    ) -> Result<String> {
        let kind = payload.kind();
        let record = self.read_as(id, kind).await?;
        let name = record.service().name.clone();
        self.init(&name, dir, sink).await?;

        let service = match (payload, &record) {
            (
                UpdatePayload::StaticSite(update),
                ServiceRecord::StaticSite {
                    service,
                    attributes,
                },
            ) => {
                let (merged, attributes) = merge_static_site(update, service, attributes);
                let mut service = ServiceInput::from(&merged);
                self.apply(&static_site_vars(&service, &attributes), dir, sink)
                    .await?;
                service.public_domain_name = self.collect_domain(kind, dir, sink).await?;
                sink.emit(ProvisionRecord::info("Updating registry"));
                self.registry
                    .update_static_site(id, &service, &attributes)
                    .await
                    .with_context(|| not_reconciled(&name, "updated"))?;
                service
            }
            (
                UpdatePayload::Server(update),
                ServiceRecord::Server {
                    service,
                    attributes,
                },
            ) => {
                let (merged, attributes) = merge_server(update, service, attributes);
                let mut service = ServiceInput::from(&merged);
                self.apply(&server_vars(&service, &attributes), dir, sink)
                    .await?;
                service.public_domain_name = self.collect_domain(kind, dir, sink).await?;
                sink.emit(ProvisionRecord::info("Updating registry"));
                self.registry
                    .update_server(id, &service, &attributes)
                    .await
                    .with_context(|| not_reconciled(&name, "updated"))?;
                service
            }
            _ => return Err(not_found_as(id, kind)),
        };

        self.retrigger(&service, sink).await?;
        info!(id, name = %name, "service updated");
        sink.emit(ProvisionRecord::info(format!("Service {name} updated")));
        Ok(id.to_string())
    }

    async fn delete_steps(
        &self,
        id: &str,
        kind: ServiceKind,
        dir: &Path,
        sink: &impl LogSink<ProvisionRecord>,
    ) -> Result<String> {
        let record = self.read_as(id, kind).await?;
        let name = record.service().name.clone();
        self.init(&name, dir, sink).await?;

        let vars = match &record {
            ServiceRecord::StaticSite {
                service,
                attributes,
            } => static_site_vars(&ServiceInput::from(service), attributes),
            ServiceRecord::Server {
                service,
                attributes,
            } => server_vars(&ServiceInput::from(service), attributes),
        };
        sink.emit(ProvisionRecord::info("Destroying infrastructure"));
        self.run_iac(&destroy_args(&vars, &self.settings.overrides), dir, sink)
            .await?;

        sink.emit(ProvisionRecord::info("Removing service from registry"));
        self.registry
            .delete(id)
            .await
            .with_context(|| not_reconciled(&name, "destroyed"))?;

        info!(id, name = %name, "service deleted");
        sink.emit(ProvisionRecord::info(format!("Service {name} deleted")));
        Ok(id.to_string())
    }

    // ── Steps ─────────────────────────────────────────────────────────────────

    async fn stage(
        &self,
        kind: ServiceKind,
        sink: &impl LogSink<ProvisionRecord>,
    ) -> Result<StagedWorkspace<'a, W>> {
        let template = self.settings.template(kind);
        sink.emit(ProvisionRecord::info(format!("Staging {kind} template")));
        match self.workspaces.stage(&template).await {
            Ok(dir) => {
                debug!(dir = %dir.display(), "workspace staged");
                Ok(StagedWorkspace {
                    workspaces: self.workspaces,
                    dir,
                })
            }
            Err(e) => Err(reject(
                sink,
                e.context(format!("failed to stage {}", template.display())),
            )),
        }
    }

    /// Emits the failure line (if any) and the cleanup line, destroys the
    /// workspace, then closes the stream.
    fn finish<T>(
        workspace: StagedWorkspace<'_, W>,
        result: Result<T>,
        sink: &impl LogSink<ProvisionRecord>,
    ) -> Result<T> {
        if let Err(e) = &result {
            warn!(error = %failure_message(e), "provisioning run failed");
            sink.emit(ProvisionRecord::failure(failure_message(e)));
        }
        sink.emit(ProvisionRecord::info("Cleaning up workspace"));
        drop(workspace);
        sink.end(end_marker(&result));
        result
    }

    async fn read_as(&self, id: &str, kind: ServiceKind) -> Result<ServiceRecord> {
        match self.registry.read_by_id(id).await? {
            Some(record) if record.kind() == kind => Ok(record),
            Some(record) => {
                debug!(id, expected = %kind, actual = %record.kind(), "kind mismatch");
                Err(not_found_as(id, kind))
            }
            None => Err(not_found_as(id, kind)),
        }
    }

    async fn init(
        &self,
        service_name: &str,
        dir: &Path,
        sink: &impl LogSink<ProvisionRecord>,
    ) -> Result<()> {
        sink.emit(ProvisionRecord::info("Initialising IaC backend"));
        self.run_iac(&self.settings.backend.init_args(service_name), dir, sink)
            .await
    }

    async fn apply(
        &self,
        vars: &TemplateVars,
        dir: &Path,
        sink: &impl LogSink<ProvisionRecord>,
    ) -> Result<()> {
        sink.emit(ProvisionRecord::info("Applying infrastructure changes"));
        self.run_iac(&apply_args(vars, &self.settings.overrides), dir, sink)
            .await
    }

    async fn run_iac(
        &self,
        args: &[String],
        dir: &Path,
        sink: &impl LogSink<ProvisionRecord>,
    ) -> Result<()> {
        let mut relay = |line: OutputLine| {
            sink.emit(match line {
                OutputLine::Stdout(l) => ProvisionRecord::stdout(l),
                OutputLine::Stderr(l) => ProvisionRecord::stderr(l),
            });
        };
        self.iac.run(args, dir, &mut relay).await
    }

    async fn collect_domain(
        &self,
        kind: ServiceKind,
        dir: &Path,
        sink: &impl LogSink<ProvisionRecord>,
    ) -> Result<String> {
        sink.emit(ProvisionRecord::info("Reading outputs"));
        let args: Vec<String> = OUTPUT_ARGS.iter().map(ToString::to_string).collect();
        let json = self.iac.run_and_collect(&args, dir).await?;
        let domain = parse_public_domain(kind, &json)?;
        sink.emit(ProvisionRecord::info(format!("Public domain: {domain}")));
        Ok(domain)
    }

    async fn retrigger(
        &self,
        service: &ServiceInput,
        sink: &impl LogSink<ProvisionRecord>,
    ) -> Result<String> {
        let pipeline = pipeline_name(&service.name, &self.settings.pipeline_suffix);
        sink.emit(ProvisionRecord::info(format!(
            "Re-triggering pipeline {pipeline}"
        )));
        let creds = self.cloud.assume_role().await?;
        let execution_id = self
            .cloud
            .start_execution(
                &creds,
                PipelineRef {
                    region: &service.region,
                    name: &pipeline,
                },
            )
            .await
            .with_context(|| format!("failed to re-trigger {pipeline}"))?;
        sink.emit(ProvisionRecord::info(format!(
            "Started pipeline execution {execution_id}"
        )));
        Ok(execution_id)
    }
}
