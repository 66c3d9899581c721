//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` and the shared record
//! types, never from `crate::infra`, `crate::commands`, or `crate::output`.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output};

use anyhow::Result;
use deckhand_common::{ActionExecutionDetail, PipelineExecutionStatus, StreamEnd};

use crate::domain::build::{Build, LogPage};
use crate::domain::config::DeckhandConfig;
use crate::domain::pipeline::{Credentials, PipelineExecutionSummary, PipelineState};
use crate::domain::service::{
    ServerAttributes, ServiceFilter, ServiceGroup, ServiceInput, ServiceRecord,
    StaticSiteAttributes,
};

// ── Value Types ───────────────────────────────────────────────────────────────

/// One line of subprocess output, tagged by the stream it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// A pipeline addressed by name within a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineRef<'a> {
    pub region: &'a str,
    pub name: &'a str,
}

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output, with extra environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds the
    /// runner's timeout. On timeout the child is killed.
    async fn run_with_env(
        &self,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> Result<Output>;

    /// Run a program in `dir` and capture its output.
    async fn run_in(&self, program: &str, args: &[String], dir: &Path) -> Result<Output>;

    /// Run a program in `dir`, handing every output line to `on_line` as it
    /// arrives. Resolves with the exit status once both streams are drained.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::Spawn`](crate::domain::ProcessError) if the
    /// program cannot be started.
    async fn stream_in(
        &self,
        program: &str,
        args: &[String],
        dir: &Path,
        on_line: &mut dyn FnMut(OutputLine),
    ) -> Result<ExitStatus>;
}

// ── Provisioning Ports ────────────────────────────────────────────────────────

/// Invokes the IaC binary against a workspace directory.
#[allow(async_fn_in_trait)]
pub trait IacRunner {
    /// Streaming mode: relay every line, succeed on exit code 0.
    ///
    /// # Errors
    ///
    /// [`ProvisioningError`](crate::domain::ProvisioningError) on a nonzero
    /// exit, [`ProcessError`](crate::domain::ProcessError) if the binary
    /// cannot be spawned.
    async fn run(
        &self,
        args: &[String],
        dir: &Path,
        on_line: &mut dyn FnMut(OutputLine),
    ) -> Result<()>;

    /// Collect mode: no streaming, returns stdout on success.
    ///
    /// # Errors
    ///
    /// [`ProvisioningError::ExitedWithStderr`](crate::domain::ProvisioningError)
    /// on a nonzero exit.
    async fn run_and_collect(&self, args: &[String], dir: &Path) -> Result<String>;
}

/// Ephemeral per-run directories holding a copy of an IaC template.
#[allow(async_fn_in_trait)]
pub trait Workspaces {
    /// Create a uniquely-named directory and copy `template` into it.
    async fn stage(&self, template: &Path) -> Result<PathBuf>;
    /// Remove a staged directory. Never fails; missing or partial
    /// directories are ignored.
    fn destroy(&self, dir: &Path);
}

// ── Registry Port ─────────────────────────────────────────────────────────────

/// The persisted store of services. Every method is one transaction.
#[allow(async_fn_in_trait)]
pub trait ServiceRegistry {
    async fn create_static_site(
        &self,
        service: &ServiceInput,
        attributes: &StaticSiteAttributes,
    ) -> Result<String>;
    async fn create_server(
        &self,
        service: &ServiceInput,
        attributes: &ServerAttributes,
    ) -> Result<String>;
    /// `None` when no service has this id.
    async fn read_by_id(&self, id: &str) -> Result<Option<ServiceRecord>>;
    async fn read_by_filter(&self, filter: &ServiceFilter) -> Result<Vec<ServiceRecord>>;
    async fn update_static_site(
        &self,
        id: &str,
        service: &ServiceInput,
        attributes: &StaticSiteAttributes,
    ) -> Result<String>;
    async fn update_server(
        &self,
        id: &str,
        service: &ServiceInput,
        attributes: &ServerAttributes,
    ) -> Result<String>;
    /// Removes the attribute row, then the base row.
    async fn delete(&self, id: &str) -> Result<String>;
    async fn create_group(&self, name: &str) -> Result<ServiceGroup>;
    async fn list_groups(&self) -> Result<Vec<ServiceGroup>>;
}

// ── Upstream Ports ────────────────────────────────────────────────────────────

#[allow(async_fn_in_trait)]
pub trait CredentialProvider {
    async fn assume_role(&self) -> Result<Credentials>;
}

#[allow(async_fn_in_trait)]
pub trait PipelineApi {
    async fn get_execution(
        &self,
        creds: &Credentials,
        pipeline: PipelineRef<'_>,
        execution_id: &str,
    ) -> Result<PipelineExecutionStatus>;
    async fn list_action_executions(
        &self,
        creds: &Credentials,
        pipeline: PipelineRef<'_>,
        execution_id: &str,
    ) -> Result<Vec<ActionExecutionDetail>>;
    async fn get_state(&self, creds: &Credentials, pipeline: PipelineRef<'_>)
    -> Result<PipelineState>;
    /// Returns the new execution id.
    async fn start_execution(&self, creds: &Credentials, pipeline: PipelineRef<'_>)
    -> Result<String>;
    async fn list_executions(
        &self,
        creds: &Credentials,
        pipeline: PipelineRef<'_>,
    ) -> Result<Vec<PipelineExecutionSummary>>;
}

#[allow(async_fn_in_trait)]
pub trait BuildApi {
    async fn get_build(&self, creds: &Credentials, build_id: &str) -> Result<Build>;
}

#[allow(async_fn_in_trait)]
pub trait LogApi {
    /// One page of events. `token = None` starts from the beginning.
    async fn get_log_events(
        &self,
        creds: &Credentials,
        group: &str,
        stream: &str,
        token: Option<&str>,
    ) -> Result<LogPage>;
}

/// Composite trait: everything the streamers and deployments need upstream.
pub trait CloudApi: CredentialProvider + PipelineApi + BuildApi + LogApi {}

/// Blanket implementation: any type implementing all four sub-traits is a `CloudApi`.
impl<T> CloudApi for T where T: CredentialProvider + PipelineApi + BuildApi + LogApi {}

// ── Log Sink Port ─────────────────────────────────────────────────────────────

/// Ordered destination for one operation's records. Sync: emitting never
/// suspends the producer.
pub trait LogSink<R> {
    fn emit(&self, record: R);
    /// Terminal marker. Called exactly once, after the last record.
    fn end(&self, end: StreamEnd);
}

// ── Config Port ───────────────────────────────────────────────────────────────

/// Abstracts config file persistence so the config command can be tested.
pub trait ConfigStore {
    /// Load configuration, returning defaults if the file does not exist.
    fn load(&self) -> Result<DeckhandConfig>;
    /// Persist configuration.
    fn save(&self, config: &DeckhandConfig) -> Result<()>;
    /// Path to the configuration file.
    fn path(&self) -> Result<PathBuf>;
}
