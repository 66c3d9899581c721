//! Shared mock infrastructure for unit tests.
//!
//! A scripted IaC runner, a workspace stager that never touches the disk, a
//! registry wrapper that can be told to fail its writes, a scripted cloud
//! and a sink that records everything it is handed.

#![allow(clippy::expect_used, dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use deckhand_cli::application::ports::{
    BuildApi, CredentialProvider, IacRunner, LogApi, LogSink, OutputLine, PipelineApi,
    PipelineRef, ServiceRegistry, Workspaces,
};
use deckhand_cli::domain::build::{Build, LogPage};
use deckhand_cli::domain::error::{ProvisioningError, RegistryError, UpstreamError};
use deckhand_cli::domain::pipeline::{Credentials, PipelineExecutionSummary, PipelineState};
use deckhand_cli::domain::service::{
    ServerAttributes, ServiceFilter, ServiceGroup, ServiceInput, ServiceRecord,
    StaticSiteAttributes,
};
use deckhand_cli::infra::registry::RedbRegistry;
use deckhand_common::{
    ActionExecutionDetail, PipelineExecutionStatus, ProvisionRecord, ProvisionSource, StreamEnd,
};
use tokio::sync::Notify;

// ── Sink ──────────────────────────────────────────────────────────────────────

/// Keeps every record and terminal marker in arrival order.
pub struct RecordingSink<R> {
    records: Mutex<Vec<R>>,
    ends: Mutex<Vec<StreamEnd>>,
}

impl<R: Clone> RecordingSink<R> {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            ends: Mutex::new(Vec::new()),
        }
    }

    pub fn records(&self) -> Vec<R> {
        self.records.lock().expect("lock").clone()
    }

    pub fn ends(&self) -> Vec<StreamEnd> {
        self.ends.lock().expect("lock").clone()
    }

    /// The single terminal marker; panics if there is not exactly one.
    pub fn end(&self) -> StreamEnd {
        let ends = self.ends();
        assert_eq!(ends.len(), 1, "expected exactly one end marker: {ends:?}");
        ends[0].clone()
    }
}

impl RecordingSink<ProvisionRecord> {
    pub fn data_from(&self, source: ProvisionSource) -> Vec<String> {
        self.records()
            .into_iter()
            .filter(|r| r.source == source)
            .map(|r| r.data)
            .collect()
    }

    pub fn infos(&self) -> Vec<String> {
        self.data_from(ProvisionSource::SysInfo)
    }

    pub fn failures(&self) -> Vec<String> {
        self.data_from(ProvisionSource::SysFailure)
    }
}

impl<R> LogSink<R> for RecordingSink<R> {
    fn emit(&self, record: R) {
        self.records.lock().expect("lock").push(record);
    }

    fn end(&self, end: StreamEnd) {
        self.ends.lock().expect("lock").push(end);
    }
}

// ── IaC ───────────────────────────────────────────────────────────────────────

pub const STATIC_SITE_DOMAIN: &str = "d111111abcdef8.cloudfront.net";
pub const SERVER_DOMAIN: &str = "api-1234567890.eu-west-1.elb.amazonaws.com";

/// `output -json` document carrying both kinds' domain outputs.
pub fn outputs_json(site_domain: &str, server_domain: &str) -> String {
    serde_json::json!({
        "cloudfront_domain_name": { "sensitive": false, "type": "string", "value": site_domain },
        "load_balancer_dns_name": { "sensitive": false, "type": "string", "value": server_domain },
    })
    .to_string()
}

/// Records every invocation. Each streaming run relays one stdout line, and
/// the subcommand named in `fail_on` exits with code 1 after a stderr line.
pub struct ScriptedIac {
    pub calls: Mutex<Vec<Vec<String>>>,
    pub dirs: Mutex<Vec<PathBuf>>,
    pub fail_on: Option<&'static str>,
    pub outputs: Mutex<String>,
    /// When set, `init` waits for a notification before finishing.
    pub gate: Option<Arc<Notify>>,
}

impl Default for ScriptedIac {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            dirs: Mutex::new(Vec::new()),
            fail_on: None,
            outputs: Mutex::new(outputs_json(STATIC_SITE_DOMAIN, SERVER_DOMAIN)),
            gate: None,
        }
    }
}

impl ScriptedIac {
    pub fn failing_on(subcommand: &'static str) -> Self {
        Self {
            fail_on: Some(subcommand),
            ..Self::default()
        }
    }

    pub fn set_outputs(&self, json: String) {
        *self.outputs.lock().expect("lock") = json;
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().expect("lock").clone()
    }

    pub fn dirs(&self) -> Vec<PathBuf> {
        self.dirs.lock().expect("lock").clone()
    }

    /// First argument of every invocation, in order.
    pub fn subcommands(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|args| args.first().cloned())
            .collect()
    }

    /// Arguments of the first invocation of `subcommand`.
    pub fn args_of(&self, subcommand: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .find(|args| args.first().map(String::as_str) == Some(subcommand))
            .unwrap_or_default()
    }

    fn record(&self, args: &[String], dir: &Path) -> String {
        self.calls.lock().expect("lock").push(args.to_vec());
        self.dirs.lock().expect("lock").push(dir.to_path_buf());
        args.first().cloned().unwrap_or_default()
    }
}

impl IacRunner for ScriptedIac {
    async fn run(
        &self,
        args: &[String],
        dir: &Path,
        on_line: &mut dyn FnMut(OutputLine),
    ) -> Result<()> {
        let subcommand = self.record(args, dir);
        if subcommand == "init" {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
        }
        on_line(OutputLine::Stdout(format!("{subcommand}: working")));
        if self.fail_on == Some(subcommand.as_str()) {
            on_line(OutputLine::Stderr(format!("Error: {subcommand} rejected")));
            return Err(ProvisioningError::Exited {
                command: format!("terraform {subcommand}"),
                code: 1,
            }
            .into());
        }
        Ok(())
    }

    async fn run_and_collect(&self, args: &[String], dir: &Path) -> Result<String> {
        let subcommand = self.record(args, dir);
        if self.fail_on == Some(subcommand.as_str()) {
            return Err(ProvisioningError::ExitedWithStderr {
                command: format!("terraform {subcommand}"),
                code: 1,
                stderr: "no state".to_string(),
            }
            .into());
        }
        Ok(self.outputs.lock().expect("lock").clone())
    }
}

// ── Workspaces ────────────────────────────────────────────────────────────────

/// Hands out fake directory names and remembers what was destroyed.
#[derive(Default)]
pub struct FakeWorkspaces {
    pub staged: Mutex<Vec<PathBuf>>,
    pub destroyed: Mutex<Vec<PathBuf>>,
    pub templates: Mutex<Vec<PathBuf>>,
    pub fail: bool,
}

impl FakeWorkspaces {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn staged(&self) -> Vec<PathBuf> {
        self.staged.lock().expect("lock").clone()
    }

    pub fn destroyed(&self) -> Vec<PathBuf> {
        self.destroyed.lock().expect("lock").clone()
    }

    pub fn templates(&self) -> Vec<PathBuf> {
        self.templates.lock().expect("lock").clone()
    }
}

impl Workspaces for FakeWorkspaces {
    async fn stage(&self, template: &Path) -> Result<PathBuf> {
        self.templates
            .lock()
            .expect("lock")
            .push(template.to_path_buf());
        if self.fail {
            anyhow::bail!("no space left on device");
        }
        let mut staged = self.staged.lock().expect("lock");
        let dir = PathBuf::from(format!("/fake/deckhand-run-{}", staged.len()));
        staged.push(dir.clone());
        Ok(dir)
    }

    fn destroy(&self, dir: &Path) {
        self.destroyed.lock().expect("lock").push(dir.to_path_buf());
    }
}

// ── Registry ──────────────────────────────────────────────────────────────────

/// In-memory redb registry whose writes can be made to fail on demand.
pub struct FlakyRegistry {
    pub inner: RedbRegistry,
    fail_writes: AtomicBool,
}

impl FlakyRegistry {
    pub fn new() -> Self {
        Self {
            inner: RedbRegistry::open_in_memory().expect("in-memory registry"),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RegistryError::Write("disk I/O error".to_string()).into());
        }
        Ok(())
    }
}

impl ServiceRegistry for FlakyRegistry {
    async fn create_static_site(
        &self,
        service: &ServiceInput,
        attributes: &StaticSiteAttributes,
    ) -> Result<String> {
        self.check()?;
        self.inner.create_static_site(service, attributes).await
    }

    async fn create_server(
        &self,
        service: &ServiceInput,
        attributes: &ServerAttributes,
    ) -> Result<String> {
        self.check()?;
        self.inner.create_server(service, attributes).await
    }

    async fn read_by_id(&self, id: &str) -> Result<Option<ServiceRecord>> {
        self.inner.read_by_id(id).await
    }

    async fn read_by_filter(&self, filter: &ServiceFilter) -> Result<Vec<ServiceRecord>> {
        self.inner.read_by_filter(filter).await
    }

    async fn update_static_site(
        &self,
        id: &str,
        service: &ServiceInput,
        attributes: &StaticSiteAttributes,
    ) -> Result<String> {
        self.check()?;
        self.inner.update_static_site(id, service, attributes).await
    }

    async fn update_server(
        &self,
        id: &str,
        service: &ServiceInput,
        attributes: &ServerAttributes,
    ) -> Result<String> {
        self.check()?;
        self.inner.update_server(id, service, attributes).await
    }

    async fn delete(&self, id: &str) -> Result<String> {
        self.check()?;
        self.inner.delete(id).await
    }

    async fn create_group(&self, name: &str) -> Result<ServiceGroup> {
        self.check()?;
        self.inner.create_group(name).await
    }

    async fn list_groups(&self) -> Result<Vec<ServiceGroup>> {
        self.inner.list_groups().await
    }
}

// ── Cloud ─────────────────────────────────────────────────────────────────────

pub fn test_credentials() -> Credentials {
    Credentials {
        access_key_id: "ASIATESTACCESSKEY".to_string(),
        secret_access_key: "secret".to_string(),
        session_token: "token".to_string(),
        expiration: None,
    }
}

fn upstream(api: &'static str, call: &'static str, message: &str) -> anyhow::Error {
    UpstreamError {
        api,
        call,
        message: message.to_string(),
    }
    .into()
}

/// Pops the front of a script, repeating the last entry once it is alone.
fn next<T: Clone>(script: &Mutex<VecDeque<T>>) -> Option<T> {
    let mut script = script.lock().expect("lock");
    if script.len() > 1 {
        script.pop_front()
    } else {
        script.front().cloned()
    }
}

/// Scripted pipeline, build and log services.
///
/// Every script repeats its final entry. An empty status or build script
/// makes the matching call fail like a throttled upstream.
#[derive(Default)]
pub struct MockCloud {
    pub statuses: Mutex<VecDeque<PipelineExecutionStatus>>,
    pub details: Mutex<VecDeque<Vec<ActionExecutionDetail>>>,
    pub state: PipelineState,
    pub executions: Vec<PipelineExecutionSummary>,
    pub builds: Mutex<VecDeque<Build>>,
    pub pages: Mutex<VecDeque<LogPage>>,
    pub fail_assume: bool,
    /// Lifetime of each set of assumed credentials; `None` never expires.
    pub credential_ttl: Option<chrono::Duration>,
    pub fail_start: bool,
    pub tokens_seen: Mutex<Vec<Option<String>>>,
    pub started: Mutex<Vec<(String, String)>>,
    pub polled: Mutex<Vec<(String, String)>>,
    pub assumed: AtomicUsize,
    pub build_calls: AtomicUsize,
}

impl MockCloud {
    pub fn with_statuses(
        statuses: impl IntoIterator<Item = PipelineExecutionStatus>,
        details: impl IntoIterator<Item = Vec<ActionExecutionDetail>>,
    ) -> Self {
        Self {
            statuses: Mutex::new(statuses.into_iter().collect()),
            details: Mutex::new(details.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn with_builds(
        builds: impl IntoIterator<Item = Build>,
        pages: impl IntoIterator<Item = LogPage>,
    ) -> Self {
        Self {
            builds: Mutex::new(builds.into_iter().collect()),
            pages: Mutex::new(pages.into_iter().collect()),
            ..Self::default()
        }
    }

    /// `(region, pipeline)` of every started execution.
    pub fn started(&self) -> Vec<(String, String)> {
        self.started.lock().expect("lock").clone()
    }

    /// `(region, pipeline)` of every status poll.
    pub fn polled(&self) -> Vec<(String, String)> {
        self.polled.lock().expect("lock").clone()
    }

    /// Pagination token passed on every log fetch.
    pub fn tokens_seen(&self) -> Vec<Option<String>> {
        self.tokens_seen.lock().expect("lock").clone()
    }

    pub fn assume_count(&self) -> usize {
        self.assumed.load(Ordering::SeqCst)
    }

    pub fn build_calls(&self) -> usize {
        self.build_calls.load(Ordering::SeqCst)
    }
}

impl CredentialProvider for MockCloud {
    async fn assume_role(&self) -> Result<Credentials> {
        self.assumed.fetch_add(1, Ordering::SeqCst);
        if self.fail_assume {
            return Err(upstream("sts", "assume-role", "AccessDenied"));
        }
        Ok(Credentials {
            expiration: self.credential_ttl.map(|ttl| chrono::Utc::now() + ttl),
            ..test_credentials()
        })
    }
}

impl PipelineApi for MockCloud {
    async fn get_execution(
        &self,
        _creds: &Credentials,
        pipeline: PipelineRef<'_>,
        _execution_id: &str,
    ) -> Result<PipelineExecutionStatus> {
        self.polled
            .lock()
            .expect("lock")
            .push((pipeline.region.to_string(), pipeline.name.to_string()));
        next(&self.statuses)
            .ok_or_else(|| upstream("codepipeline", "get-pipeline-execution", "Throttling"))
    }

    async fn list_action_executions(
        &self,
        _creds: &Credentials,
        _pipeline: PipelineRef<'_>,
        _execution_id: &str,
    ) -> Result<Vec<ActionExecutionDetail>> {
        Ok(next(&self.details).unwrap_or_default())
    }

    async fn get_state(
        &self,
        _creds: &Credentials,
        _pipeline: PipelineRef<'_>,
    ) -> Result<PipelineState> {
        Ok(self.state.clone())
    }

    async fn start_execution(
        &self,
        _creds: &Credentials,
        pipeline: PipelineRef<'_>,
    ) -> Result<String> {
        if self.fail_start {
            return Err(upstream(
                "codepipeline",
                "start-pipeline-execution",
                "PipelineNotFoundException",
            ));
        }
        let mut started = self.started.lock().expect("lock");
        started.push((pipeline.region.to_string(), pipeline.name.to_string()));
        Ok(format!("exec-{}", started.len()))
    }

    async fn list_executions(
        &self,
        _creds: &Credentials,
        _pipeline: PipelineRef<'_>,
    ) -> Result<Vec<PipelineExecutionSummary>> {
        Ok(self.executions.clone())
    }
}

impl BuildApi for MockCloud {
    async fn get_build(&self, _creds: &Credentials, build_id: &str) -> Result<Build> {
        self.build_calls.fetch_add(1, Ordering::SeqCst);
        next(&self.builds)
            .ok_or_else(|| upstream("codebuild", "batch-get-builds", &format!("{build_id} gone")))
    }
}

impl LogApi for MockCloud {
    async fn get_log_events(
        &self,
        _creds: &Credentials,
        _group: &str,
        _stream: &str,
        token: Option<&str>,
    ) -> Result<LogPage> {
        self.tokens_seen
            .lock()
            .expect("lock")
            .push(token.map(str::to_string));
        Ok(next(&self.pages).unwrap_or_default())
    }
}
