//! AWS-CLI-backed implementations of the upstream ports.
//!
//! Every call shells out through the [`CommandRunner`] port with
//! `--output json`. Assumed-role credentials travel as environment
//! variables so they never appear on a command line.

use anyhow::{Context, Result};
use deckhand_common::{ActionExecutionDetail, PipelineExecutionStatus};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::application::ports::{
    BuildApi, CommandRunner, CredentialProvider, LogApi, PipelineApi, PipelineRef,
};
use crate::domain::build::{Build, LogPage};
use crate::domain::config::AwsConfig;
use crate::domain::error::{ConfigError, UpstreamError};
use crate::domain::pipeline::{Credentials, PipelineExecutionSummary, PipelineState};

// ── Response envelopes ────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AssumeRoleResponse {
    credentials: Credentials,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetExecutionResponse {
    pipeline_execution: ExecutionStatus,
}

#[derive(Deserialize)]
struct ExecutionStatus {
    status: PipelineExecutionStatus,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListActionExecutionsResponse {
    #[serde(default)]
    action_execution_details: Vec<RawActionDetail>,
}

/// Action detail as the pipeline service returns it: the build id sits in
/// `output.executionResult` rather than at the top level.
#[derive(Deserialize)]
struct RawActionDetail {
    #[serde(flatten)]
    detail: ActionExecutionDetail,
    #[serde(default)]
    output: Option<ActionOutput>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActionOutput {
    #[serde(default)]
    execution_result: Option<ExecutionResult>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecutionResult {
    #[serde(default)]
    external_execution_id: Option<String>,
    #[serde(default)]
    external_execution_summary: Option<String>,
}

impl RawActionDetail {
    fn into_detail(self) -> ActionExecutionDetail {
        let mut detail = self.detail;
        if let Some(result) = self.output.and_then(|o| o.execution_result) {
            if detail.external_execution_id.is_none() {
                detail.external_execution_id = result.external_execution_id;
            }
            if detail.summary.is_none() {
                detail.summary = result.external_execution_summary;
            }
        }
        detail
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartExecutionResponse {
    pipeline_execution_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListExecutionsResponse {
    #[serde(default)]
    pipeline_execution_summaries: Vec<PipelineExecutionSummary>,
}

#[derive(Deserialize)]
struct BatchGetBuildsResponse {
    #[serde(default)]
    builds: Vec<Build>,
}

// ── Client ────────────────────────────────────────────────────────────────────

/// Upper bound on execution history rows fetched by `list_executions`.
const MAX_EXECUTIONS: &str = "20";

/// Pipeline, build, log and STS client driving the `aws` binary.
pub struct AwsCli<R> {
    runner: R,
    cli: String,
    region: Option<String>,
    role_arn: Option<String>,
    session_name: String,
}

impl<R: CommandRunner> AwsCli<R> {
    pub fn new(runner: R, config: &AwsConfig) -> Self {
        Self {
            runner,
            cli: config.cli.clone(),
            region: config.region.clone(),
            role_arn: config.role_arn.clone(),
            session_name: config.session_name.clone(),
        }
    }

    /// Run `aws <api> <call> <args..>` and parse its JSON stdout.
    async fn call<T: DeserializeOwned>(
        &self,
        api: &'static str,
        call: &'static str,
        args: &[&str],
        creds: Option<&Credentials>,
        region: Option<&str>,
    ) -> Result<T> {
        let mut argv = vec![api, call];
        argv.extend_from_slice(args);
        argv.extend_from_slice(&["--output", "json"]);
        if let Some(region) = region {
            argv.extend_from_slice(&["--region", region]);
        }
        let env: Vec<(&str, &str)> = match creds {
            Some(c) => vec![
                ("AWS_ACCESS_KEY_ID", c.access_key_id.as_str()),
                ("AWS_SECRET_ACCESS_KEY", c.secret_access_key.as_str()),
                ("AWS_SESSION_TOKEN", c.session_token.as_str()),
            ],
            None => Vec::new(),
        };

        debug!(api, call, region, "upstream call");
        let output = self.runner.run_with_env(&self.cli, &argv, &env).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("exit code {:?}", output.status.code())
            } else {
                stderr
            };
            return Err(UpstreamError { api, call, message }.into());
        }
        serde_json::from_slice(&output.stdout).map_err(|e| {
            UpstreamError {
                api,
                call,
                message: format!("unexpected response: {e}"),
            }
            .into()
        })
    }

    fn default_region(&self) -> Option<&str> {
        self.region.as_deref()
    }
}

impl<R: CommandRunner> CredentialProvider for AwsCli<R> {
    async fn assume_role(&self) -> Result<Credentials> {
        let role_arn = self
            .role_arn
            .as_deref()
            .ok_or(ConfigError::Missing("aws.role_arn"))?;
        let response: AssumeRoleResponse = self
            .call(
                "sts",
                "assume-role",
                &[
                    "--role-arn",
                    role_arn,
                    "--role-session-name",
                    self.session_name.as_str(),
                ],
                None,
                self.default_region(),
            )
            .await?;
        Ok(response.credentials)
    }
}

impl<R: CommandRunner> PipelineApi for AwsCli<R> {
    async fn get_execution(
        &self,
        creds: &Credentials,
        pipeline: PipelineRef<'_>,
        execution_id: &str,
    ) -> Result<PipelineExecutionStatus> {
        let response: GetExecutionResponse = self
            .call(
                "codepipeline",
                "get-pipeline-execution",
                &[
                    "--pipeline-name",
                    pipeline.name,
                    "--pipeline-execution-id",
                    execution_id,
                ],
                Some(creds),
                Some(pipeline.region),
            )
            .await?;
        Ok(response.pipeline_execution.status)
    }

    async fn list_action_executions(
        &self,
        creds: &Credentials,
        pipeline: PipelineRef<'_>,
        execution_id: &str,
    ) -> Result<Vec<ActionExecutionDetail>> {
        let filter = format!("pipelineExecutionId={execution_id}");
        let response: ListActionExecutionsResponse = self
            .call(
                "codepipeline",
                "list-action-executions",
                &["--pipeline-name", pipeline.name, "--filter", filter.as_str()],
                Some(creds),
                Some(pipeline.region),
            )
            .await?;
        Ok(response
            .action_execution_details
            .into_iter()
            .map(RawActionDetail::into_detail)
            .collect())
    }

    async fn get_state(
        &self,
        creds: &Credentials,
        pipeline: PipelineRef<'_>,
    ) -> Result<PipelineState> {
        self.call(
            "codepipeline",
            "get-pipeline-state",
            &["--name", pipeline.name],
            Some(creds),
            Some(pipeline.region),
        )
        .await
    }

    async fn start_execution(
        &self,
        creds: &Credentials,
        pipeline: PipelineRef<'_>,
    ) -> Result<String> {
        let response: StartExecutionResponse = self
            .call(
                "codepipeline",
                "start-pipeline-execution",
                &["--name", pipeline.name],
                Some(creds),
                Some(pipeline.region),
            )
            .await?;
        Ok(response.pipeline_execution_id)
    }

    async fn list_executions(
        &self,
        creds: &Credentials,
        pipeline: PipelineRef<'_>,
    ) -> Result<Vec<PipelineExecutionSummary>> {
        let response: ListExecutionsResponse = self
            .call(
                "codepipeline",
                "list-pipeline-executions",
                &[
                    "--pipeline-name",
                    pipeline.name,
                    "--max-items",
                    MAX_EXECUTIONS,
                ],
                Some(creds),
                Some(pipeline.region),
            )
            .await?;
        Ok(response.pipeline_execution_summaries)
    }
}

impl<R: CommandRunner> BuildApi for AwsCli<R> {
    async fn get_build(&self, creds: &Credentials, build_id: &str) -> Result<Build> {
        let response: BatchGetBuildsResponse = self
            .call(
                "codebuild",
                "batch-get-builds",
                &["--ids", build_id],
                Some(creds),
                self.default_region(),
            )
            .await?;
        response
            .builds
            .into_iter()
            .find(|b| b.id == build_id)
            .with_context(|| format!("build {build_id} not found"))
    }
}

impl<R: CommandRunner> LogApi for AwsCli<R> {
    async fn get_log_events(
        &self,
        creds: &Credentials,
        group: &str,
        stream: &str,
        token: Option<&str>,
    ) -> Result<LogPage> {
        let mut args = vec![
            "--log-group-name",
            group,
            "--log-stream-name",
            stream,
            "--start-from-head",
        ];
        if let Some(token) = token {
            args.extend_from_slice(&["--next-token", token]);
        }
        self.call(
            "logs",
            "get-log-events",
            &args,
            Some(creds),
            self.default_region(),
        )
        .await
    }
}
