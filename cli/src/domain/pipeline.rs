//! Pipeline naming, snapshot signatures and stage-state enrichment.

use chrono::{DateTime, Utc};
use deckhand_common::{ActionExecutionDetail, PipelineExecutionStatus};
use serde::{Deserialize, Serialize};

/// Delay between two polls of the pipeline or build APIs.
pub const POLL_INTERVAL: std::time::Duration = std::time::Duration::from_secs(2);

/// Credentials this close to expiry are replaced before the next call.
pub const CREDENTIAL_REFRESH_MARGIN: std::time::Duration = std::time::Duration::from_secs(300);

/// Default suffix appended to a service name to form its pipeline name.
pub const DEFAULT_PIPELINE_SUFFIX: &str = "-pipeline";

#[must_use]
pub fn pipeline_name(service_name: &str, suffix: &str) -> String {
    format!("{service_name}{suffix}")
}

/// Short-lived credentials returned by role assumption.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    #[serde(default)]
    pub expiration: Option<DateTime<Utc>>,
}

impl Credentials {
    /// Whether these credentials expire within [`CREDENTIAL_REFRESH_MARGIN`]
    /// of `now`. Credentials without an expiry never need refreshing.
    #[must_use]
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expiration.is_some_and(|expires| {
            chrono::Duration::from_std(CREDENTIAL_REFRESH_MARGIN)
                .is_ok_and(|margin| expires - now <= margin)
        })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .finish_non_exhaustive()
    }
}

/// One row of a pipeline's execution history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineExecutionSummary {
    pub pipeline_execution_id: String,
    pub status: PipelineExecutionStatus,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_update_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub trigger: Option<ExecutionTrigger>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionTrigger {
    #[serde(default)]
    pub trigger_type: Option<String>,
    #[serde(default)]
    pub trigger_detail: Option<String>,
}

// ── Pipeline state ────────────────────────────────────────────────────────────

/// Current stage/action state of a pipeline, independent of any execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineState {
    #[serde(default)]
    pub stage_states: Vec<StageState>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageState {
    pub stage_name: String,
    #[serde(default)]
    pub action_states: Vec<ActionState>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionState {
    pub action_name: String,
    #[serde(default)]
    pub latest_execution: Option<LatestExecution>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestExecution {
    #[serde(default)]
    pub external_execution_id: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

impl PipelineState {
    fn latest_execution(&self, stage: &str, action: &str) -> Option<&LatestExecution> {
        self.stage_states
            .iter()
            .find(|s| s.stage_name == stage)?
            .action_states
            .iter()
            .find(|a| a.action_name == action)?
            .latest_execution
            .as_ref()
    }

    /// Fill each detail's external execution id from the matching action's
    /// latest run. Details without a match keep whatever they had.
    pub fn enrich(&self, details: &mut [ActionExecutionDetail]) {
        for detail in details {
            if let Some(latest) = self.latest_execution(&detail.stage_name, &detail.action_name) {
                if latest.external_execution_id.is_some() {
                    detail.external_execution_id.clone_from(&latest.external_execution_id);
                }
                if detail.summary.is_none() {
                    detail.summary.clone_from(&latest.summary);
                }
            }
        }
    }
}

/// Identity of a snapshot for de-duplication: ordered `stage:action:status`.
#[must_use]
pub fn signature(details: &[ActionExecutionDetail]) -> String {
    details
        .iter()
        .map(|d| format!("{}:{}:{}", d.stage_name, d.action_name, d.status.as_str()))
        .collect::<Vec<_>>()
        .join("|")
}
