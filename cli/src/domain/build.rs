//! Build status and log page shapes returned by the build and log services.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Build {
    pub id: String,
    #[serde(default)]
    pub build_status: Option<String>,
    #[serde(default)]
    pub build_complete: bool,
    #[serde(default)]
    pub logs: Option<LogsLocation>,
}

impl Build {
    /// Log group and stream, when the build has started writing logs.
    #[must_use]
    pub fn log_stream(&self) -> Option<(&str, &str)> {
        let logs = self.logs.as_ref()?;
        Some((logs.group_name.as_deref()?, logs.stream_name.as_deref()?))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogsLocation {
    #[serde(default)]
    pub group_name: Option<String>,
    #[serde(default)]
    pub stream_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogPage {
    #[serde(default)]
    pub events: Vec<LogEvent>,
    #[serde(default)]
    pub next_forward_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEvent {
    #[serde(default)]
    pub timestamp: Option<i64>,
    pub message: String,
}
