//! Streamed log record shapes.
//!
//! Every logical operation emits a sequence of records followed by exactly
//! one [`StreamEnd`]. Records serialize as `{"source": ..., "data": ...}`.

use serde::{Deserialize, Serialize};

use crate::pipeline::ActionExecutionDetail;

/// Origin of a provisioning record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ProvisionSource {
    Stdout,
    Stderr,
    SysInfo,
    SysFailure,
}

/// One line of an orchestrator run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProvisionRecord {
    pub source: ProvisionSource,
    pub data: String,
}

impl ProvisionRecord {
    pub fn stdout(line: impl Into<String>) -> Self {
        Self {
            source: ProvisionSource::Stdout,
            data: line.into(),
        }
    }

    pub fn stderr(line: impl Into<String>) -> Self {
        Self {
            source: ProvisionSource::Stderr,
            data: line.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            source: ProvisionSource::SysInfo,
            data: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            source: ProvisionSource::SysFailure,
            data: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineSource {
    PipelineStatus,
    SysInfo,
    SysFailure,
}

/// Payload of a pipeline record: a message or a full action snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum PipelineData {
    Message(String),
    Actions(Vec<ActionExecutionDetail>),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PipelineRecord {
    pub source: PipelineSource,
    pub data: PipelineData,
}

impl PipelineRecord {
    #[must_use]
    pub fn snapshot(actions: Vec<ActionExecutionDetail>) -> Self {
        Self {
            source: PipelineSource::PipelineStatus,
            data: PipelineData::Actions(actions),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            source: PipelineSource::SysInfo,
            data: PipelineData::Message(message.into()),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            source: PipelineSource::SysFailure,
            data: PipelineData::Message(message.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum BuildSource {
    BuildLogs,
    SysInfo,
    SysFailure,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildRecord {
    pub source: BuildSource,
    pub data: String,
}

impl BuildRecord {
    pub fn log(line: impl Into<String>) -> Self {
        Self {
            source: BuildSource::BuildLogs,
            data: line.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            source: BuildSource::SysInfo,
            data: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            source: BuildSource::SysFailure,
            data: message.into(),
        }
    }
}

/// Terminal marker closing a record stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "end", rename_all = "snake_case")]
pub enum StreamEnd {
    Success,
    Failure { message: String },
}

impl StreamEnd {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}
