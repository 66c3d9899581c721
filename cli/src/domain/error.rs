//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator, so callers can `downcast_ref` to the concrete kind.

use deckhand_common::ServiceKind;
use thiserror::Error;

// ── Validation errors ─────────────────────────────────────────────────────────

/// Malformed payload or identifier, raised before any side effect.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid service ID '{0}': expected svc- followed by 16 hex characters")]
    InvalidServiceId(String),

    #[error("Invalid group ID '{0}': expected grp- followed by 16 hex characters")]
    InvalidGroupId(String),

    #[error("Invalid service name '{0}': must match ^[a-z0-9]([a-z0-9-]{{0,61}}[a-z0-9])?$")]
    InvalidName(String),

    #[error("Invalid region '{0}': expected a region code such as eu-west-1")]
    InvalidRegion(String),

    #[error("Invalid repository '{0}': expected owner/name")]
    InvalidRepository(String),

    #[error("Field '{0}' must not be empty")]
    Empty(&'static str),

    #[error("Invalid container port {0}: must be between 1 and 65535")]
    InvalidPort(u32),
}

// ── Service errors ────────────────────────────────────────────────────────────

/// Errors about the existence or state of a registered service.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Service with ID {id} not found as {kind}")]
    NotFoundAsKind { id: String, kind: ServiceKind },

    #[error("Service with ID {0} not found")]
    NotFound(String),

    #[error("A {operation} operation is already in progress for '{target}'")]
    OperationInProgress { operation: String, target: String },
}

// ── Subprocess errors ─────────────────────────────────────────────────────────

/// The external binary could not be started at all.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} timed out after {secs}s")]
    TimedOut { program: String, secs: u64 },
}

/// The IaC tool ran but did not succeed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProvisioningError {
    #[error("`{command}` exited with code {code}")]
    Exited { command: String, code: i32 },

    #[error("`{command}` exited with code {code}: {stderr}")]
    ExitedWithStderr {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("`{command}` was terminated by a signal")]
    Signaled { command: String },

    #[error("Unreadable IaC output: {0}")]
    MalformedOutput(String),
}

impl ProvisioningError {
    /// Exit code of the failed invocation, when the process exited normally.
    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Exited { code, .. } | Self::ExitedWithStderr { code, .. } => Some(*code),
            Self::Signaled { .. } | Self::MalformedOutput(_) => None,
        }
    }
}

// ── Registry errors ───────────────────────────────────────────────────────────

/// Failures of the service registry. Every variant means the transaction
/// that produced it was not committed.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to open registry: {0}")]
    Open(String),

    #[error("registry transaction error: {0}")]
    Transaction(String),

    #[error("registry table error: {0}")]
    Table(String),

    #[error("registry read error: {0}")]
    Read(String),

    #[error("registry write error: {0}")]
    Write(String),

    #[error("registry serialization error: {0}")]
    Serialize(String),

    #[error("registry deserialization error: {0}")]
    Deserialize(String),

    #[error("{field} '{value}' is already taken")]
    Conflict { field: &'static str, value: String },

    #[error("service {0} does not exist")]
    NotFound(String),

    #[error("service {id} is stored as {actual}, not {expected}")]
    KindMismatch {
        id: String,
        expected: ServiceKind,
        actual: ServiceKind,
    },

    #[error("service {id} has no {kind} attribute row")]
    MissingAttributes { id: String, kind: ServiceKind },

    #[error("service {id} has unknown kind discriminator '{kind}'")]
    UnknownKind { id: String, kind: String },

    #[error("group {0} does not exist")]
    UnknownGroup(String),
}

// ── Upstream and streaming errors ─────────────────────────────────────────────

/// A remote cloud API call failed.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{api} call '{call}' failed: {message}")]
pub struct UpstreamError {
    pub api: &'static str,
    pub call: &'static str,
    pub message: String,
}

/// A poll loop stopped because its underlying API call failed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StreamError {
    #[error("pipeline status stream terminated: {0}")]
    Pipeline(String),

    #[error("build log stream terminated: {0}")]
    Build(String),
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors related to configuration key/value validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown setting: {key}\n\nValid settings: {valid}")]
    UnknownKey { key: String, valid: String },

    #[error("Invalid value for {key}: {value}\n\n{reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Missing setting {0}. Set it with: deckhand config set {0} <value>")]
    Missing(&'static str),
}
