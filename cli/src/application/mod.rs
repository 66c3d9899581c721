//! Application layer: port trait definitions and use-case orchestration.
//!
//! This module depends only on `crate::domain`, never on `crate::infra`,
//! `crate::commands`, or `crate::output`.

pub mod engine;
pub mod ports;
pub mod services;
pub mod session;
pub mod single_flight;
pub mod sink;

pub use engine::{Engine, EngineSettings};
pub use ports::{
    BuildApi, CloudApi, CommandRunner, ConfigStore, CredentialProvider, IacRunner, LogApi,
    LogSink, OutputLine, PipelineApi, PipelineRef, ServiceRegistry, Workspaces,
};
