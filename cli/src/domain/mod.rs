//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod build;
pub mod config;
pub mod error;
pub mod iac;
pub mod payload;
pub mod pipeline;
pub mod service;

pub use config::{DeckhandConfig, validate_config_key, validate_config_value};
pub use error::{
    ConfigError, ProcessError, ProvisioningError, RegistryError, ServiceError, StreamError,
    UpstreamError, ValidationError,
};
pub use payload::{CreatePayload, UpdatePayload};
pub use service::{
    ServerAttributes, Service, ServiceFilter, ServiceGroup, ServiceInput, ServiceRecord,
    StaticSiteAttributes,
};
