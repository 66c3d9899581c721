//! Application services: use-case orchestration.
//!
//! Each service module implements a single use-case by composing domain logic
//! with port trait calls. Services import only from `crate::domain` and
//! `crate::application`, never from `crate::infra`, `crate::commands`,
//! or `crate::output`.

pub mod build_logs;
pub mod config_service;
pub mod deployments;
pub mod pipeline_status;
pub mod provisioning;
