//! IaC argument vectors and output parsing.
//!
//! Every invocation of the IaC binary is described here as a plain
//! `Vec<String>`; nothing in this module spawns a process.

use std::collections::BTreeMap;

use anyhow::Result;
use deckhand_common::ServiceKind;
use serde::Deserialize;

use crate::domain::error::ProvisioningError;
use crate::domain::service::{ServerAttributes, ServiceInput, StaticSiteAttributes};

/// Arguments that ask the IaC tool for its outputs as JSON.
pub const OUTPUT_ARGS: &[&str] = &["output", "-json"];

/// Remote state location shared by every service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub bucket: String,
    pub region: String,
}

impl BackendConfig {
    /// State key for one service. Keyed by the immutable service name.
    #[must_use]
    pub fn state_key(service_name: &str) -> String {
        format!("services/{service_name}.tfstate")
    }

    #[must_use]
    pub fn init_args(&self, service_name: &str) -> Vec<String> {
        vec![
            "init".to_string(),
            "-input=false".to_string(),
            format!("-backend-config=bucket={}", self.bucket),
            format!("-backend-config=key={}", Self::state_key(service_name)),
            format!("-backend-config=region={}", self.region),
        ]
    }
}

/// Ordered `-var name=value` pairs for apply/destroy.
///
/// Optional values are only recorded when present so that the tool never
/// sees an explicit empty assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateVars(Vec<(&'static str, String)>);

impl TemplateVars {
    pub fn required(&mut self, name: &'static str, value: impl Into<String>) -> &mut Self {
        self.0.push((name, value.into()));
        self
    }

    pub fn optional(&mut self, name: &'static str, value: Option<&str>) -> &mut Self {
        if let Some(v) = value.filter(|v| !v.is_empty()) {
            self.0.push((name, v.to_string()));
        }
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    fn to_args(&self) -> impl Iterator<Item = String> + '_ {
        self.0
            .iter()
            .flat_map(|(k, v)| ["-var".to_string(), format!("{k}={v}")])
    }
}

fn common_vars(vars: &mut TemplateVars, service: &ServiceInput) {
    vars.required("service_name", &service.name)
        .required("region", &service.region)
        .required("repo_id", &service.repo_id)
        .required("branch_name", &service.branch_name)
        .required("root_dir", &service.root_dir);
}

#[must_use]
pub fn static_site_vars(service: &ServiceInput, attrs: &StaticSiteAttributes) -> TemplateVars {
    let mut vars = TemplateVars::default();
    common_vars(&mut vars, service);
    vars.required("build_command", &attrs.build_command)
        .required("publish_directory", &attrs.publish_directory)
        .optional("domain_name", attrs.custom_domain.as_deref())
        .optional("acm_certificate_arn", attrs.tls_cert_ref.as_deref());
    vars
}

#[must_use]
pub fn server_vars(service: &ServiceInput, attrs: &ServerAttributes) -> TemplateVars {
    let mut vars = TemplateVars::default();
    common_vars(&mut vars, service);
    vars.required("container_port", attrs.container_port.to_string())
        .required("instance_size", &attrs.instance_size)
        .required("dockerfile_path", &attrs.dockerfile_path)
        .required("secret_header_value", &attrs.shared_secret);
    vars
}

/// Extra variables supplied by the operation rather than the record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    /// External source connection reference.
    pub connection_arn: Option<String>,
}

impl Overrides {
    fn extend(&self, vars: &mut TemplateVars) {
        vars.optional("connection_arn", self.connection_arn.as_deref());
    }
}

#[must_use]
pub fn apply_args(vars: &TemplateVars, overrides: &Overrides) -> Vec<String> {
    let mut vars = vars.clone();
    overrides.extend(&mut vars);
    ["apply", "-auto-approve", "-input=false"]
        .into_iter()
        .map(str::to_string)
        .chain(vars.to_args())
        .collect()
}

/// Destroy always forces removal so in-flight workloads cannot stall it.
#[must_use]
pub fn destroy_args(vars: &TemplateVars, overrides: &Overrides) -> Vec<String> {
    let mut vars = vars.clone();
    overrides.extend(&mut vars);
    vars.required("force_destroy", "true");
    ["destroy", "-auto-approve", "-input=false"]
        .into_iter()
        .map(str::to_string)
        .chain(vars.to_args())
        .collect()
}

/// Name of the template output holding the provider-assigned domain.
#[must_use]
pub fn domain_output_key(kind: ServiceKind) -> &'static str {
    match kind {
        ServiceKind::StaticSite => "cloudfront_domain_name",
        ServiceKind::Server => "load_balancer_dns_name",
    }
}

#[derive(Debug, Deserialize)]
struct OutputValue {
    value: serde_json::Value,
}

/// Extract the public domain from `output -json`.
///
/// # Errors
///
/// Returns [`ProvisioningError::MalformedOutput`] if the JSON cannot be
/// parsed or the expected output is missing or not a non-empty string.
pub fn parse_public_domain(kind: ServiceKind, json: &str) -> Result<String> {
    let key = domain_output_key(kind);
    let outputs: BTreeMap<String, OutputValue> = serde_json::from_str(json)
        .map_err(|e| ProvisioningError::MalformedOutput(e.to_string()))?;
    let value = outputs
        .get(key)
        .ok_or_else(|| ProvisioningError::MalformedOutput(format!("missing output '{key}'")))?;
    match value.value.as_str() {
        Some(domain) if !domain.is_empty() => Ok(domain.to_string()),
        _ => Err(
            ProvisioningError::MalformedOutput(format!("output '{key}' is not a domain")).into(),
        ),
    }
}
