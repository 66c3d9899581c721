//! Service domain types, identifiers and pure validation functions.
//!
//! This module is intentionally free of I/O, async, and external layer imports.

use std::sync::LazyLock;

use anyhow::Result;
use chrono::{DateTime, Utc};
use deckhand_common::ServiceKind;
use rand::RngCore;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::error::ValidationError;

static NAME_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?$").ok());

static REGION_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-z]{2}(-[a-z]+)+-\d$").ok());

/// Number of random bytes behind a server's shared-secret header value.
pub const SHARED_SECRET_BYTES: usize = 32;

// ── Entities ──────────────────────────────────────────────────────────────────

/// Base row shared by every kind of service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub kind: ServiceKind,
    pub group_id: Option<String>,
    pub region: String,
    pub repo_id: String,
    pub branch_name: String,
    pub root_dir: String,
    /// Domain assigned by the cloud provider after apply.
    pub public_domain_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticSiteAttributes {
    pub build_command: String,
    pub publish_directory: String,
    pub custom_domain: Option<String>,
    pub tls_cert_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerAttributes {
    pub container_port: u16,
    pub instance_size: String,
    pub dockerfile_path: String,
    /// Generated once at creation; update never regenerates it.
    pub shared_secret: String,
}

/// Base columns as written by the registry. Id and timestamps are owned by
/// the registry itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInput {
    pub name: String,
    pub group_id: Option<String>,
    pub region: String,
    pub repo_id: String,
    pub branch_name: String,
    pub root_dir: String,
    pub public_domain_name: String,
}

impl From<&Service> for ServiceInput {
    fn from(service: &Service) -> Self {
        Self {
            name: service.name.clone(),
            group_id: service.group_id.clone(),
            region: service.region.clone(),
            repo_id: service.repo_id.clone(),
            branch_name: service.branch_name.clone(),
            root_dir: service.root_dir.clone(),
            public_domain_name: service.public_domain_name.clone(),
        }
    }
}

/// A service together with the attribute row matching its kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ServiceRecord {
    StaticSite {
        service: Service,
        attributes: StaticSiteAttributes,
    },
    Server {
        service: Service,
        attributes: ServerAttributes,
    },
}

impl ServiceRecord {
    #[must_use]
    pub fn service(&self) -> &Service {
        match self {
            Self::StaticSite { service, .. } | Self::Server { service, .. } => service,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ServiceKind {
        match self {
            Self::StaticSite { .. } => ServiceKind::StaticSite,
            Self::Server { .. } => ServiceKind::Server,
        }
    }
}

/// Named grouping of services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceGroup {
    pub id: String,
    pub name: String,
}

// ── Identifiers ───────────────────────────────────────────────────────────────

fn is_prefixed_hex_id(id: &str, prefix: &str) -> bool {
    id.len() == prefix.len() + 16
        && id.starts_with(prefix)
        && id[prefix.len()..]
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
}

/// Validates a service id: `svc-` followed by 16 lowercase hex characters.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidServiceId`] if the format does not match.
pub fn validate_service_id(id: &str) -> Result<()> {
    if !is_prefixed_hex_id(id, "svc-") {
        return Err(ValidationError::InvalidServiceId(id.to_string()).into());
    }
    Ok(())
}

/// Validates a group id: `grp-` followed by 16 lowercase hex characters.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidGroupId`] if the format does not match.
pub fn validate_group_id(id: &str) -> Result<()> {
    if !is_prefixed_hex_id(id, "grp-") {
        return Err(ValidationError::InvalidGroupId(id.to_string()).into());
    }
    Ok(())
}

fn random_hex(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::rngs::OsRng.fill_bytes(&mut buf);
    hex_encode(&buf)
}

#[must_use]
pub fn generate_service_id() -> String {
    format!("svc-{}", random_hex(8))
}

#[must_use]
pub fn generate_group_id() -> String {
    format!("grp-{}", random_hex(8))
}

/// 32 random bytes, hex-encoded, used as the server's shared-secret header.
#[must_use]
pub fn generate_shared_secret() -> String {
    random_hex(SHARED_SECRET_BYTES)
}

/// Encode bytes as lowercase hex string.
#[must_use]
pub fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        out.push(char::from(HEX[(b >> 4) as usize]));
        out.push(char::from(HEX[(b & 0xf) as usize]));
    }
    out
}

// ── Field validators ──────────────────────────────────────────────────────────

/// # Errors
///
/// Returns [`ValidationError::InvalidName`] unless the name is a DNS label.
pub fn validate_name(name: &str) -> Result<()> {
    let ok = NAME_RE.as_ref().is_some_and(|re| re.is_match(name));
    if !ok {
        return Err(ValidationError::InvalidName(name.to_string()).into());
    }
    Ok(())
}

/// # Errors
///
/// Returns [`ValidationError::InvalidRegion`] unless the region looks like `eu-west-1`.
pub fn validate_region(region: &str) -> Result<()> {
    let ok = REGION_RE.as_ref().is_some_and(|re| re.is_match(region));
    if !ok {
        return Err(ValidationError::InvalidRegion(region.to_string()).into());
    }
    Ok(())
}

/// # Errors
///
/// Returns [`ValidationError::InvalidRepository`] unless the id is `owner/name`.
pub fn validate_repo_id(repo_id: &str) -> Result<()> {
    let mut parts = repo_id.split('/');
    let valid = matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty()
    );
    if !valid {
        return Err(ValidationError::InvalidRepository(repo_id.to_string()).into());
    }
    Ok(())
}

/// # Errors
///
/// Returns [`ValidationError::Empty`] if the trimmed value is empty.
pub fn require_non_empty(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty(field).into());
    }
    Ok(())
}

/// # Errors
///
/// Returns [`ValidationError::InvalidPort`] for port 0.
pub fn validate_port(port: u16) -> Result<()> {
    if port == 0 {
        return Err(ValidationError::InvalidPort(u32::from(port)).into());
    }
    Ok(())
}

// ── Filtering ─────────────────────────────────────────────────────────────────

/// Inclusion filters for registry reads. Every populated field must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceFilter {
    pub names: Vec<String>,
    pub kinds: Vec<ServiceKind>,
    pub group_ids: Vec<String>,
    pub regions: Vec<String>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub updated_after: Option<DateTime<Utc>>,
    pub updated_before: Option<DateTime<Utc>>,
}

impl ServiceFilter {
    #[must_use]
    pub fn matches(&self, service: &Service) -> bool {
        fn included<T: PartialEq>(allowed: &[T], value: &T) -> bool {
            allowed.is_empty() || allowed.contains(value)
        }

        included(&self.names, &service.name)
            && included(&self.kinds, &service.kind)
            && (self.group_ids.is_empty()
                || service
                    .group_id
                    .as_ref()
                    .is_some_and(|g| self.group_ids.contains(g)))
            && included(&self.regions, &service.region)
            && self.created_after.is_none_or(|t| service.created_at >= t)
            && self.created_before.is_none_or(|t| service.created_at <= t)
            && self.updated_after.is_none_or(|t| service.updated_at >= t)
            && self.updated_before.is_none_or(|t| service.updated_at <= t)
    }
}
