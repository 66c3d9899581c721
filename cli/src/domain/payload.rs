//! Create/update payloads and the field merge rule used by updates.
//!
//! Pure functions only. No I/O, no async.

use anyhow::Result;
use deckhand_common::ServiceKind;
use serde::{Deserialize, Serialize};

use crate::domain::service::{
    ServerAttributes, Service, ServiceInput, StaticSiteAttributes, require_non_empty,
    validate_group_id, validate_name, validate_port, validate_region, validate_repo_id,
};

// ── Create payloads ───────────────────────────────────────────────────────────

/// Fields every new service carries regardless of kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewService {
    pub name: String,
    pub region: String,
    pub repo_id: String,
    pub branch_name: String,
    pub root_dir: String,
    #[serde(default)]
    pub group_id: Option<String>,
}

impl NewService {
    /// Base columns for a service that has not been provisioned yet.
    #[must_use]
    pub fn to_input(&self) -> ServiceInput {
        ServiceInput {
            name: self.name.clone(),
            group_id: self.group_id.clone(),
            region: self.region.clone(),
            repo_id: self.repo_id.clone(),
            branch_name: self.branch_name.clone(),
            root_dir: self.root_dir.clone(),
            public_domain_name: String::new(),
        }
    }

    fn validate(&self) -> Result<()> {
        validate_name(&self.name)?;
        validate_region(&self.region)?;
        validate_repo_id(&self.repo_id)?;
        require_non_empty("branchName", &self.branch_name)?;
        require_non_empty("rootDir", &self.root_dir)?;
        if let Some(group_id) = &self.group_id {
            validate_group_id(group_id)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStaticSite {
    #[serde(flatten)]
    pub service: NewService,
    pub build_command: String,
    pub publish_directory: String,
    #[serde(default)]
    pub custom_domain: Option<String>,
    #[serde(default)]
    pub tls_cert_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateServer {
    #[serde(flatten)]
    pub service: NewService,
    pub container_port: u16,
    pub instance_size: String,
    pub dockerfile_path: String,
}

/// A validated-shape request to create a service of one kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreatePayload {
    StaticSite(CreateStaticSite),
    Server(CreateServer),
}

impl CreatePayload {
    #[must_use]
    pub fn kind(&self) -> ServiceKind {
        match self {
            Self::StaticSite(_) => ServiceKind::StaticSite,
            Self::Server(_) => ServiceKind::Server,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::StaticSite(p) => &p.service.name,
            Self::Server(p) => &p.service.name,
        }
    }

    /// Schema-shape validation. Runs before any side effect.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`](crate::domain::error::ValidationError)
    /// for the first malformed field.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::StaticSite(p) => {
                p.service.validate()?;
                require_non_empty("buildCommand", &p.build_command)?;
                require_non_empty("publishDirectory", &p.publish_directory)?;
            }
            Self::Server(p) => {
                p.service.validate()?;
                validate_port(p.container_port)?;
                require_non_empty("instanceSize", &p.instance_size)?;
                require_non_empty("dockerfilePath", &p.dockerfile_path)?;
            }
        }
        Ok(())
    }
}

// ── Update payloads ───────────────────────────────────────────────────────────

/// Mutable base fields. `name` and `region` are fixed at creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceChanges {
    pub repo_id: Option<String>,
    pub branch_name: Option<String>,
    pub root_dir: Option<String>,
    pub group_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateStaticSite {
    #[serde(flatten)]
    pub service: ServiceChanges,
    pub build_command: Option<String>,
    pub publish_directory: Option<String>,
    pub custom_domain: Option<String>,
    pub tls_cert_ref: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateServer {
    #[serde(flatten)]
    pub service: ServiceChanges,
    pub container_port: Option<u16>,
    pub instance_size: Option<String>,
    pub dockerfile_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdatePayload {
    StaticSite(UpdateStaticSite),
    Server(UpdateServer),
}

impl UpdatePayload {
    #[must_use]
    pub fn kind(&self) -> ServiceKind {
        match self {
            Self::StaticSite(_) => ServiceKind::StaticSite,
            Self::Server(_) => ServiceKind::Server,
        }
    }

    /// Validates the fields that will actually be applied by [`merge`].
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`](crate::domain::error::ValidationError)
    /// for the first malformed present field.
    pub fn validate(&self) -> Result<()> {
        let changes = match self {
            Self::StaticSite(p) => &p.service,
            Self::Server(p) => &p.service,
        };
        if let Some(repo_id) = present(changes.repo_id.as_ref()) {
            validate_repo_id(repo_id)?;
        }
        if let Some(group_id) = present(changes.group_id.as_ref()) {
            validate_group_id(group_id)?;
        }
        Ok(())
    }
}

// ── Merge rule ────────────────────────────────────────────────────────────────

/// Values the update merge treats as "not provided".
///
/// An explicit empty string or zero cannot be told apart from an omitted
/// field, so neither can be used to overwrite a stored value.
pub trait Blank {
    fn is_blank(&self) -> bool;
}

impl Blank for String {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

impl Blank for u16 {
    fn is_blank(&self) -> bool {
        *self == 0
    }
}

fn present<T: Blank>(value: Option<&T>) -> Option<&T> {
    value.filter(|v| !v.is_blank())
}

/// New value if present and not blank, otherwise the old one.
#[must_use]
pub fn merge_field<T: Blank + Clone>(new: Option<&T>, old: &T) -> T {
    present(new).cloned().unwrap_or_else(|| old.clone())
}

/// Same rule for fields that are optional in storage.
#[must_use]
pub fn merge_optional<T: Blank + Clone>(new: Option<&T>, old: Option<&T>) -> Option<T> {
    present(new).or(old).cloned()
}

fn merge_service(changes: &ServiceChanges, existing: &Service) -> Service {
    Service {
        repo_id: merge_field(changes.repo_id.as_ref(), &existing.repo_id),
        branch_name: merge_field(changes.branch_name.as_ref(), &existing.branch_name),
        root_dir: merge_field(changes.root_dir.as_ref(), &existing.root_dir),
        group_id: merge_optional(changes.group_id.as_ref(), existing.group_id.as_ref()),
        ..existing.clone()
    }
}

#[must_use]
pub fn merge_static_site(
    update: &UpdateStaticSite,
    service: &Service,
    attributes: &StaticSiteAttributes,
) -> (Service, StaticSiteAttributes) {
    let merged = StaticSiteAttributes {
        build_command: merge_field(update.build_command.as_ref(), &attributes.build_command),
        publish_directory: merge_field(
            update.publish_directory.as_ref(),
            &attributes.publish_directory,
        ),
        custom_domain: merge_optional(
            update.custom_domain.as_ref(),
            attributes.custom_domain.as_ref(),
        ),
        tls_cert_ref: merge_optional(
            update.tls_cert_ref.as_ref(),
            attributes.tls_cert_ref.as_ref(),
        ),
    };
    (merge_service(&update.service, service), merged)
}

/// The shared secret is carried over untouched.
#[must_use]
pub fn merge_server(
    update: &UpdateServer,
    service: &Service,
    attributes: &ServerAttributes,
) -> (Service, ServerAttributes) {
    let merged = ServerAttributes {
        container_port: merge_field(update.container_port.as_ref(), &attributes.container_port),
        instance_size: merge_field(update.instance_size.as_ref(), &attributes.instance_size),
        dockerfile_path: merge_field(update.dockerfile_path.as_ref(), &attributes.dockerfile_path),
        shared_secret: attributes.shared_secret.clone(),
    };
    (merge_service(&update.service, service), merged)
}
