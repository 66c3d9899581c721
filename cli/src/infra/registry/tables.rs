//! redb table definitions for the service registry.
//!
//! Entity tables use `&str` keys and `&[u8]` values (JSON rows). Index
//! tables map a unique column value back to the owning id.

use chrono::{DateTime, Utc};
use redb::TableDefinition;
use serde::{Deserialize, Serialize};

use crate::domain::service::{Service, ServiceInput};

/// Base service rows keyed by service id.
pub const SERVICES: TableDefinition<&str, &[u8]> = TableDefinition::new("services");

/// Static-site attribute rows keyed by service id.
pub const STATIC_SITE_ATTRIBUTES: TableDefinition<&str, &[u8]> =
    TableDefinition::new("static_site_attributes");

/// Server attribute rows keyed by service id.
pub const SERVER_ATTRIBUTES: TableDefinition<&str, &[u8]> =
    TableDefinition::new("server_attributes");

/// Service groups keyed by group id.
pub const SERVICE_GROUPS: TableDefinition<&str, &[u8]> = TableDefinition::new("service_groups");

/// Unique index: service name → service id.
pub const SERVICE_NAMES: TableDefinition<&str, &str> = TableDefinition::new("service_names");

/// Unique index: public domain name → service id.
pub const SERVICE_DOMAINS: TableDefinition<&str, &str> = TableDefinition::new("service_domains");

/// Unique index: group name → group id.
pub const GROUP_NAMES: TableDefinition<&str, &str> = TableDefinition::new("group_names");

/// Stored form of a base row. `kind` stays a string so that rows written
/// with an unknown discriminator are reported instead of failing to parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRow {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub group_id: Option<String>,
    pub region: String,
    pub repo_id: String,
    pub branch_name: String,
    pub root_dir: String,
    pub public_domain_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ServiceRow {
    /// Whether writing `input` would change any tracked base column.
    pub fn differs_from(&self, input: &ServiceInput) -> bool {
        self.name != input.name
            || self.group_id != input.group_id
            || self.region != input.region
            || self.repo_id != input.repo_id
            || self.branch_name != input.branch_name
            || self.root_dir != input.root_dir
            || self.public_domain_name != input.public_domain_name
    }

    pub fn apply(&mut self, input: &ServiceInput) {
        self.name.clone_from(&input.name);
        self.group_id.clone_from(&input.group_id);
        self.region.clone_from(&input.region);
        self.repo_id.clone_from(&input.repo_id);
        self.branch_name.clone_from(&input.branch_name);
        self.root_dir.clone_from(&input.root_dir);
        self.public_domain_name.clone_from(&input.public_domain_name);
    }

    pub fn to_service(&self, kind: deckhand_common::ServiceKind) -> Service {
        Service {
            id: self.id.clone(),
            name: self.name.clone(),
            kind,
            group_id: self.group_id.clone(),
            region: self.region.clone(),
            repo_id: self.repo_id.clone(),
            branch_name: self.branch_name.clone(),
            root_dir: self.root_dir.clone(),
            public_domain_name: self.public_domain_name.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
