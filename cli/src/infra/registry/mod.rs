//! redb-backed implementation of the `ServiceRegistry` port.
//!
//! Every public operation is exactly one redb transaction. Writes that fail
//! validation (uniqueness, unknown group, kind mismatch, missing attribute
//! row) abort the transaction, so partial writes are never observable.

mod tables;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use deckhand_common::ServiceKind;
use redb::{Database, ReadableDatabase, ReadableTable, Table, TableDefinition, WriteTransaction};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::application::ports::ServiceRegistry;
use crate::domain::error::RegistryError;
use crate::domain::service::{
    ServerAttributes, ServiceFilter, ServiceGroup, ServiceInput, ServiceRecord,
    StaticSiteAttributes, generate_group_id, generate_service_id,
};
use tables::{
    GROUP_NAMES, SERVER_ATTRIBUTES, SERVICE_DOMAINS, SERVICE_GROUPS, SERVICE_NAMES, SERVICES,
    STATIC_SITE_ATTRIBUTES, ServiceRow,
};

type StrResult<T> = std::result::Result<T, RegistryError>;

/// Convert any `Display` error into a `RegistryError` variant.
macro_rules! map_err {
    ($variant:ident) => {
        |e| RegistryError::$variant(e.to_string())
    };
}

/// Attribute row for either kind.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Attributes {
    StaticSite(StaticSiteAttributes),
    Server(ServerAttributes),
}

impl Attributes {
    fn kind(&self) -> ServiceKind {
        match self {
            Self::StaticSite(_) => ServiceKind::StaticSite,
            Self::Server(_) => ServiceKind::Server,
        }
    }

    fn encode(&self) -> StrResult<Vec<u8>> {
        match self {
            Self::StaticSite(a) => serde_json::to_vec(a),
            Self::Server(a) => serde_json::to_vec(a),
        }
        .map_err(map_err!(Serialize))
    }

    fn decode(kind: ServiceKind, bytes: &[u8]) -> StrResult<Self> {
        match kind {
            ServiceKind::StaticSite => serde_json::from_slice(bytes).map(Self::StaticSite),
            ServiceKind::Server => serde_json::from_slice(bytes).map(Self::Server),
        }
        .map_err(map_err!(Deserialize))
    }
}

fn attributes_table(kind: ServiceKind) -> TableDefinition<'static, &'static str, &'static [u8]> {
    match kind {
        ServiceKind::StaticSite => STATIC_SITE_ATTRIBUTES,
        ServiceKind::Server => SERVER_ATTRIBUTES,
    }
}

fn parse_kind(row: &ServiceRow) -> StrResult<ServiceKind> {
    row.kind.parse().map_err(|_| RegistryError::UnknownKind {
        id: row.id.clone(),
        kind: row.kind.clone(),
    })
}

fn get_json<T: DeserializeOwned>(
    table: &impl ReadableTable<&'static str, &'static [u8]>,
    key: &str,
) -> StrResult<Option<T>> {
    match table.get(key).map_err(map_err!(Read))? {
        Some(guard) => serde_json::from_slice(guard.value())
            .map(Some)
            .map_err(map_err!(Deserialize)),
        None => Ok(None),
    }
}

fn put_json<T: Serialize>(
    table: &mut Table<'_, &'static str, &'static [u8]>,
    key: &str,
    value: &T,
) -> StrResult<()> {
    let bytes = serde_json::to_vec(value).map_err(map_err!(Serialize))?;
    table
        .insert(key, bytes.as_slice())
        .map_err(map_err!(Write))?;
    Ok(())
}

/// Fails with `Conflict` if `value` is indexed to anything other than `owner`.
fn ensure_free(
    index: &impl ReadableTable<&'static str, &'static str>,
    field: &'static str,
    value: &str,
    owner: Option<&str>,
) -> StrResult<()> {
    if let Some(existing) = index.get(value).map_err(map_err!(Read))? {
        if Some(existing.value()) != owner {
            return Err(RegistryError::Conflict {
                field,
                value: value.to_string(),
            });
        }
    }
    Ok(())
}

fn ensure_group(
    groups: &impl ReadableTable<&'static str, &'static [u8]>,
    group_id: Option<&str>,
) -> StrResult<()> {
    if let Some(group_id) = group_id {
        if groups.get(group_id).map_err(map_err!(Read))?.is_none() {
            return Err(RegistryError::UnknownGroup(group_id.to_string()));
        }
    }
    Ok(())
}

/// Strictly later than `previous`, normally the current time.
fn next_updated_at(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > previous {
        now
    } else {
        previous + chrono::Duration::milliseconds(1)
    }
}

fn assemble(
    row: &ServiceRow,
    static_sites: &impl ReadableTable<&'static str, &'static [u8]>,
    servers: &impl ReadableTable<&'static str, &'static [u8]>,
) -> StrResult<ServiceRecord> {
    let kind = parse_kind(row)?;
    let service = row.to_service(kind);
    let missing = || RegistryError::MissingAttributes {
        id: row.id.clone(),
        kind,
    };
    Ok(match kind {
        ServiceKind::StaticSite => ServiceRecord::StaticSite {
            service,
            attributes: get_json(static_sites, &row.id)?.ok_or_else(missing)?,
        },
        ServiceKind::Server => ServiceRecord::Server {
            service,
            attributes: get_json(servers, &row.id)?.ok_or_else(missing)?,
        },
    })
}

/// Thread-safe service registry backed by redb.
#[derive(Clone)]
pub struct RedbRegistry {
    db: Arc<Database>,
}

impl RedbRegistry {
    /// Open (or create) a persistent registry at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Open`] if the file cannot be created or opened.
    pub fn open(path: &Path) -> StrResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(map_err!(Open))?;
        }
        let db = Database::create(path).map_err(map_err!(Open))?;
        let registry = Self { db: Arc::new(db) };
        registry.ensure_tables()?;
        debug!(?path, "registry opened");
        Ok(registry)
    }

    /// Create an ephemeral in-memory registry.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Open`] if the backend cannot be initialised.
    pub fn open_in_memory() -> StrResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let registry = Self { db: Arc::new(db) };
        registry.ensure_tables()?;
        debug!("in-memory registry opened");
        Ok(registry)
    }

    /// Stands in for schema creation: opening a table in a write
    /// transaction creates it if absent.
    fn ensure_tables(&self) -> StrResult<()> {
        self.write(|txn| {
            txn.open_table(SERVICES).map_err(map_err!(Table))?;
            txn.open_table(STATIC_SITE_ATTRIBUTES)
                .map_err(map_err!(Table))?;
            txn.open_table(SERVER_ATTRIBUTES).map_err(map_err!(Table))?;
            txn.open_table(SERVICE_GROUPS).map_err(map_err!(Table))?;
            txn.open_table(SERVICE_NAMES).map_err(map_err!(Table))?;
            txn.open_table(SERVICE_DOMAINS).map_err(map_err!(Table))?;
            txn.open_table(GROUP_NAMES).map_err(map_err!(Table))?;
            Ok(())
        })
    }

    /// Run `f` in one write transaction: commit on `Ok`, abort on `Err`.
    fn write<T>(&self, f: impl FnOnce(&WriteTransaction) -> StrResult<T>) -> StrResult<T> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        match f(&txn) {
            Ok(value) => {
                txn.commit().map_err(map_err!(Transaction))?;
                Ok(value)
            }
            Err(e) => {
                if let Err(abort) = txn.abort() {
                    warn!(error = %abort, "registry abort failed");
                }
                Err(e)
            }
        }
    }

    // ── Services ──────────────────────────────────────────────────────────────

    fn create(&self, input: &ServiceInput, attributes: &Attributes) -> StrResult<String> {
        let kind = attributes.kind();
        let encoded = attributes.encode()?;
        let id = self.write(|txn| {
            let mut services = txn.open_table(SERVICES).map_err(map_err!(Table))?;
            let mut names = txn.open_table(SERVICE_NAMES).map_err(map_err!(Table))?;
            let mut domains = txn.open_table(SERVICE_DOMAINS).map_err(map_err!(Table))?;
            let groups = txn.open_table(SERVICE_GROUPS).map_err(map_err!(Table))?;
            let mut attrs = txn
                .open_table(attributes_table(kind))
                .map_err(map_err!(Table))?;

            ensure_free(&names, "name", &input.name, None)?;
            ensure_free(
                &domains,
                "public domain name",
                &input.public_domain_name,
                None,
            )?;
            ensure_group(&groups, input.group_id.as_deref())?;

            let id = loop {
                let candidate = generate_service_id();
                if services
                    .get(candidate.as_str())
                    .map_err(map_err!(Read))?
                    .is_none()
                {
                    break candidate;
                }
            };
            let now = Utc::now();
            let row = ServiceRow {
                id: id.clone(),
                name: input.name.clone(),
                kind: kind.as_str().to_string(),
                group_id: input.group_id.clone(),
                region: input.region.clone(),
                repo_id: input.repo_id.clone(),
                branch_name: input.branch_name.clone(),
                root_dir: input.root_dir.clone(),
                public_domain_name: input.public_domain_name.clone(),
                created_at: now,
                updated_at: now,
            };
            put_json(&mut services, &id, &row)?;
            names
                .insert(input.name.as_str(), id.as_str())
                .map_err(map_err!(Write))?;
            domains
                .insert(input.public_domain_name.as_str(), id.as_str())
                .map_err(map_err!(Write))?;
            attrs
                .insert(id.as_str(), encoded.as_slice())
                .map_err(map_err!(Write))?;
            Ok(id)
        })?;
        debug!(%id, %kind, name = %input.name, "service stored");
        Ok(id)
    }

    fn update(&self, id: &str, input: &ServiceInput, attributes: &Attributes) -> StrResult<String> {
        let kind = attributes.kind();
        let changed = self.write(|txn| {
            let mut services = txn.open_table(SERVICES).map_err(map_err!(Table))?;
            let mut names = txn.open_table(SERVICE_NAMES).map_err(map_err!(Table))?;
            let mut domains = txn.open_table(SERVICE_DOMAINS).map_err(map_err!(Table))?;
            let groups = txn.open_table(SERVICE_GROUPS).map_err(map_err!(Table))?;
            let mut attrs = txn
                .open_table(attributes_table(kind))
                .map_err(map_err!(Table))?;

            let mut row: ServiceRow = get_json(&services, id)?
                .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
            let stored_kind = parse_kind(&row)?;
            if stored_kind != kind {
                return Err(RegistryError::KindMismatch {
                    id: id.to_string(),
                    expected: kind,
                    actual: stored_kind,
                });
            }
            let previous = match attrs.get(id).map_err(map_err!(Read))? {
                Some(guard) => Attributes::decode(kind, guard.value())?,
                None => {
                    return Err(RegistryError::MissingAttributes {
                        id: id.to_string(),
                        kind,
                    });
                }
            };

            if !row.differs_from(input) && previous == *attributes {
                return Ok(false);
            }

            if row.name != input.name {
                ensure_free(&names, "name", &input.name, Some(id))?;
                names
                    .remove(row.name.as_str())
                    .map_err(map_err!(Write))?;
                names
                    .insert(input.name.as_str(), id)
                    .map_err(map_err!(Write))?;
            }
            if row.public_domain_name != input.public_domain_name {
                ensure_free(
                    &domains,
                    "public domain name",
                    &input.public_domain_name,
                    Some(id),
                )?;
                domains
                    .remove(row.public_domain_name.as_str())
                    .map_err(map_err!(Write))?;
                domains
                    .insert(input.public_domain_name.as_str(), id)
                    .map_err(map_err!(Write))?;
            }
            ensure_group(&groups, input.group_id.as_deref())?;

            row.apply(input);
            row.updated_at = next_updated_at(row.updated_at);
            put_json(&mut services, id, &row)?;
            attrs
                .insert(id, attributes.encode()?.as_slice())
                .map_err(map_err!(Write))?;
            Ok(true)
        })?;
        debug!(id, %kind, changed, "service updated");
        Ok(id.to_string())
    }

    fn delete_service(&self, id: &str) -> StrResult<String> {
        self.write(|txn| {
            let mut services = txn.open_table(SERVICES).map_err(map_err!(Table))?;
            let row: ServiceRow = get_json(&services, id)?
                .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
            let kind = parse_kind(&row)?;

            let mut attrs = txn
                .open_table(attributes_table(kind))
                .map_err(map_err!(Table))?;
            if attrs.remove(id).map_err(map_err!(Write))?.is_none() {
                return Err(RegistryError::MissingAttributes {
                    id: id.to_string(),
                    kind,
                });
            }
            services.remove(id).map_err(map_err!(Write))?;

            let mut names = txn.open_table(SERVICE_NAMES).map_err(map_err!(Table))?;
            names
                .remove(row.name.as_str())
                .map_err(map_err!(Write))?;
            let mut domains = txn.open_table(SERVICE_DOMAINS).map_err(map_err!(Table))?;
            domains
                .remove(row.public_domain_name.as_str())
                .map_err(map_err!(Write))?;
            Ok(())
        })?;
        debug!(id, "service deleted");
        Ok(id.to_string())
    }

    fn read_one(&self, id: &str) -> StrResult<Option<ServiceRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let services = txn.open_table(SERVICES).map_err(map_err!(Table))?;
        let Some(row) = get_json::<ServiceRow>(&services, id)? else {
            return Ok(None);
        };
        let static_sites = txn
            .open_table(STATIC_SITE_ATTRIBUTES)
            .map_err(map_err!(Table))?;
        let servers = txn.open_table(SERVER_ATTRIBUTES).map_err(map_err!(Table))?;
        assemble(&row, &static_sites, &servers).map(Some)
    }

    fn read_filtered(&self, filter: &ServiceFilter) -> StrResult<Vec<ServiceRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let services = txn.open_table(SERVICES).map_err(map_err!(Table))?;
        let static_sites = txn
            .open_table(STATIC_SITE_ATTRIBUTES)
            .map_err(map_err!(Table))?;
        let servers = txn.open_table(SERVER_ATTRIBUTES).map_err(map_err!(Table))?;

        let mut records = Vec::new();
        for entry in services.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let row: ServiceRow =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            let kind = parse_kind(&row)?;
            if filter.matches(&row.to_service(kind)) {
                records.push(assemble(&row, &static_sites, &servers)?);
            }
        }
        records.sort_by(|a, b| {
            let (a, b) = (a.service(), b.service());
            a.created_at.cmp(&b.created_at).then_with(|| a.name.cmp(&b.name))
        });
        Ok(records)
    }

    // ── Groups ────────────────────────────────────────────────────────────────

    fn insert_group(&self, name: &str) -> StrResult<ServiceGroup> {
        self.write(|txn| {
            let mut groups = txn.open_table(SERVICE_GROUPS).map_err(map_err!(Table))?;
            let mut names = txn.open_table(GROUP_NAMES).map_err(map_err!(Table))?;
            ensure_free(&names, "group name", name, None)?;
            let id = loop {
                let candidate = generate_group_id();
                if groups
                    .get(candidate.as_str())
                    .map_err(map_err!(Read))?
                    .is_none()
                {
                    break candidate;
                }
            };
            let group = ServiceGroup {
                id: id.clone(),
                name: name.to_string(),
            };
            put_json(&mut groups, &id, &group)?;
            names
                .insert(name, id.as_str())
                .map_err(map_err!(Write))?;
            Ok(group)
        })
    }

    fn all_groups(&self) -> StrResult<Vec<ServiceGroup>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(SERVICE_GROUPS).map_err(map_err!(Table))?;
        let mut groups = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let group: ServiceGroup =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            groups.push(group);
        }
        groups.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(groups)
    }
}

/// Run a blocking registry call off the async runtime.
async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> StrResult<T> + Send + 'static,
{
    Ok(tokio::task::spawn_blocking(f)
        .await
        .context("registry task panicked")??)
}

impl ServiceRegistry for RedbRegistry {
    async fn create_static_site(
        &self,
        service: &ServiceInput,
        attributes: &StaticSiteAttributes,
    ) -> Result<String> {
        let (registry, service) = (self.clone(), service.clone());
        let attributes = Attributes::StaticSite(attributes.clone());
        blocking(move || registry.create(&service, &attributes)).await
    }

    async fn create_server(
        &self,
        service: &ServiceInput,
        attributes: &ServerAttributes,
    ) -> Result<String> {
        let (registry, service) = (self.clone(), service.clone());
        let attributes = Attributes::Server(attributes.clone());
        blocking(move || registry.create(&service, &attributes)).await
    }

    async fn read_by_id(&self, id: &str) -> Result<Option<ServiceRecord>> {
        let (registry, id) = (self.clone(), id.to_string());
        blocking(move || registry.read_one(&id)).await
    }

    async fn read_by_filter(&self, filter: &ServiceFilter) -> Result<Vec<ServiceRecord>> {
        let (registry, filter) = (self.clone(), filter.clone());
        blocking(move || registry.read_filtered(&filter)).await
    }

    async fn update_static_site(
        &self,
        id: &str,
        service: &ServiceInput,
        attributes: &StaticSiteAttributes,
    ) -> Result<String> {
        let (registry, id, service) = (self.clone(), id.to_string(), service.clone());
        let attributes = Attributes::StaticSite(attributes.clone());
        blocking(move || registry.update(&id, &service, &attributes)).await
    }

    async fn update_server(
        &self,
        id: &str,
        service: &ServiceInput,
        attributes: &ServerAttributes,
    ) -> Result<String> {
        let (registry, id, service) = (self.clone(), id.to_string(), service.clone());
        let attributes = Attributes::Server(attributes.clone());
        blocking(move || registry.update(&id, &service, &attributes)).await
    }

    async fn delete(&self, id: &str) -> Result<String> {
        let (registry, id) = (self.clone(), id.to_string());
        blocking(move || registry.delete_service(&id)).await
    }

    async fn create_group(&self, name: &str) -> Result<ServiceGroup> {
        let (registry, name) = (self.clone(), name.to_string());
        blocking(move || registry.insert_group(&name)).await
    }

    async fn list_groups(&self) -> Result<Vec<ServiceGroup>> {
        let registry = self.clone();
        blocking(move || registry.all_groups()).await
    }
}
