//! `deckhand list`: services in the registry, optionally filtered.

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;
use deckhand_common::ServiceKind;

use crate::app::AppContext;
use crate::domain::service::ServiceFilter;

/// Every given filter must match; repeated flags widen that filter.
#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Service name (repeatable)
    #[arg(long = "name")]
    pub names: Vec<String>,
    /// Service kind (repeatable)
    #[arg(long = "kind", value_enum)]
    pub kinds: Vec<ServiceKind>,
    /// Group ID (repeatable)
    #[arg(long = "group")]
    pub group_ids: Vec<String>,
    /// Region (repeatable)
    #[arg(long = "region")]
    pub regions: Vec<String>,
    /// Created at or after (RFC 3339)
    #[arg(long)]
    pub created_after: Option<DateTime<Utc>>,
    /// Created at or before (RFC 3339)
    #[arg(long)]
    pub created_before: Option<DateTime<Utc>>,
    /// Updated at or after (RFC 3339)
    #[arg(long)]
    pub updated_after: Option<DateTime<Utc>>,
    /// Updated at or before (RFC 3339)
    #[arg(long)]
    pub updated_before: Option<DateTime<Utc>>,
}

impl From<ListArgs> for ServiceFilter {
    fn from(args: ListArgs) -> Self {
        Self {
            names: args.names,
            kinds: args.kinds,
            group_ids: args.group_ids,
            regions: args.regions,
            created_after: args.created_after,
            created_before: args.created_before,
            updated_after: args.updated_after,
            updated_before: args.updated_before,
        }
    }
}

/// Run `deckhand list`.
///
/// # Errors
///
/// Returns an error if the registry cannot be opened or read.
pub async fn run(app: &AppContext, args: ListArgs) -> Result<()> {
    let engine = app.engine()?;
    let records = engine.list_services(&ServiceFilter::from(args)).await?;
    app.renderer().render_services(&records)
}
