//! `deckhand groups`: manage service groups.

use anyhow::Result;
use clap::Subcommand;

use crate::app::AppContext;

/// Groups subcommands.
#[derive(Subcommand, Debug)]
pub enum GroupsCommand {
    /// Create a group
    Create {
        /// Unique group name
        name: String,
    },
    /// List groups
    List,
}

/// Run `deckhand groups`.
///
/// # Errors
///
/// Returns an error if the registry cannot be opened, the name is invalid
/// or already taken.
pub async fn run(app: &AppContext, cmd: GroupsCommand) -> Result<()> {
    let engine = app.engine()?;
    match cmd {
        GroupsCommand::Create { name } => {
            let group = engine.create_group(&name).await?;
            app.renderer().render_group_created(&group)
        }
        GroupsCommand::List => {
            let groups = engine.list_groups().await?;
            app.renderer().render_groups(&groups)
        }
    }
}
