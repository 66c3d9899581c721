//! Infrastructure implementation of the `Workspaces` port.
//!
//! Each provisioning run gets a fresh `deckhand-run-*` directory holding a
//! copy of the kind's template. Nothing is retained between calls.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::application::ports::Workspaces;

/// Stages templates into temporary directories.
#[derive(Debug, Clone, Default)]
pub struct TempWorkspaces {
    /// Parent for staged directories; the system temp dir when `None`.
    root: Option<PathBuf>,
}

impl TempWorkspaces {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn in_dir(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }
}

/// Recursively copy `src` into the existing directory `dst`.
fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    for entry in WalkDir::new(src).follow_links(true).min_depth(1) {
        let entry = entry.with_context(|| format!("cannot read {}", src.display()))?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .with_context(|| format!("unexpected path {}", entry.path().display()))?;
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)
                .with_context(|| format!("cannot create {}", target.display()))?;
        } else {
            std::fs::copy(entry.path(), &target)
                .with_context(|| format!("cannot copy {}", entry.path().display()))?;
        }
    }
    Ok(())
}

fn stage_blocking(root: Option<PathBuf>, template: PathBuf) -> Result<PathBuf> {
    if !template.is_dir() {
        anyhow::bail!("template directory {} does not exist", template.display());
    }
    let mut builder = tempfile::Builder::new();
    builder.prefix("deckhand-run-");
    let dir = match &root {
        Some(root) => {
            std::fs::create_dir_all(root)
                .with_context(|| format!("cannot create {}", root.display()))?;
            builder.tempdir_in(root)
        }
        None => builder.tempdir(),
    }
    .context("cannot create workspace directory")?;

    // A failed copy drops `dir`, which removes the partial workspace.
    copy_tree(&template, dir.path())?;
    Ok(dir.keep())
}

impl Workspaces for TempWorkspaces {
    async fn stage(&self, template: &Path) -> Result<PathBuf> {
        let root = self.root.clone();
        let template = template.to_path_buf();
        let dir = tokio::task::spawn_blocking(move || stage_blocking(root, template))
            .await
            .context("workspace staging task failed")??;
        debug!(dir = %dir.display(), "workspace staged");
        Ok(dir)
    }

    fn destroy(&self, dir: &Path) {
        match std::fs::remove_dir_all(dir) {
            Ok(()) => debug!(dir = %dir.display(), "workspace removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(dir = %dir.display(), error = %e, "could not remove workspace"),
        }
    }
}
