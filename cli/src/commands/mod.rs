//! Command implementations

pub mod build_logs;
pub mod config;
pub mod create;
pub mod delete;
pub mod deploy;
pub mod deployments;
pub mod groups;
pub mod list;
pub mod pipeline_status;
pub mod show;
pub mod update;
pub mod version;

use std::future::Future;
use std::process::ExitCode;

use anyhow::Result;
use thiserror::Error;

/// The user pressed Ctrl-C before the operation finished.
#[derive(Debug, Error)]
#[error("Interrupted")]
pub struct Interrupted;

/// Race a long-running operation against Ctrl-C. Dropping the operation
/// kills any child process and removes its workspace.
///
/// # Errors
///
/// Returns [`Interrupted`] if Ctrl-C arrives first.
pub async fn until_interrupted<F: Future>(operation: F) -> Result<F::Output, Interrupted> {
    tokio::select! {
        output = operation => Ok(output),
        _ = tokio::signal::ctrl_c() => Err(Interrupted),
    }
}

/// Map the outcome of a streamed operation to an exit code. Failures were
/// already written to the record stream; only an interruption propagates.
///
/// # Errors
///
/// Returns [`Interrupted`], or an error from `on_success`.
pub fn finish_streamed<T>(
    result: Result<T>,
    on_success: impl FnOnce(T) -> Result<()>,
) -> Result<ExitCode> {
    match result {
        Ok(value) => {
            on_success(value)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(e) if e.is::<Interrupted>() => Err(e),
        Err(_) => Ok(ExitCode::FAILURE),
    }
}
