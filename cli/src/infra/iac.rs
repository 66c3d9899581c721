//! Infrastructure implementation of the `IacRunner` port.

use std::path::Path;

use anyhow::Result;
use tracing::{debug, info};

use crate::application::ports::{CommandRunner, IacRunner, OutputLine};
use crate::domain::error::ProvisioningError;

/// Runs the IaC binary through a [`CommandRunner`].
pub struct IacCli<R> {
    runner: R,
    binary: String,
}

impl<R: CommandRunner> IacCli<R> {
    pub fn new(runner: R, binary: impl Into<String>) -> Self {
        Self {
            runner,
            binary: binary.into(),
        }
    }

    fn describe(&self, args: &[String]) -> String {
        match args.first() {
            Some(sub) => format!("{} {sub}", self.binary),
            None => self.binary.clone(),
        }
    }
}

impl<R: CommandRunner> IacRunner for IacCli<R> {
    async fn run(
        &self,
        args: &[String],
        dir: &Path,
        on_line: &mut dyn FnMut(OutputLine),
    ) -> Result<()> {
        let command = self.describe(args);
        info!(command = %command, dir = %dir.display(), "iac started");
        let status = self.runner.stream_in(&self.binary, args, dir, on_line).await?;
        info!(command = %command, code = ?status.code(), "iac exited");
        match status.code() {
            Some(0) => Ok(()),
            Some(code) => Err(ProvisioningError::Exited { command, code }.into()),
            None => Err(ProvisioningError::Signaled { command }.into()),
        }
    }

    async fn run_and_collect(&self, args: &[String], dir: &Path) -> Result<String> {
        let command = self.describe(args);
        let output = self.runner.run_in(&self.binary, args, dir).await?;
        debug!(command = %command, code = ?output.status.code(), "iac collected");
        match output.status.code() {
            Some(0) => Ok(String::from_utf8_lossy(&output.stdout).into_owned()),
            Some(code) => Err(ProvisioningError::ExitedWithStderr {
                command,
                code,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into()),
            None => Err(ProvisioningError::Signaled { command }.into()),
        }
    }
}
