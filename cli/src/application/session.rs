//! Assumed-role session shared by the long-running pollers.

use anyhow::Result;
use chrono::Utc;
use tracing::debug;

use crate::application::ports::CredentialProvider;
use crate::domain::pipeline::Credentials;

/// Holds the current role credentials and assumes the role again once they
/// come within the refresh margin of their expiry.
pub struct RoleSession<'a, P> {
    provider: &'a P,
    creds: Credentials,
}

impl<'a, P: CredentialProvider> RoleSession<'a, P> {
    /// Assume the role for the first time.
    ///
    /// # Errors
    ///
    /// Returns the provider's error if the role cannot be assumed.
    pub async fn start(provider: &'a P) -> Result<Self> {
        let creds = provider.assume_role().await?;
        Ok(Self { provider, creds })
    }

    /// Credentials valid for at least the refresh margin.
    ///
    /// # Errors
    ///
    /// Returns the provider's error if a refresh was due and failed.
    pub async fn credentials(&mut self) -> Result<&Credentials> {
        if self.creds.needs_refresh(Utc::now()) {
            debug!(
                expiration = ?self.creds.expiration,
                "role credentials near expiry, refreshing"
            );
            self.creds = self.provider.assume_role().await?;
        }
        Ok(&self.creds)
    }
}
