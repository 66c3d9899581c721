use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of deployable unit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum ServiceKind {
    /// Static site built from a repository and served from a CDN.
    StaticSite,
    /// Containerized server behind a load balancer.
    Server,
}

impl ServiceKind {
    /// Discriminator string as stored in the registry.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StaticSite => "static-site",
            Self::Server => "server",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a stored or supplied kind discriminator is not one of the known kinds.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown service kind '{0}' (expected static-site or server)")]
pub struct UnknownKind(pub String);

impl FromStr for ServiceKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "static-site" => Ok(Self::StaticSite),
            "server" => Ok(Self::Server),
            other => Err(UnknownKind(other.to_string())),
        }
    }
}
