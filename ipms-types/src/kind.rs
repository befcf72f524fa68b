//! Business entity kinds.
//!
//! The host application never tags its lists, so the kind is always derived
//! from record shape (see `ipms_sync::classify`) and never stored.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Inferred business-object category of a record list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// Software copyright registrations.
    Copyrights,
    /// Published papers.
    Papers,
    /// Patent applications and grants.
    Patents,
    /// Shape not recognised; never synchronized.
    Unknown,
}

impl EntityKind {
    /// Kinds that have a server-side resource, in pull order.
    pub const SYNCABLE: [EntityKind; 3] = [Self::Copyrights, Self::Papers, Self::Patents];

    /// Returns true for every kind except `Unknown`.
    #[must_use]
    pub const fn is_known(self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Remote resource name, used as the list endpoint path segment.
    #[must_use]
    pub const fn resource(self) -> Option<&'static str> {
        match self {
            Self::Copyrights => Some("copyrights"),
            Self::Papers => Some("papers"),
            Self::Patents => Some("patents"),
            Self::Unknown => None,
        }
    }

    /// Fixed local-storage key pulled lists are written under.
    ///
    /// The host calls its copyright list "softwares".
    #[must_use]
    pub const fn storage_key(self) -> Option<&'static str> {
        match self {
            Self::Copyrights => Some("ipms_softwares"),
            Self::Papers => Some("ipms_papers"),
            Self::Patents => Some("ipms_patents"),
            Self::Unknown => None,
        }
    }

    /// Record fields that may carry an inline file for this kind.
    #[must_use]
    pub const fn file_fields(self) -> &'static [&'static str] {
        match self {
            Self::Copyrights | Self::Papers => &["file_path"],
            Self::Patents => &["application_file", "certificate_file"],
            Self::Unknown => &[],
        }
    }

    /// Returns the name used in logs and on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Copyrights => "copyrights",
            Self::Papers => "papers",
            Self::Patents => "patents",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "copyrights" => Ok(Self::Copyrights),
            "papers" => Ok(Self::Papers),
            "patents" => Ok(Self::Patents),
            "unknown" => Ok(Self::Unknown),
            other => Err(crate::Error::UnknownKind(other.to_string())),
        }
    }
}
