use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::drivers::{SqliteBackend, SybaseBackend};
use crate::error::DbiError;
use crate::traits::BackendKind;

/// The supported database systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Sqlite,
    Sybase,
}

impl Backend {
    /// The capabilities of this backend.
    pub fn kind(self) -> &'static dyn BackendKind {
        match self {
            Backend::Sqlite => &SqliteBackend,
            Backend::Sybase => &SybaseBackend,
        }
    }
}

impl FromStr for Backend {
    type Err = DbiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sqlite" => Ok(Backend::Sqlite),
            "sybase" => Ok(Backend::Sybase),
            other => Err(DbiError::UnsupportedBackend(other.to_string())),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind().name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trips_name() {
        for backend in [Backend::Sqlite, Backend::Sybase] {
            assert_eq!(backend.to_string().parse::<Backend>().unwrap(), backend);
        }
    }

    #[test]
    fn test_unsupported_backend() {
        let err = "postgres".parse::<Backend>().unwrap_err();
        assert!(matches!(err, DbiError::UnsupportedBackend(name) if name == "postgres"));
    }

    #[test]
    fn test_capabilities_by_lookup() {
        assert!(Backend::Sqlite.kind().supports_replace());
        assert!(!Backend::Sybase.kind().supports_replace());
        assert_eq!(Backend::Sqlite.kind().placeholder("id"), "?");
    }
}
