//! Connection and process-shim configuration.
//!
//! Options can be built in code with the `with_*` setters or loaded from TOML:
//!
//! ```
//! use dbirs::ConnectOptions;
//!
//! let opts = ConnectOptions::from_toml_str(
//!     r#"
//!     server = ":memory:"
//!     columnar = false
//!     "#,
//! )?;
//! assert_eq!(opts.server.as_deref(), Some(":memory:"));
//! assert!(opts.autocommit);
//! # Ok::<(), dbirs::DbiError>(())
//! ```

use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};

use crate::error::Result;
use crate::traits::BackendKind;

/// Directory holding `<server>-<database>-<user>` password files.
pub const DEFAULT_AUTH_DIR: &str = "/proj/sot/ska/data/aspect_authorization";

/// Default Sybase installation root when `SYBASE` is unset.
pub const DEFAULT_SYBASE_ROOT: &str = "/soft/SYBASE16.0";

/// Environment variable naming the Sybase installation root.
pub const SYBASE_ENV: &str = "SYBASE";

pub const DEFAULT_SQSH_BIN: &str = "/usr/local/bin/sqsh.bin";

/// Environment variable overriding the default Sybase database.
pub const DATABASE_ENV: &str = "SKA_DATABASE";

/// Options for [`crate::Connection::open`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConnectOptions {
    /// Server name, or database file path for SQLite (`:memory:` for a
    /// private in-memory database).
    pub server: Option<String>,
    pub user: Option<String>,
    /// Password; read from `auth_dir` when a backend needs one and none is given.
    #[serde(deserialize_with = "deserialize_secret")]
    pub password: Option<SecretString>,
    pub database: Option<String>,
    /// Commit after every execute unless overridden per call.
    pub autocommit: bool,
    /// Return multi-row results as a [`crate::ColumnTable`] instead of rows.
    pub columnar: bool,
    /// Print connection and statement text to stdout.
    pub verbose: bool,
    /// Refuse to create a missing SQLite database file.
    pub require_existing: bool,
    pub auth_dir: PathBuf,
    pub sqsh: SqshConfig,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            server: None,
            user: None,
            password: None,
            database: None,
            autocommit: true,
            columnar: true,
            verbose: false,
            require_existing: false,
            auth_dir: PathBuf::from(DEFAULT_AUTH_DIR),
            sqsh: SqshConfig::default(),
        }
    }
}

impl ConnectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = Some(server.into());
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(SecretString::from(password.into()));
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn with_autocommit(mut self, autocommit: bool) -> Self {
        self.autocommit = autocommit;
        self
    }

    pub fn with_columnar(mut self, columnar: bool) -> Self {
        self.columnar = columnar;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_require_existing(mut self, require_existing: bool) -> Self {
        self.require_existing = require_existing;
        self
    }

    pub fn with_auth_dir(mut self, auth_dir: impl Into<PathBuf>) -> Self {
        self.auth_dir = auth_dir.into();
        self
    }

    pub fn with_sqsh(mut self, sqsh: SqshConfig) -> Self {
        self.sqsh = sqsh;
        self
    }

    /// Fill unset server, user and database from the backend defaults.
    /// The database falls back to `SKA_DATABASE` before the backend default.
    pub(crate) fn resolve_defaults(mut self, backend: &dyn BackendKind) -> Self {
        if self.server.is_none() {
            self.server = backend.default_server().map(String::from);
        }
        if self.user.is_none() {
            self.user = backend.default_user().map(String::from);
        }
        if self.database.is_none() {
            self.database = backend.default_database().and_then(|default| {
                std::env::var(DATABASE_ENV)
                    .ok()
                    .filter(|v| !v.is_empty())
                    .or_else(|| Some(default.to_string()))
            });
        }
        self
    }
}

/// Location of the `sqsh` client and the Sybase client libraries it loads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SqshConfig {
    pub bin: PathBuf,
    /// Value exported as `SYBASE` to the child process.
    pub sybase_root: PathBuf,
    /// Value exported as `LD_LIBRARY_PATH`; derived from `sybase_root` when unset.
    pub library_path: Option<String>,
    /// Runtime-config file exported as `SQSHRC`, used ahead of the files
    /// found in the authorization directory.
    pub rc_file: Option<PathBuf>,
}

/// Same as [`SqshConfig::from_env`].
impl Default for SqshConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl SqshConfig {
    /// Built-in paths, with `sybase_root` taken from `SYBASE` when set and
    /// non-empty.
    pub fn from_env() -> Self {
        let sybase_root = std::env::var_os(SYBASE_ENV)
            .filter(|v| !v.is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_SYBASE_ROOT), PathBuf::from);
        Self {
            bin: PathBuf::from(DEFAULT_SQSH_BIN),
            sybase_root,
            library_path: None,
            rc_file: None,
        }
    }

    pub fn with_bin(mut self, bin: impl Into<PathBuf>) -> Self {
        self.bin = bin.into();
        self
    }

    pub fn with_sybase_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.sybase_root = root.into();
        self
    }

    pub fn with_rc_file(mut self, rc_file: impl Into<PathBuf>) -> Self {
        self.rc_file = Some(rc_file.into());
        self
    }

    pub fn library_path(&self) -> String {
        match &self.library_path {
            Some(path) => path.clone(),
            None => ocs_library_path(&self.sybase_root),
        }
    }
}

fn ocs_library_path(root: &Path) -> String {
    ["lib", "lib3p64", "lib3p"]
        .iter()
        .map(|dir| root.join("OCS-16_0").join(dir).display().to_string())
        .collect::<Vec<_>>()
        .join(":")
}

fn deserialize_secret<'de, D>(deserializer: D) -> std::result::Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = Option::<String>::deserialize(deserializer)?;
    Ok(s.map(SecretString::from))
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;
    use crate::error::DbiError;

    #[test]
    fn test_defaults() {
        let opts = ConnectOptions::default();
        assert!(opts.autocommit);
        assert!(opts.columnar);
        assert!(!opts.verbose);
        assert_eq!(opts.auth_dir, PathBuf::from(DEFAULT_AUTH_DIR));
        assert_eq!(opts.sqsh.bin, PathBuf::from(DEFAULT_SQSH_BIN));
    }

    #[test]
    fn test_from_toml_with_nested_sqsh() {
        let opts = ConnectOptions::from_toml_str(
            r#"
            server = "sqlsao"
            password = "hunter2"
            verbose = true

            [sqsh]
            bin = "/opt/bin/sqsh"
            sybase_root = "/opt/sybase"
            "#,
        )
        .unwrap();

        assert_eq!(opts.server.as_deref(), Some("sqlsao"));
        assert_eq!(opts.password.as_ref().unwrap().expose_secret(), "hunter2");
        assert!(opts.verbose);
        assert_eq!(opts.sqsh.bin, PathBuf::from("/opt/bin/sqsh"));
        assert_eq!(
            opts.sqsh.library_path(),
            "/opt/sybase/OCS-16_0/lib:/opt/sybase/OCS-16_0/lib3p64:/opt/sybase/OCS-16_0/lib3p"
        );
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = ConnectOptions::from_toml_str("servr = \"x\"").unwrap_err();
        assert!(matches!(err, DbiError::Config(_)));
    }

    #[test]
    fn test_password_is_redacted_in_debug() {
        let opts = ConnectOptions::new().with_password("hunter2");
        assert!(!format!("{opts:?}").contains("hunter2"));
    }

    #[test]
    fn test_sybase_root_from_environment() {
        std::env::set_var(SYBASE_ENV, "/opt/custom_sybase");
        let opts = ConnectOptions::new();
        let from_toml = ConnectOptions::from_toml_str("[sqsh]\nbin = \"/opt/bin/sqsh\"").unwrap();
        std::env::remove_var(SYBASE_ENV);

        assert_eq!(opts.sqsh.sybase_root, PathBuf::from("/opt/custom_sybase"));
        assert_eq!(
            opts.sqsh.library_path(),
            "/opt/custom_sybase/OCS-16_0/lib:/opt/custom_sybase/OCS-16_0/lib3p64:/opt/custom_sybase/OCS-16_0/lib3p"
        );
        assert_eq!(from_toml.sqsh.sybase_root, PathBuf::from("/opt/custom_sybase"));
    }

    #[test]
    fn test_explicit_library_path_wins() {
        let config = SqshConfig {
            library_path: Some("/x".into()),
            ..SqshConfig::default()
        };
        assert_eq!(config.library_path(), "/x");
    }
}
