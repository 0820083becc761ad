//! Query Sybase by running the `sqsh` command-line client.
//!
//! Each call is one independent process: spawn, wait, parse the CSV it
//! printed. There is no persistent session and no retry.
//!
//! ```no_run
//! use dbirs::{ConnectOptions, Sqsh};
//!
//! let sqsh = Sqsh::new(ConnectOptions::new())?;
//! if let Some(row) = sqsh.fetch_one("select * from aspect_1 where obsid=5438 and revision=1")? {
//!     println!("{:?}", row.get("ascdsver")?);
//! }
//! # Ok::<(), dbirs::DbiError>(())
//! ```

use std::path::PathBuf;
use std::process::{Command, Stdio};

use secrecy::{ExposeSecret, SecretString};

use crate::config::{ConnectOptions, SqshConfig, SYBASE_ENV};
use crate::credentials::{self, CredentialKey};
use crate::drivers::SybaseBackend;
use crate::error::{DbiError, Result};
use crate::types::{ColumnTable, RawQueryResult, Row, SqlValue};

/// How `sqsh` is given the account password.
#[derive(Debug, Clone)]
pub enum SqshAuth {
    /// Passed with `-P`.
    Password(SecretString),
    /// A runtime-config file exported as `SQSHRC`.
    RcFile(PathBuf),
}

#[derive(Debug, Clone)]
pub struct Sqsh {
    server: String,
    user: String,
    database: String,
    auth: SqshAuth,
    config: SqshConfig,
    verbose: bool,
}

impl Sqsh {
    /// Prepare a client for the server, user and database in `options`
    /// (Sybase defaults where unset).
    ///
    /// Credentials are taken from, in order: the explicit password, the
    /// configured runtime-config file, the `sqsh-<server>-<database>-<user>`
    /// runtime-config file, and the plain password file. With none of these
    /// the result is [`DbiError::NoPassword`].
    pub fn new(options: ConnectOptions) -> Result<Self> {
        let options = options.resolve_defaults(&SybaseBackend);
        let auth = match (&options.password, &options.sqsh.rc_file) {
            (Some(password), _) => SqshAuth::Password(password.clone()),
            (None, Some(rc_file)) => SqshAuth::RcFile(rc_file.clone()),
            (None, None) => {
                let key = key_of(&options);
                let rc_file = key.sqshrc_file(&options.auth_dir);
                if rc_file.exists() {
                    SqshAuth::RcFile(rc_file)
                } else if let Some(found) =
                    credentials::resolve_opportunistic(&options.auth_dir, &key)
                {
                    SqshAuth::Password(found.secret)
                } else {
                    return Err(DbiError::NoPassword(format!(
                        "none supplied and neither {} nor {} is readable",
                        rc_file.display(),
                        key.password_file(&options.auth_dir).display()
                    )));
                }
            }
        };
        Self::with_auth(&options, auth)
    }

    /// Build a client with credentials already settled. `options` must carry
    /// server, user and database.
    pub(crate) fn with_auth(options: &ConnectOptions, auth: SqshAuth) -> Result<Self> {
        let config = options.sqsh.clone();
        if !config.sybase_root.exists() {
            return Err(DbiError::ConnectionFailed(format!(
                "SYBASE does not exist: {}",
                config.sybase_root.display()
            )));
        }
        if !config.bin.exists() {
            return Err(DbiError::ConnectionFailed(format!(
                "sqsh does not exist: {}",
                config.bin.display()
            )));
        }

        Ok(Self {
            server: options.server.clone().unwrap_or_default(),
            user: options.user.clone().unwrap_or_default(),
            database: options.database.clone().unwrap_or_default(),
            auth,
            config,
            verbose: options.verbose,
        })
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    fn command(&self, query: &str) -> Command {
        let mut cmd = Command::new(&self.config.bin);
        cmd.args(["-X", "-S", &self.server, "-U", &self.user, "-D", &self.database])
            .args(["-m", "csv", "-C", query]);
        if let SqshAuth::Password(password) = &self.auth {
            cmd.args(["-P", password.expose_secret()]);
        }

        cmd.env(SYBASE_ENV, &self.config.sybase_root)
            .env("LD_LIBRARY_PATH", self.config.library_path());
        if let SqshAuth::RcFile(path) = &self.auth {
            cmd.env("SQSHRC", path);
        }

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }

    /// Run `query` and return the raw output lines.
    pub fn fetch_lines(&self, query: &str) -> Result<Vec<String>> {
        let program = self.config.bin.display().to_string();
        if self.verbose {
            println!("Running: {query}");
        }
        tracing::debug!(server = %self.server, database = %self.database, query, "running sqsh");

        let output = self
            .command(query)
            .output()
            .map_err(|source| DbiError::Spawn {
                program: program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(DbiError::ExternalProcess {
                program,
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(String::from)
            .collect())
    }

    /// Run `query` and parse the output as a table.
    /// Output with no data rows yields `None`.
    pub fn fetch_all(&self, query: &str) -> Result<Option<ColumnTable>> {
        let lines = self.fetch_lines(query)?;
        if lines.len() <= 1 {
            return Ok(None);
        }
        Ok(Some(ColumnTable::from_raw(parse_csv(&lines)?)))
    }

    /// First row of [`Sqsh::fetch_all`].
    pub fn fetch_one(&self, query: &str) -> Result<Option<Row>> {
        Ok(self
            .fetch_all(query)?
            .and_then(|table| table.record(0).map(|r| r.to_row())))
    }
}

fn key_of(options: &ConnectOptions) -> CredentialKey<'_> {
    CredentialKey::new(
        options.server.as_deref().unwrap_or_default(),
        options.database.as_deref().unwrap_or_default(),
        options.user.as_deref().unwrap_or_default(),
    )
}

/// Parse CSV lines (header first) into a typed result.
///
/// Each column is typed as a whole: integer if every non-empty cell parses as
/// one, else float, else text. Empty cells are NULL.
pub(crate) fn parse_csv(lines: &[String]) -> Result<RawQueryResult> {
    if lines.is_empty() {
        return Ok(RawQueryResult::empty());
    }

    let text = lines.join("\n");
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let columns: Vec<String> = reader.headers()?.iter().map(String::from).collect();
    let mut cells: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        cells.push(record?.iter().map(String::from).collect());
    }

    let kinds: Vec<CellKind> = (0..columns.len())
        .map(|i| CellKind::infer(cells.iter().map(|row| row[i].as_str())))
        .collect();

    let rows = cells
        .into_iter()
        .map(|row| {
            row.into_iter()
                .zip(&kinds)
                .map(|(cell, kind)| kind.convert(cell))
                .collect()
        })
        .collect();

    Ok(RawQueryResult::new(columns, rows))
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CellKind {
    Integer,
    Float,
    Text,
}

impl CellKind {
    fn infer<'a>(cells: impl Iterator<Item = &'a str> + Clone) -> Self {
        let mut present = cells.filter(|c| !c.is_empty());
        if present.clone().all(|c| c.parse::<i64>().is_ok()) {
            CellKind::Integer
        } else if present.all(|c| c.parse::<f64>().is_ok()) {
            CellKind::Float
        } else {
            CellKind::Text
        }
    }

    fn convert(self, cell: String) -> SqlValue {
        if cell.is_empty() {
            return SqlValue::Null;
        }
        match self {
            CellKind::Integer => cell.parse().map(SqlValue::Integer).unwrap_or(SqlValue::Text(cell)),
            CellKind::Float => cell.parse().map(SqlValue::Float).unwrap_or(SqlValue::Text(cell)),
            CellKind::Text => SqlValue::Text(cell),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsStr;

    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(String::from).collect()
    }

    fn installed(dir: &std::path::Path) -> ConnectOptions {
        let bin = dir.join("sqsh.bin");
        std::fs::write(&bin, "").unwrap();
        ConnectOptions::new()
            .with_auth_dir(dir)
            .with_sqsh(SqshConfig::default().with_bin(bin).with_sybase_root(dir))
    }

    fn env_of<'a>(cmd: &'a Command, key: &str) -> Option<&'a OsStr> {
        cmd.get_envs()
            .find(|(k, _)| *k == OsStr::new(key))
            .and_then(|(_, v)| v)
    }

    #[test]
    fn test_parse_csv_infers_column_types() {
        let raw = parse_csv(&lines(
            "obsid,revision,ascdsver,tstart,note\n\
             5438,1,7.6.3,1.5,\n\
             5438,2,8.0,2,hi",
        ))
        .unwrap();

        assert_eq!(raw.columns, ["obsid", "revision", "ascdsver", "tstart", "note"]);
        assert_eq!(
            raw.rows[0],
            vec![
                SqlValue::Integer(5438),
                SqlValue::Integer(1),
                SqlValue::Text("7.6.3".into()),
                SqlValue::Float(1.5),
                SqlValue::Null,
            ]
        );
        assert_eq!(raw.rows[1][3], SqlValue::Float(2.0));
        assert_eq!(raw.rows[1][4], SqlValue::Text("hi".into()));
    }

    #[test]
    fn test_parse_csv_quoted_fields() {
        let raw = parse_csv(&lines("name,comment\n\"a, b\",\"said \"\"hi\"\"\"")).unwrap();
        assert_eq!(raw.rows[0][0], SqlValue::Text("a, b".into()));
        assert_eq!(raw.rows[0][1], SqlValue::Text("said \"hi\"".into()));
    }

    #[test]
    fn test_parse_csv_header_only() {
        let raw = parse_csv(&lines("id,name")).unwrap();
        assert_eq!(raw.columns, ["id", "name"]);
        assert!(raw.rows.is_empty());
        assert_eq!(parse_csv(&[]).unwrap(), RawQueryResult::empty());
    }

    #[test]
    fn test_parse_csv_ragged_row_is_error() {
        assert!(matches!(
            parse_csv(&lines("a,b\n1,2,3")),
            Err(DbiError::Csv(_))
        ));
    }

    #[test]
    fn test_missing_install_is_connection_error() {
        let dir = tempfile::tempdir().unwrap();
        let opts = ConnectOptions::new().with_password("pw").with_sqsh(
            SqshConfig::default()
                .with_bin(dir.path().join("nope"))
                .with_sybase_root(dir.path()),
        );
        let err = Sqsh::new(opts).unwrap_err();
        assert!(matches!(err, DbiError::ConnectionFailed(msg) if msg.contains("sqsh does not exist")));

        let opts = ConnectOptions::new()
            .with_password("pw")
            .with_sqsh(SqshConfig::default().with_sybase_root(dir.path().join("nope")));
        let err = Sqsh::new(opts).unwrap_err();
        assert!(matches!(err, DbiError::ConnectionFailed(msg) if msg.contains("SYBASE does not exist")));
    }

    #[test]
    fn test_defaults_and_password_flag() {
        let dir = tempfile::tempdir().unwrap();
        let sqsh = Sqsh::new(installed(dir.path()).with_password("pw")).unwrap();
        assert_eq!(sqsh.server(), "sqlsao");
        assert_eq!(sqsh.user(), "aca_ops");

        let cmd = sqsh.command("select 1");
        let args: Vec<&OsStr> = cmd.get_args().collect();
        assert_eq!(
            args,
            [
                "-X", "-S", "sqlsao", "-U", "aca_ops", "-D", sqsh.database(), "-m", "csv", "-C",
                "select 1", "-P", "pw"
            ]
            .map(OsStr::new)
        );
        assert_eq!(env_of(&cmd, "SYBASE"), Some(dir.path().as_os_str()));
        assert!(env_of(&cmd, "LD_LIBRARY_PATH").is_some());
        assert!(env_of(&cmd, "SQSHRC").is_none());
    }

    #[test]
    fn test_rc_file_preferred_over_password_file() {
        let dir = tempfile::tempdir().unwrap();
        let opts = installed(dir.path())
            .with_server("srv")
            .with_user("usr")
            .with_database("db");
        let key = CredentialKey::new("srv", "db", "usr");
        std::fs::write(key.sqshrc_file(dir.path()), "\\set password=x\n").unwrap();
        std::fs::write(key.password_file(dir.path()), "pw\n").unwrap();

        let sqsh = Sqsh::new(opts).unwrap();
        let cmd = sqsh.command("select 1");
        assert_eq!(
            env_of(&cmd, "SQSHRC"),
            Some(key.sqshrc_file(dir.path()).as_os_str())
        );
        assert!(!cmd.get_args().any(|a| a == "-P"));
    }

    #[test]
    fn test_explicit_rc_file() {
        let dir = tempfile::tempdir().unwrap();
        let rc_file = dir.path().join("my.sqshrc");
        let mut opts = installed(dir.path());
        opts.sqsh = opts.sqsh.with_rc_file(&rc_file);

        let cmd = Sqsh::new(opts).unwrap().command("select 1");
        assert_eq!(env_of(&cmd, "SQSHRC"), Some(rc_file.as_os_str()));
    }

    #[test]
    fn test_password_file_used_when_no_rc_file() {
        let dir = tempfile::tempdir().unwrap();
        let opts = installed(dir.path())
            .with_server("srv")
            .with_user("usr")
            .with_database("db");
        std::fs::write(
            CredentialKey::new("srv", "db", "usr").password_file(dir.path()),
            "pw\n",
        )
        .unwrap();

        let sqsh = Sqsh::new(opts).unwrap();
        let args: Vec<_> = sqsh.command("q").get_args().map(|a| a.to_owned()).collect();
        assert_eq!(&args[args.len() - 2..], ["-P", "pw"].map(std::ffi::OsString::from));
    }

    #[test]
    fn test_no_credentials_is_no_password() {
        let dir = tempfile::tempdir().unwrap();
        let err = Sqsh::new(installed(dir.path())).unwrap_err();
        assert!(matches!(err, DbiError::NoPassword(_)));
    }
}
