use std::path::Path;

use rusqlite::types::ToSql;
use rusqlite::Connection;

use crate::config::ConnectOptions;
use crate::error::{DbiError, Result};
use crate::traits::{BackendKind, BindShape, DatabaseDriver};
use crate::types::{Params, RawQueryResult, SqlValue};

/// Name SQLite reserves for a private in-memory database.
pub const MEMORY: &str = ":memory:";

/// The embedded SQLite backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteBackend;

impl BackendKind for SqliteBackend {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn connect(&self, options: &ConnectOptions) -> Result<Box<dyn DatabaseDriver>> {
        let path = options.server.as_deref().unwrap_or(MEMORY);
        let driver = SqliteDriver::open(path, options.require_existing)?;
        Ok(Box::new(driver))
    }

    fn placeholder(&self, _column: &str) -> String {
        "?".to_string()
    }

    fn supports_replace(&self) -> bool {
        true
    }

    fn bind_shape(&self) -> BindShape {
        BindShape::Positional
    }

    fn default_server(&self) -> Option<&'static str> {
        Some("db.sql3")
    }
}

/// SQLite driver implementation using rusqlite.
///
/// `INSERT`, `UPDATE`, `DELETE` and `REPLACE` open a transaction when none is
/// active, so their changes are not durable until [`DatabaseDriver::commit`].
/// Every other statement runs as written, which keeps `VACUUM` and
/// journal-mode pragmas usable.
pub struct SqliteDriver {
    conn: Connection,
}

impl SqliteDriver {
    /// Open (or create) the database file at `path`.
    pub fn open(path: &str, require_existing: bool) -> Result<Self> {
        if require_existing && path != MEMORY && !Path::new(path).exists() {
            return Err(DbiError::ConnectionFailed(format!(
                "Database file {path} does not exist"
            )));
        }
        let conn =
            Connection::open(path).map_err(|e| DbiError::ConnectionFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::open(MEMORY, false)
    }
}

impl DatabaseDriver for SqliteDriver {
    fn execute(&mut self, sql: &str, params: &Params) -> Result<RawQueryResult> {
        let mut stmt = self.conn.prepare(sql)?;
        if opens_transaction(sql) && self.conn.is_autocommit() {
            self.conn.execute_batch("BEGIN")?;
        }

        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();

        let rows = match params {
            Params::None => collect_rows(stmt.query([])?, width)?,
            Params::Positional(values) => {
                collect_rows(stmt.query(rusqlite::params_from_iter(values.iter()))?, width)?
            }
            Params::Named(values) => {
                let named: Vec<(&str, &dyn ToSql)> = values
                    .iter()
                    .map(|(name, value)| (name.as_str(), value as &dyn ToSql))
                    .collect();
                collect_rows(stmt.query(named.as_slice())?, width)?
            }
        };

        Ok(RawQueryResult::new(columns, rows))
    }

    fn commit(&mut self) -> Result<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<()> {
        self.conn.close().map_err(|(_, e)| DbiError::QueryFailed(e))
    }
}

/// Whether `sql` is a data-modifying statement that starts an implicit
/// transaction. Only the leading keyword is inspected.
fn opens_transaction(sql: &str) -> bool {
    let keyword: String = sql
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    ["INSERT", "UPDATE", "DELETE", "REPLACE"]
        .iter()
        .any(|dml| keyword.eq_ignore_ascii_case(dml))
}

fn collect_rows(mut rows: rusqlite::Rows<'_>, width: usize) -> Result<Vec<Vec<SqlValue>>> {
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let values = (0..width)
            .map(|i| row.get::<_, SqlValue>(i))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        out.push(values);
    }
    Ok(out)
}
