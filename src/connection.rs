use std::io::{self, Write};

use crate::backend::Backend;
use crate::builders::Insert;
use crate::config::ConnectOptions;
use crate::error::{DbiError, Result};
use crate::traits::{DatabaseDriver, RowSource};
use crate::types::{Cursor, Params, RawQueryResult, ResultSet, Row};

/// Separator between statements in one `execute` call. A semicolon that is
/// not directly followed by a newline does not split; this is plain text
/// matching, so a `";\n"` inside a string literal or comment splits too.
pub const STATEMENT_SEPARATOR: &str = ";\n";

/// Main entry point for dbirs.
/// Holds one database connection and the cursor of the last statement run.
///
/// # Example
/// ```
/// use dbirs::{params, Backend, ConnectOptions, Connection, Row};
///
/// let mut db = Connection::open(
///     Backend::Sqlite,
///     ConnectOptions::new().with_server(":memory:").with_columnar(false),
/// )?;
/// db.execute("create table t (id integer, name text)", params![], None)?;
/// db.insert(&Row::new().with("id", 1).with("name", "a"), "t", false, None)?;
///
/// let row = db.fetch_one("select * from t where id = ?", params![1])?.unwrap();
/// assert_eq!(row.get("name")?.as_str(), Some("a"));
/// # Ok::<(), dbirs::DbiError>(())
/// ```
pub struct Connection {
    backend: Backend,
    driver: Option<Box<dyn DatabaseDriver>>,
    cursor: Option<Cursor>,
    autocommit: bool,
    columnar: bool,
    /// Where verbose statement echoes go; `None` when not verbose.
    echo: Option<Box<dyn Write + Send>>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("backend", &self.backend)
            .field("autocommit", &self.autocommit)
            .field("columnar", &self.columnar)
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Connect to `backend`. Unset server, user and database take the backend
    /// defaults; a backend that needs a password looks one up in
    /// `options.auth_dir` when none is given.
    pub fn open(backend: Backend, options: ConnectOptions) -> Result<Self> {
        let kind = backend.kind();
        let options = options.resolve_defaults(kind);
        let server = options.server.as_deref().unwrap_or_default();

        if options.verbose {
            println!("{}", connecting_line(backend, server));
        }
        tracing::info!(%backend, server, "connecting");

        let driver = kind.connect(&options)?;
        Ok(Self::with_driver(backend, driver, options))
    }

    /// Create a connection around an already open driver.
    /// Useful for testing or using alternative database drivers.
    pub fn with_driver(
        backend: Backend,
        driver: Box<dyn DatabaseDriver>,
        options: ConnectOptions,
    ) -> Self {
        Self {
            backend,
            driver: Some(driver),
            cursor: None,
            autocommit: options.autocommit,
            columnar: options.columnar,
            echo: options
                .verbose
                .then(|| Box::new(io::stdout()) as Box<dyn Write + Send>),
        }
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn autocommit(&self) -> bool {
        self.autocommit
    }

    pub fn is_closed(&self) -> bool {
        self.driver.is_none()
    }

    fn driver(&mut self) -> Result<&mut Box<dyn DatabaseDriver>> {
        self.driver.as_mut().ok_or(DbiError::ConnectionClosed)
    }

    /// Commit pending work. Does nothing when there is none.
    pub fn commit(&mut self) -> Result<()> {
        self.driver()?.commit()
    }

    /// Run every `";\n"`-separated statement in `sql`, binding `params` to
    /// each. Commits afterwards when `commit` is `Some(true)`, or when it is
    /// `None` and the connection autocommits.
    pub fn execute(&mut self, sql: &str, params: impl Into<Params>, commit: Option<bool>) -> Result<()> {
        self.run(sql, &params.into())?;
        if commit.unwrap_or(self.autocommit) {
            self.commit()?;
        }
        Ok(())
    }

    /// Execute with a fresh cursor holding the last statement's result.
    fn run(&mut self, sql: &str, params: &Params) -> Result<()> {
        self.cursor = None;
        let driver = self.driver.as_mut().ok_or(DbiError::ConnectionClosed)?;
        let echo = &mut self.echo;

        let mut last = RawQueryResult::empty();
        for statement in sql
            .split(STATEMENT_SEPARATOR)
            .filter(|s| !s.trim().is_empty())
        {
            if let Some(out) = echo.as_mut() {
                // Echo failures never fail the statement.
                let _ = writeln!(out, "{}", running_line(statement, params));
            }
            tracing::debug!(statement, %params, "executing");
            last = driver.execute(statement, params)?;
        }

        self.cursor = Some(Cursor::new(last));
        Ok(())
    }

    /// Execute `sql` and yield its rows one at a time.
    ///
    /// Once the rows run out the cursor is released and, with autocommit,
    /// the connection commits.
    pub fn fetch(&mut self, sql: &str, params: impl Into<Params>) -> Result<RowStream<'_>> {
        self.run(sql, &params.into())?;
        Ok(RowStream {
            conn: self,
            done: false,
        })
    }

    /// The first row of [`Connection::fetch`], or `None` when there are no rows.
    pub fn fetch_one(&mut self, sql: &str, params: impl Into<Params>) -> Result<Option<Row>> {
        let first = self.fetch(sql, params)?.next().transpose()?;
        self.cursor = None;
        Ok(first)
    }

    /// Execute `sql` and materialize every row, as a [`ResultSet::Table`]
    /// when the connection is columnar and [`ResultSet::Rows`] otherwise.
    pub fn fetch_all(&mut self, sql: &str, params: impl Into<Params>) -> Result<ResultSet> {
        self.run(sql, &params.into())?;
        let mut cursor = self.cursor.take().unwrap_or_default();
        let rows = cursor.fetch_rest();

        if self.autocommit {
            self.commit()?;
        }

        let columns = cursor.columns().to_vec();
        Ok(ResultSet::materialize(columns, rows, self.columnar))
    }

    /// Insert one row into `table`.
    ///
    /// Fails with [`DbiError::UnsupportedOperation`] before anything is sent
    /// when `replace` is requested from a backend without `INSERT OR REPLACE`.
    pub fn insert<R: RowSource + ?Sized>(
        &mut self,
        row: &R,
        table: &str,
        replace: bool,
        commit: Option<bool>,
    ) -> Result<()> {
        let (sql, params) = Insert::new(row, table)
            .replace(replace)
            .build_sql(self.backend.kind())?;
        self.execute(&sql, params, commit)?;
        self.cursor = None;
        Ok(())
    }

    /// Close the connection, discarding uncommitted work. Later calls fail
    /// with [`DbiError::ConnectionClosed`]; closing again is a no-op.
    pub fn close(&mut self) -> Result<()> {
        self.cursor = None;
        match self.driver.take() {
            Some(driver) => {
                tracing::info!(backend = %self.backend, "closing connection");
                driver.close()
            }
            None => Ok(()),
        }
    }

    /// Run `f` with this connection, then close it on every exit path,
    /// including errors and panics. An error from `f` takes precedence over
    /// one from closing.
    pub fn scoped<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut guard = CloseGuard(self);
        let result = f(&mut *guard.0);
        let closed = guard.0.close();
        match (result, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Err(e), _) | (Ok(_), Err(e)) => Err(e),
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(error = %e, "failed to close connection");
        }
    }
}

fn connecting_line(backend: Backend, server: &str) -> String {
    format!("Connecting to {backend} server {server}")
}

fn running_line(statement: &str, params: &Params) -> String {
    if params.is_empty() {
        format!("Running: {statement}")
    } else {
        format!("Running: {statement} {params}")
    }
}

struct CloseGuard<'a>(&'a mut Connection);

impl Drop for CloseGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.0.close() {
            tracing::warn!(error = %e, "failed to close connection");
        }
    }
}

/// Rows of one query, produced by [`Connection::fetch`].
///
/// Holds the connection exclusively until dropped. Not restartable.
pub struct RowStream<'c> {
    conn: &'c mut Connection,
    done: bool,
}

impl Iterator for RowStream<'_> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Some(row) = self.conn.cursor.as_mut().and_then(Cursor::fetch_one) {
            return Some(Ok(row));
        }

        self.done = true;
        self.conn.cursor = None;
        if self.conn.autocommit {
            if let Err(e) = self.conn.commit() {
                return Some(Err(e));
            }
        }
        None
    }
}
