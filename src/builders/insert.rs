use crate::error::{DbiError, Result};
use crate::traits::{BackendKind, BindShape, RowSource};
use crate::types::{Params, SqlValue};

/// Builds a single-row INSERT for a given backend.
///
/// Columns are always emitted in alphabetical order so the statement text
/// does not depend on how the row stores its keys.
pub struct Insert<'a> {
    table: &'a str,
    columns: Vec<&'a str>,
    values: Vec<SqlValue>,
    replace: bool,
}

impl<'a> Insert<'a> {
    pub fn new<R: RowSource + ?Sized>(row: &'a R, table: &'a str) -> Self {
        let mut columns = row.column_names();
        columns.sort_unstable();
        columns.dedup();
        let values = columns
            .iter()
            .map(|c| row.native_value(c).unwrap_or(SqlValue::Null))
            .collect();
        Self {
            table,
            columns,
            values,
            replace: false,
        }
    }

    /// Use `INSERT OR REPLACE`.
    pub fn replace(mut self, replace: bool) -> Self {
        self.replace = replace;
        self
    }

    /// Build the SQL string and parameters for `backend`.
    pub fn build_sql(self, backend: &dyn BackendKind) -> Result<(String, Params)> {
        if self.replace && !backend.supports_replace() {
            return Err(DbiError::UnsupportedOperation(format!(
                "replace=true is not allowed for the {} backend",
                backend.name()
            )));
        }

        let placeholders: Vec<String> = self
            .columns
            .iter()
            .map(|c| backend.placeholder(c))
            .collect();

        let mut sql = String::with_capacity(64);
        sql.push_str(if self.replace {
            "INSERT OR REPLACE INTO "
        } else {
            "INSERT INTO "
        });
        sql.push_str(self.table);
        sql.push_str(" (");
        sql.push_str(&self.columns.join(","));
        sql.push_str(") VALUES (");
        sql.push_str(&placeholders.join(","));
        sql.push(')');

        let params = match backend.bind_shape() {
            BindShape::Positional => Params::Positional(self.values),
            BindShape::Named => Params::Named(placeholders.into_iter().zip(self.values).collect()),
        };

        Ok((sql, params))
    }
}
