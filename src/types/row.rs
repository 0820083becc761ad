use std::collections::VecDeque;

use crate::error::{DbiError, Result};
use crate::types::{ColumnTable, SqlValue};

/// Driver-agnostic raw result from a single statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawQueryResult {
    /// Column names in projection order
    pub columns: Vec<String>,
    /// Rows, where each row is a vector of values in column order
    pub rows: Vec<Vec<SqlValue>>,
}

impl RawQueryResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<SqlValue>>) -> Self {
        Self { columns, rows }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

/// The pending result set of the most recent execute call.
///
/// A connection holds at most one cursor; executing again replaces it and
/// every fetch-family call releases it once done.
#[derive(Debug, Default)]
pub(crate) struct Cursor {
    columns: Vec<String>,
    pending: VecDeque<Vec<SqlValue>>,
}

impl Cursor {
    pub(crate) fn new(raw: RawQueryResult) -> Self {
        Self {
            columns: raw.columns,
            pending: raw.rows.into(),
        }
    }

    pub(crate) fn columns(&self) -> &[String] {
        &self.columns
    }

    pub(crate) fn fetch_one(&mut self) -> Option<Row> {
        self.pending
            .pop_front()
            .map(|values| Row::from_parts(&self.columns, values))
    }

    pub(crate) fn fetch_rest(&mut self) -> Vec<Vec<SqlValue>> {
        self.pending.drain(..).collect()
    }
}

/// A single row: column names mapped to values, in projection order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<SqlValue>,
}

impl Row {
    /// Creates an empty row, to be filled with [`Row::with`] or [`Row::set`].
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(columns: &[String], values: Vec<SqlValue>) -> Self {
        Self {
            columns: columns.to_vec(),
            values,
        }
    }

    /// Builder-style [`Row::set`].
    pub fn with(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.set(column, value);
        self
    }

    /// Sets a column, returning the previous value if the column existed.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Option<SqlValue> {
        let column = column.into();
        let value = value.into();
        match self.position(&column) {
            Some(i) => Some(std::mem::replace(&mut self.values[i], value)),
            None => {
                self.columns.push(column);
                self.values.push(value);
                None
            }
        }
    }

    /// Gets a value by column name.
    pub fn get(&self, column: &str) -> Result<&SqlValue> {
        self.try_get(column)
            .ok_or_else(|| DbiError::ColumnNotFound(column.to_string()))
    }

    pub fn try_get(&self, column: &str) -> Option<&SqlValue> {
        self.position(column).map(|i| &self.values[i])
    }

    /// Returns all column names in this row.
    pub fn columns(&self) -> Vec<&str> {
        self.columns.iter().map(|s| s.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.columns
            .iter()
            .map(|s| s.as_str())
            .zip(self.values.iter())
    }

    /// Returns the number of columns in this row.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if this row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }
}

/// Materialized result of a fetch-all call.
///
/// Which variant is produced depends on the connection's `columnar` option.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultSet {
    Rows(Vec<Row>),
    Table(ColumnTable),
}

impl ResultSet {
    pub(crate) fn materialize(columns: Vec<String>, rows: Vec<Vec<SqlValue>>, columnar: bool) -> Self {
        if columnar {
            ResultSet::Table(ColumnTable::from_raw(RawQueryResult::new(columns, rows)))
        } else {
            ResultSet::Rows(
                rows.into_iter()
                    .map(|values| Row::from_parts(&columns, values))
                    .collect(),
            )
        }
    }

    /// Returns the number of rows in this result.
    pub fn len(&self) -> usize {
        match self {
            ResultSet::Rows(rows) => rows.len(),
            ResultSet::Table(table) => table.num_rows(),
        }
    }

    /// Returns true if this result contains no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns row `index` as a [`Row`], whichever shape the result has.
    pub fn row(&self, index: usize) -> Option<Row> {
        match self {
            ResultSet::Rows(rows) => rows.get(index).cloned(),
            ResultSet::Table(table) => table.record(index).map(|r| r.to_row()),
        }
    }

    /// Extracts a single row from the result.
    /// Returns an error if the result contains zero or more than one row.
    pub fn single_row(self) -> Result<Row> {
        let actual = self.len();
        if actual != 1 {
            return Err(DbiError::UnexpectedRowCount {
                expected: 1,
                actual,
            });
        }
        self.into_rows()
            .pop()
            .ok_or(DbiError::UnexpectedRowCount {
                expected: 1,
                actual: 0,
            })
    }

    pub fn into_rows(self) -> Vec<Row> {
        match self {
            ResultSet::Rows(rows) => rows,
            ResultSet::Table(table) => table.to_rows(),
        }
    }

    pub fn into_table(self) -> ColumnTable {
        match self {
            ResultSet::Rows(rows) => ColumnTable::from_rows(&rows),
            ResultSet::Table(table) => table,
        }
    }
}
