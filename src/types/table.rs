use crate::types::{RawQueryResult, Row, SqlValue};

/// Column-major table, the bulk form of a multi-row result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnTable {
    names: Vec<String>,
    columns: Vec<Vec<SqlValue>>,
}

impl ColumnTable {
    /// Creates an empty table with the given column names.
    pub fn new(names: Vec<String>) -> Self {
        let columns = vec![Vec::new(); names.len()];
        Self { names, columns }
    }

    /// Transposes row-major driver output into columns.
    pub fn from_raw(raw: RawQueryResult) -> Self {
        let mut table = Self::new(raw.columns);
        for row in raw.rows {
            table.push_row(row);
        }
        table
    }

    /// Builds a table from rows, taking the column order of the first row.
    /// Cells missing from later rows become NULL.
    pub fn from_rows(rows: &[Row]) -> Self {
        let names: Vec<String> = rows
            .first()
            .map(|r| r.columns().into_iter().map(String::from).collect())
            .unwrap_or_default();
        let mut table = Self::new(names);
        for row in rows {
            let values = table
                .names
                .iter()
                .map(|name| row.try_get(name).cloned().unwrap_or(SqlValue::Null))
                .collect();
            table.push_row(values);
        }
        table
    }

    /// Appends one row. Short rows are padded with NULL; extra cells are dropped.
    pub fn push_row(&mut self, values: Vec<SqlValue>) {
        let mut values = values.into_iter();
        for column in &mut self.columns {
            column.push(values.next().unwrap_or(SqlValue::Null));
        }
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    /// Returns all values of one column.
    pub fn column(&self, name: &str) -> Option<&[SqlValue]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.columns[i].as_slice())
    }

    pub fn num_columns(&self) -> usize {
        self.names.len()
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }

    /// Returns a view of row `index`.
    pub fn record(&self, index: usize) -> Option<TableRecord<'_>> {
        (index < self.num_rows()).then_some(TableRecord { table: self, index })
    }

    pub fn records(&self) -> impl Iterator<Item = TableRecord<'_>> {
        (0..self.num_rows()).map(move |index| TableRecord { table: self, index })
    }

    /// Returns a new table holding only the records matching `predicate`.
    pub fn filter<F>(&self, mut predicate: F) -> ColumnTable
    where
        F: FnMut(&TableRecord<'_>) -> bool,
    {
        let mut out = ColumnTable::new(self.names.clone());
        for record in self.records().filter(|r| predicate(r)) {
            out.push_row(record.values());
        }
        out
    }

    pub fn to_rows(&self) -> Vec<Row> {
        self.records().map(|r| r.to_row()).collect()
    }
}

/// Borrowed view of a single row of a [`ColumnTable`].
#[derive(Debug, Clone, Copy)]
pub struct TableRecord<'a> {
    table: &'a ColumnTable,
    index: usize,
}

impl<'a> TableRecord<'a> {
    pub fn get(&self, column: &str) -> Option<&'a SqlValue> {
        self.table.column(column).map(|values| &values[self.index])
    }

    pub fn column_names(&self) -> &'a [String] {
        &self.table.names
    }

    pub fn values(&self) -> Vec<SqlValue> {
        self.table
            .columns
            .iter()
            .map(|c| c[self.index].clone())
            .collect()
    }

    pub fn to_row(&self) -> Row {
        Row::from_parts(&self.table.names, self.values())
    }
}
