use std::collections::{BTreeMap, HashMap};

use crate::types::{Row, SqlValue, TableRecord};

/// Anything that can be inserted as a single row.
pub trait RowSource {
    /// Column names, in any order.
    fn column_names(&self) -> Vec<&str>;

    /// The value of `column` as a native scalar, ready to bind.
    fn native_value(&self, column: &str) -> Option<SqlValue>;
}

impl RowSource for Row {
    fn column_names(&self) -> Vec<&str> {
        self.columns()
    }

    fn native_value(&self, column: &str) -> Option<SqlValue> {
        self.try_get(column).cloned()
    }
}

impl RowSource for TableRecord<'_> {
    fn column_names(&self) -> Vec<&str> {
        TableRecord::column_names(self)
            .iter()
            .map(|s| s.as_str())
            .collect()
    }

    fn native_value(&self, column: &str) -> Option<SqlValue> {
        self.get(column).cloned()
    }
}

impl<V> RowSource for HashMap<String, V>
where
    V: Clone + Into<SqlValue>,
{
    fn column_names(&self) -> Vec<&str> {
        self.keys().map(|k| k.as_str()).collect()
    }

    fn native_value(&self, column: &str) -> Option<SqlValue> {
        self.get(column).cloned().map(Into::into)
    }
}

impl<V> RowSource for BTreeMap<String, V>
where
    V: Clone + Into<SqlValue>,
{
    fn column_names(&self) -> Vec<&str> {
        self.keys().map(|k| k.as_str()).collect()
    }

    fn native_value(&self, column: &str) -> Option<SqlValue> {
        self.get(column).cloned().map(Into::into)
    }
}
