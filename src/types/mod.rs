mod params;
mod row;
mod sql_value;
mod table;

pub use params::Params;
pub(crate) use row::Cursor;
pub use row::{RawQueryResult, ResultSet, Row};
pub use sql_value::SqlValue;
pub use table::{ColumnTable, TableRecord};
