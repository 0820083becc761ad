mod backend;
mod driver;
mod row_source;

pub use backend::{BackendKind, BindShape};
pub use driver::DatabaseDriver;
pub use row_source::RowSource;
