use crate::error::Result;
use crate::types::{Params, RawQueryResult};

/// Trait for database driver implementations.
/// Drivers are responsible for:
/// - Holding the live connection to the database
/// - Converting SqlValue parameters to native types
/// - Executing one statement and converting its result to RawQueryResult
pub trait DatabaseDriver: Send {
    /// Execute a single SQL statement with the given parameters.
    /// Statements that produce no result set return an empty RawQueryResult.
    fn execute(&mut self, sql: &str, params: &Params) -> Result<RawQueryResult>;

    /// Commit pending work. Must be a no-op when nothing is pending.
    fn commit(&mut self) -> Result<()>;

    /// Close the underlying connection, discarding uncommitted work.
    fn close(self: Box<Self>) -> Result<()>;
}
