use crate::config::ConnectOptions;
use crate::error::Result;
use crate::traits::DatabaseDriver;

/// How bound values are handed to the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindShape {
    /// An ordered sequence matching the placeholder order.
    Positional,
    /// A mapping keyed by placeholder name.
    Named,
}

/// The capabilities that differ between supported database systems.
///
/// Each [`crate::Backend`] variant maps to one implementation; callers look the
/// capabilities up instead of branching on the backend name.
pub trait BackendKind: Send + Sync {
    /// Lower-case name used in configuration and messages.
    fn name(&self) -> &'static str;

    /// Open a driver. `options` already carries this backend's defaults.
    fn connect(&self, options: &ConnectOptions) -> Result<Box<dyn DatabaseDriver>>;

    /// The placeholder text standing in for `column` in generated SQL.
    fn placeholder(&self, column: &str) -> String;

    /// Whether `INSERT OR REPLACE` is understood by the database.
    fn supports_replace(&self) -> bool;

    fn bind_shape(&self) -> BindShape;

    fn default_server(&self) -> Option<&'static str> {
        None
    }

    fn default_user(&self) -> Option<&'static str> {
        None
    }

    fn default_database(&self) -> Option<&'static str> {
        None
    }
}
