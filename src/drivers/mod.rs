mod sqlite;
mod sybase;

pub use self::in_memory_test::{InMemoryTestDriver, InMemoryTestResponseBuilder, RecordedQuery};
pub use self::sqlite::{SqliteBackend, SqliteDriver, MEMORY};
pub use self::sybase::{SybaseBackend, SybaseDriver};
