//! dbirs - one insert/fetch interface over SQLite and Sybase
//!
//! SQLite is reached through `rusqlite`. Sybase is reached by running the
//! `sqsh` command-line client and reading its CSV output, with passwords
//! looked up from an authorization directory when not supplied.
//!
//! # Example
//! ```
//! use dbirs::{params, Backend, ConnectOptions, Connection, Row};
//!
//! let mut db = Connection::open(Backend::Sqlite, ConnectOptions::new().with_server(":memory:"))?;
//! db.scoped(|db| {
//!     db.execute(
//!         "create table obs (id integer primary key, obsid integer);\n\
//!          create index obs_obsid on obs (obsid)",
//!         params![],
//!         None,
//!     )?;
//!     for id in 0..3 {
//!         db.insert(&Row::new().with("id", id).with("obsid", 4 + id), "obs", false, None)?;
//!     }
//!
//!     let rows = db.fetch_all("select * from obs", params![])?;
//!     assert_eq!(rows.len(), 3);
//!
//!     for row in db.fetch("select obsid from obs where id > ?", params![0])? {
//!         println!("{:?}", row?.get("obsid")?);
//!     }
//!     Ok(())
//! })?;
//! assert!(db.is_closed());
//! # Ok::<(), dbirs::DbiError>(())
//! ```

pub mod builders;
pub mod config;
pub mod credentials;
pub mod drivers;
pub mod error;
pub mod sqsh;
pub mod traits;
pub mod types;

mod backend;
mod connection;

// Re-export main types for convenient access
pub use backend::Backend;
pub use config::{ConnectOptions, SqshConfig};
pub use connection::{Connection, RowStream, STATEMENT_SEPARATOR};
pub use error::{DbiError, Result};
pub use sqsh::Sqsh;
pub use traits::{BackendKind, BindShape, DatabaseDriver, RowSource};
pub use types::{ColumnTable, Params, RawQueryResult, ResultSet, Row, SqlValue, TableRecord};
