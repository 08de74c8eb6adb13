#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::missing_errors_doc
)]

//! A read-only reader for the `SQLite` on-disk file format.
//!
//! The crate opens an existing database file and answers a small family of
//! queries: listing tables, counting tables and rows, and executing simple
//! single-table `SELECT` statements (projection, equality `WHERE`,
//! `COUNT(*)`). It never writes.
//!
//! # Example
//!
//! ```no_run
//! use sqlite_reader::{Database, Error, QueryOutput, SelectStatement};
//!
//! fn main() -> Result<(), Error> {
//!     let mut db = Database::open("example.db")?;
//!
//!     for table in db.list_tables() {
//!         println!("table: {table}");
//!     }
//!
//!     let stmt = SelectStatement::parse("SELECT name FROM users WHERE id = 1")?;
//!     if let QueryOutput::Rows(rows) = db.execute(&stmt)? {
//!         for row in rows {
//!             println!("{}", row.join("|"));
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod btree;
pub mod database;
pub mod error;
pub mod format;
pub mod page;
pub mod pager;
pub mod query;
pub mod record;
pub mod schema;
pub mod statement;
pub mod varint;

pub use database::Database;
pub use error::{Error, Result};
pub use query::QueryOutput;
pub use statement::{Projection, SelectStatement};

// Re-export commonly used types
pub use format::{FileHeader, PageType};
pub use page::{IndexLeafCell, Page, TableLeafCell};
pub use pager::Pager;
pub use record::{Field, SerialType};
pub use schema::{Catalog, IndexSchema, TableSchema};
