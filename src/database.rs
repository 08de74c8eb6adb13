//! Main database interface

use std::path::Path;

use tracing::debug;

use crate::btree;
use crate::pager::Pager;
use crate::query::{self, QueryOutput};
use crate::schema::{Catalog, TableSchema};
use crate::statement::SelectStatement;
use crate::{Error, Result};

/// A read-only `SQLite` database: the file, its page cache, and the decoded
/// schema catalog.
pub struct Database {
    pager: Pager,
    catalog: Catalog,
}

impl Database {
    /// Open a database file.
    ///
    /// # Errors
    ///
    /// `Error::Io` when the file cannot be read, `Error::Malformed` when the
    /// header or page 1 does not parse, `Error::SchemaMismatch` when a
    /// schema entry disagrees with its SQL text.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut pager = Pager::open(path)?;
        let catalog = Catalog::load(&mut pager)?;
        debug!(tables = catalog.table_count(), "database opened");
        Ok(Self { pager, catalog })
    }

    /// Page size declared by the file header.
    #[must_use]
    pub const fn page_size(&self) -> u32 {
        self.pager.page_size()
    }

    /// Number of user tables.
    #[must_use]
    pub fn table_count(&self) -> usize {
        self.catalog.table_count()
    }

    /// User table names, sorted lexicographically.
    #[must_use]
    pub fn list_tables(&self) -> Vec<String> {
        self.catalog.table_names()
    }

    /// The schema of `table`.
    pub fn table(&self, table: &str) -> Result<&TableSchema> {
        self.catalog.table(table)
    }

    /// Count the rows of `table` by walking its leaf pages.
    pub fn row_count(&mut self, table: &str) -> Result<usize> {
        let schema = self.catalog.table(table)?;
        if schema.root_page == 0 {
            return Err(Error::Malformed(format!("table {table} has root page 0")));
        }
        let root = schema.root_page as usize - 1;
        let mut count = 0usize;
        for leaf in btree::table_leaf_pages(&mut self.pager, root)? {
            count += usize::from(self.pager.read_page(leaf)?.cell_count);
        }
        Ok(count)
    }

    /// Execute an abstract SELECT.
    pub fn execute(&mut self, stmt: &SelectStatement) -> Result<QueryOutput> {
        query::execute_select(&mut self.pager, &self.catalog, stmt)
    }

    /// Parse and execute a SELECT given as SQL text.
    pub fn execute_sql(&mut self, sql: &str) -> Result<QueryOutput> {
        let stmt = SelectStatement::parse(sql)?;
        self.execute(&stmt)
    }

    /// Number of pages fetched from the file so far; a probe for how much
    /// of the file the queries touched.
    #[must_use]
    pub const fn pages_fetched(&self) -> u64 {
        self.pager.fetches()
    }
}
