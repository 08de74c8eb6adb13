//! Schema catalog: decoding `sqlite_schema` and linking indices to tables

use std::collections::HashMap;

use sqlparser::ast::{ColumnOption, DataType, Statement};
use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser;
use tracing::{debug, warn};

use crate::btree;
use crate::page::TableLeafCell;
use crate::pager::Pager;
use crate::{Error, Result};

/// The kinds of objects the schema table records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    Table,
    Index,
    View,
    Trigger,
}

impl SchemaKind {
    fn from_raw(raw: &str) -> Option<Self> {
        match raw {
            "table" => Some(Self::Table),
            "index" => Some(Self::Index),
            "view" => Some(Self::View),
            "trigger" => Some(Self::Trigger),
            _ => None,
        }
    }
}

/// One row of the schema table.
#[derive(Debug, Clone)]
pub struct SchemaEntry {
    pub kind: SchemaKind,
    pub name: String,
    pub tbl_name: String,
    /// One-based root page number of the object's B-tree
    pub root_page: u32,
    pub sql: String,
}

impl SchemaEntry {
    fn from_cell(cell: &TableLeafCell) -> Result<Self> {
        if cell.fields.len() < 5 {
            return Err(Error::Malformed(format!(
                "schema record with {} fields",
                cell.fields.len()
            )));
        }
        let raw_kind = cell.fields[0].render();
        let kind = SchemaKind::from_raw(&raw_kind)
            .ok_or_else(|| Error::Malformed(format!("unknown schema object type {raw_kind:?}")))?;
        Ok(Self {
            kind,
            name: cell.fields[1].render(),
            tbl_name: cell.fields[2].render(),
            root_page: cell.fields[3].integer() as u32,
            sql: cell.fields[4].text().unwrap_or_default().to_string(),
        })
    }
}

/// A table with its parsed column layout.
#[derive(Debug, Clone)]
pub struct TableSchema {
    pub name: String,
    pub root_page: u32,
    /// Column names in declaration order
    pub columns: Vec<String>,
    /// Index of the `INTEGER PRIMARY KEY` column, when the table has one;
    /// that column reads back as the rowid.
    pub rowid_alias: Option<usize>,
    /// Names of the indices registered on this table
    pub indices: Vec<String>,
    pub sql: String,
}

impl TableSchema {
    /// Position of `column` in the declaration order.
    #[must_use]
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }
}

/// An index with its parsed column order.
#[derive(Debug, Clone)]
pub struct IndexSchema {
    pub name: String,
    pub table: String,
    pub root_page: u32,
    /// Indexed column names in index order
    pub columns: Vec<String>,
}

/// Everything the schema table declares, decoded once at open.
///
/// Indices refer to their tables by name; the graph is owned here, so there
/// is no ownership cycle between the two.
#[derive(Debug, Default)]
pub struct Catalog {
    tables: HashMap<String, TableSchema>,
    indices: HashMap<String, IndexSchema>,
}

impl Catalog {
    /// Decode the schema B-tree rooted at page 1.
    pub fn load(pager: &mut Pager) -> Result<Self> {
        let mut entries = Vec::new();
        for leaf in btree::table_leaf_pages(pager, 0)? {
            let page = pager.read_page(leaf)?;
            for cell_index in 0..usize::from(page.cell_count) {
                let cell = page.table_leaf_cell(cell_index, None)?;
                entries.push(SchemaEntry::from_cell(&cell)?);
            }
        }

        let mut catalog = Self::default();

        for entry in &entries {
            if entry.kind != SchemaKind::Table {
                continue;
            }
            if entry.name.starts_with("sqlite_") {
                // Internal bookkeeping tables (sqlite_sequence and friends)
                // are not part of the user schema.
                debug!(table = %entry.name, "skipping internal table");
                continue;
            }
            let (columns, rowid_alias) = parse_create_table(&entry.sql)?;
            debug!(table = %entry.name, columns = columns.len(), "cataloged table");
            catalog.tables.insert(
                entry.name.clone(),
                TableSchema {
                    name: entry.name.clone(),
                    root_page: entry.root_page,
                    columns,
                    rowid_alias,
                    indices: Vec::new(),
                    sql: entry.sql.clone(),
                },
            );
        }

        for entry in &entries {
            if entry.kind != SchemaKind::Index {
                continue;
            }
            if entry.name.starts_with("sqlite_") || entry.sql.is_empty() {
                // Automatic indexes (PRIMARY KEY, UNIQUE) carry no SQL; they
                // cannot be matched against predicates, so leave them out.
                debug!(index = %entry.name, "skipping automatic index");
                continue;
            }
            let (table, columns) = parse_create_index(&entry.sql)?;
            match catalog.tables.get_mut(&table) {
                Some(table_schema) => {
                    table_schema.indices.push(entry.name.clone());
                    catalog.indices.insert(
                        entry.name.clone(),
                        IndexSchema {
                            name: entry.name.clone(),
                            table,
                            root_page: entry.root_page,
                            columns,
                        },
                    );
                }
                None => {
                    warn!(index = %entry.name, table = %table, "index references unknown table");
                }
            }
        }

        Ok(catalog)
    }

    /// Look up a table by name.
    pub fn table(&self, name: &str) -> Result<&TableSchema> {
        self.tables
            .get(name)
            .ok_or_else(|| Error::UnknownName(name.to_string()))
    }

    /// The indices registered on `table`, in registration order.
    #[must_use]
    pub fn table_indices(&self, table: &TableSchema) -> Vec<&IndexSchema> {
        table
            .indices
            .iter()
            .filter_map(|name| self.indices.get(name))
            .collect()
    }

    /// User table names, sorted lexicographically.
    #[must_use]
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of user tables.
    #[must_use]
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }
}

/// Extract the ordered column list and the rowid-alias column from a
/// CREATE TABLE statement.
///
/// The alias rule is the formal one: a column whose declared type is
/// `INTEGER` carrying a PRIMARY KEY constraint, with or without
/// AUTOINCREMENT. `INT` does not qualify.
fn parse_create_table(sql: &str) -> Result<(Vec<String>, Option<usize>)> {
    let dialect = SQLiteDialect {};
    let statements = Parser::parse_sql(&dialect, sql)
        .map_err(|e| Error::SchemaMismatch(format!("cannot parse schema SQL: {e}")))?;
    if statements.len() != 1 {
        return Err(Error::SchemaMismatch(
            "schema entry holds more than one statement".into(),
        ));
    }

    let Statement::CreateTable(create) = &statements[0] else {
        return Err(Error::SchemaMismatch(format!(
            "table entry does not hold a CREATE TABLE: {sql}"
        )));
    };

    let mut columns = Vec::with_capacity(create.columns.len());
    let mut rowid_alias = None;
    for (position, column) in create.columns.iter().enumerate() {
        columns.push(column.name.value.clone());

        let is_integer = matches!(column.data_type, DataType::Integer(_));
        let is_primary_key = column.options.iter().any(|def| {
            matches!(
                def.option,
                ColumnOption::Unique {
                    is_primary: true,
                    ..
                }
            )
        });
        if rowid_alias.is_none() && is_integer && is_primary_key {
            rowid_alias = Some(position);
        }
    }

    Ok((columns, rowid_alias))
}

/// Extract the target table and ordered column list from a CREATE INDEX
/// statement.
///
/// This routine uses string scanning instead of the full SQL parser because
/// sqlparser's CreateIndex support is experimental and may break between
/// versions. It handles the forms
///     CREATE [UNIQUE] INDEX idx ON tbl (col1, col2, ...)
///     CREATE INDEX IF NOT EXISTS idx ON "tbl" ( `col1` , `col2` )
fn parse_create_index(sql: &str) -> Result<(String, Vec<String>)> {
    let lowercase = sql.to_lowercase();
    let head = lowercase.split('(').next().unwrap_or("");
    if !head.trim_start().starts_with("create") || !head.contains("index") {
        return Err(Error::SchemaMismatch(format!(
            "index entry does not hold a CREATE INDEX: {sql}"
        )));
    }

    let on_pos = lowercase
        .find(" on ")
        .ok_or_else(|| Error::SchemaMismatch("CREATE INDEX missing 'ON'".into()))?;
    let after_on = sql[on_pos + 4..].trim_start();

    let mut table = String::new();
    for ch in after_on.chars() {
        if ch.is_whitespace() || ch == '(' {
            break;
        }
        table.push(ch);
    }
    let table = table.trim_matches('"').trim_matches('`').to_string();
    if table.is_empty() {
        return Err(Error::SchemaMismatch(
            "cannot parse table name from CREATE INDEX".into(),
        ));
    }

    let paren_start = after_on
        .find('(')
        .ok_or_else(|| Error::SchemaMismatch("CREATE INDEX missing column list".into()))?;
    let paren_end_rel = after_on[paren_start + 1..]
        .find(')')
        .ok_or_else(|| Error::SchemaMismatch("CREATE INDEX missing closing ')'".into()))?;
    let cols_segment = &after_on[paren_start + 1..paren_start + 1 + paren_end_rel];

    let columns: Vec<String> = cols_segment
        .split(',')
        .map(|s| s.trim().trim_matches('`').trim_matches('"').to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if columns.is_empty() {
        return Err(Error::SchemaMismatch("CREATE INDEX has no columns".into()));
    }

    Ok((table, columns))
}
