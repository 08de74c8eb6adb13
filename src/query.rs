//! Query execution: scan-strategy selection, filtering, projection

use tracing::debug;

use crate::btree;
use crate::page::TableLeafCell;
use crate::pager::Pager;
use crate::schema::{Catalog, IndexSchema, TableSchema};
use crate::statement::{Projection, SelectStatement};
use crate::{Error, Result};

/// The result of executing a SELECT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutput {
    /// Projected rows, every field rendered to text
    Rows(Vec<Vec<String>>),
    /// `COUNT(*)` result
    Count(usize),
}

fn root_index(table: &TableSchema) -> Result<usize> {
    if table.root_page == 0 {
        return Err(Error::Malformed(format!(
            "table {} has root page 0",
            table.name
        )));
    }
    Ok(table.root_page as usize - 1)
}

/// Execute an abstract SELECT against the catalog and pager.
pub fn execute_select(
    pager: &mut Pager,
    catalog: &Catalog,
    stmt: &SelectStatement,
) -> Result<QueryOutput> {
    let table = catalog.table(&stmt.table)?;

    // Resolve predicate columns up front so an unknown name surfaces no
    // matter which strategy runs.
    let mut predicates = Vec::with_capacity(stmt.predicates.len());
    for (column, literal) in &stmt.predicates {
        let index = table
            .column_index(column)
            .ok_or_else(|| Error::UnknownName(format!("{}.{column}", table.name)))?;
        predicates.push((index, literal.as_str()));
    }

    let candidates = collect_candidates(pager, catalog, table, stmt)?;
    let rows: Vec<TableLeafCell> = candidates
        .into_iter()
        .filter(|cell| matches_predicates(cell, table, &predicates))
        .collect();

    match &stmt.projection {
        Projection::CountStar => Ok(QueryOutput::Count(rows.len())),
        Projection::All => {
            let indices: Vec<usize> = (0..table.columns.len()).collect();
            Ok(QueryOutput::Rows(project(&rows, &indices)))
        }
        Projection::Columns(names) => {
            let mut indices = Vec::with_capacity(names.len());
            for name in names {
                let index = table
                    .column_index(name)
                    .ok_or_else(|| Error::UnknownName(format!("{}.{name}", table.name)))?;
                indices.push(index);
            }
            Ok(QueryOutput::Rows(project(&rows, &indices)))
        }
    }
}

/// Produce candidate rows by the cheapest applicable strategy: rowid
/// lookup, then index prefix scan with rowid fan-out, then full table scan.
fn collect_candidates(
    pager: &mut Pager,
    catalog: &Catalog,
    table: &TableSchema,
    stmt: &SelectStatement,
) -> Result<Vec<TableLeafCell>> {
    let root = root_index(table)?;

    if let Some(alias) = table.rowid_alias
        && let Some(literal) = stmt.binding(&table.columns[alias])
    {
        let rowids = parse_rowid_list(literal)?;
        debug!(table = %table.name, rowids = rowids.len(), "strategy: rowid lookup");
        let found = btree::lookup_rowids(pager, root, &rowids, table.rowid_alias)?;
        return Ok(found.into_values().collect());
    }

    if let Some((index, prefix)) = best_index(catalog, table, stmt) {
        debug!(
            table = %table.name,
            index = %index.name,
            bound = prefix.len(),
            "strategy: index prefix scan"
        );
        let entries = btree::index_prefix_scan(pager, root_of(index)?, &prefix)?;
        let mut rowids = Vec::with_capacity(entries.len());
        for entry in &entries {
            rowids.push(entry.rowid()?);
        }
        rowids.sort_unstable();
        rowids.dedup();
        let found = btree::lookup_rowids(pager, root, &rowids, table.rowid_alias)?;
        return Ok(found.into_values().collect());
    }

    debug!(table = %table.name, "strategy: full table scan");
    let mut out = Vec::new();
    for leaf in btree::table_leaf_pages(pager, root)? {
        let page = pager.read_page(leaf)?;
        for cell_index in 0..usize::from(page.cell_count) {
            out.push(page.table_leaf_cell(cell_index, table.rowid_alias)?);
        }
    }
    Ok(out)
}

fn root_of(index: &IndexSchema) -> Result<usize> {
    if index.root_page == 0 {
        return Err(Error::Malformed(format!(
            "index {} has root page 0",
            index.name
        )));
    }
    Ok(index.root_page as usize - 1)
}

/// Of the table's indices, the one whose leading columns bind the most
/// equality predicates, together with the bound values in index order.
fn best_index<'a>(
    catalog: &'a Catalog,
    table: &TableSchema,
    stmt: &SelectStatement,
) -> Option<(&'a IndexSchema, Vec<String>)> {
    let mut best: Option<(&IndexSchema, Vec<String>)> = None;
    for index in catalog.table_indices(table) {
        let mut prefix = Vec::new();
        for column in &index.columns {
            match stmt.binding(column) {
                Some(literal) => prefix.push(literal.to_string()),
                None => break,
            }
        }
        if !prefix.is_empty()
            && best
                .as_ref()
                .is_none_or(|(_, bound)| prefix.len() > bound.len())
        {
            best = Some((index, prefix));
        }
    }
    best
}

fn parse_rowid_list(literal: &str) -> Result<Vec<i64>> {
    let mut rowids = Vec::new();
    for part in literal.split(',') {
        let rowid = part.trim().parse::<i64>().map_err(|_| {
            Error::Unsupported(format!(
                "rowid predicate must be an integer or integer list, got {literal:?}"
            ))
        })?;
        rowids.push(rowid);
    }
    rowids.sort_unstable();
    rowids.dedup();
    Ok(rowids)
}

/// Apply the full predicate conjunction to one candidate row by rendered
/// text. On the rowid-alias column a comma-separated literal matches any of
/// its components.
fn matches_predicates(
    cell: &TableLeafCell,
    table: &TableSchema,
    predicates: &[(usize, &str)],
) -> bool {
    predicates.iter().all(|&(index, literal)| {
        let rendered = cell.render_column(index);
        if table.rowid_alias == Some(index) && literal.contains(',') {
            literal.split(',').any(|part| part.trim() == rendered)
        } else {
            rendered == literal
        }
    })
}

fn project(rows: &[TableLeafCell], indices: &[usize]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|cell| indices.iter().map(|&i| cell.render_column(i)).collect())
        .collect()
}
