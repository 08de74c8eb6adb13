//! B-tree traversals over table and index trees

use std::cmp::Ordering;
use std::collections::BTreeMap;

use tracing::debug;

use crate::format::PageType;
use crate::page::{IndexLeafCell, TableLeafCell};
use crate::pager::Pager;
use crate::{Error, Result};

fn child_index(page_number: u32) -> Result<usize> {
    if page_number == 0 {
        return Err(Error::Malformed("child page number 0".into()));
    }
    Ok(page_number as usize - 1)
}

/// Point lookup of `rowids` (sorted ascending, deduplicated) in the table
/// B-tree rooted at `root_page_index`.
///
/// A single cursor walks the sorted rowids while the tree is descended in
/// key order, so each interior page is entered at most once per matching
/// child and absent rowids are skipped without backtracking.
pub fn lookup_rowids(
    pager: &mut Pager,
    root_page_index: usize,
    rowids: &[i64],
    rowid_alias: Option<usize>,
) -> Result<BTreeMap<i64, TableLeafCell>> {
    debug_assert!(rowids.windows(2).all(|pair| pair[0] < pair[1]));

    let mut found = BTreeMap::new();
    let mut cursor = 0usize;
    descend_for_rowids(
        pager,
        root_page_index,
        rowids,
        &mut cursor,
        rowid_alias,
        &mut found,
    )?;
    debug!(
        requested = rowids.len(),
        matched = found.len(),
        "rowid lookup finished"
    );
    Ok(found)
}

fn descend_for_rowids(
    pager: &mut Pager,
    page_index: usize,
    rowids: &[i64],
    cursor: &mut usize,
    rowid_alias: Option<usize>,
    found: &mut BTreeMap<i64, TableLeafCell>,
) -> Result<()> {
    let page = pager.read_page(page_index)?;
    match page.page_type {
        PageType::LeafTable => {
            for cell_index in 0..usize::from(page.cell_count) {
                if *cursor >= rowids.len() {
                    return Ok(());
                }
                let cell = page.table_leaf_cell(cell_index, rowid_alias)?;
                // Rowids the ordered scan has passed cannot appear later.
                while *cursor < rowids.len() && rowids[*cursor] < cell.rowid {
                    *cursor += 1;
                }
                if *cursor < rowids.len() && rowids[*cursor] == cell.rowid {
                    *cursor += 1;
                    found.insert(cell.rowid, cell);
                }
            }
            Ok(())
        }
        PageType::InteriorTable => {
            for &offset in &page.cell_offsets {
                if *cursor >= rowids.len() {
                    return Ok(());
                }
                let cell = page.table_interior_cell(usize::from(offset))?;
                if rowids[*cursor] <= cell.rowid {
                    descend_for_rowids(
                        pager,
                        child_index(cell.left_page)?,
                        rowids,
                        cursor,
                        rowid_alias,
                        found,
                    )?;
                }
            }
            if *cursor < rowids.len() {
                let right = page
                    .right_most_child
                    .ok_or_else(|| Error::Malformed("interior page without right child".into()))?;
                descend_for_rowids(
                    pager,
                    child_index(right)?,
                    rowids,
                    cursor,
                    rowid_alias,
                    found,
                )?;
            }
            Ok(())
        }
        _ => Err(Error::Malformed("index page inside a table B-tree".into())),
    }
}

/// Enumerate every leaf page of the table B-tree rooted at
/// `root_page_index`, left to right; leaves come back in rowid order.
pub fn table_leaf_pages(pager: &mut Pager, root_page_index: usize) -> Result<Vec<usize>> {
    let mut out = Vec::new();
    collect_leaf_pages(pager, root_page_index, &mut out)?;
    Ok(out)
}

fn collect_leaf_pages(pager: &mut Pager, page_index: usize, out: &mut Vec<usize>) -> Result<()> {
    let page = pager.read_page(page_index)?;
    match page.page_type {
        PageType::LeafTable => {
            out.push(page_index);
            Ok(())
        }
        PageType::InteriorTable => {
            for &offset in &page.cell_offsets {
                let cell = page.table_interior_cell(usize::from(offset))?;
                collect_leaf_pages(pager, child_index(cell.left_page)?, out)?;
            }
            let right = page
                .right_most_child
                .ok_or_else(|| Error::Malformed("interior page without right child".into()))?;
            collect_leaf_pages(pager, child_index(right)?, out)
        }
        _ => Err(Error::Malformed("index page inside a table B-tree".into())),
    }
}

/// Compare an index key against a bound prefix, component-wise.
///
/// All but the last bound component must compare equal; the last counts as
/// equal when the key component starts with it. Comparing tuples rather
/// than a `|`-joined string keeps the order correct when a text component
/// itself contains the join character.
fn compare_key_to_prefix(key: &[String], prefix: &[String]) -> Ordering {
    for (i, bound) in prefix.iter().enumerate() {
        let Some(component) = key.get(i) else {
            return Ordering::Less;
        };
        if i + 1 == prefix.len() {
            return if component.starts_with(bound.as_str()) {
                Ordering::Equal
            } else {
                component.as_str().cmp(bound)
            };
        }
        match component.as_str().cmp(bound) {
            Ordering::Equal => {}
            unequal => return unequal,
        }
    }
    Ordering::Equal
}

/// Collect, in key order, every index entry whose key matches `prefix` from
/// the index B-tree rooted at `root_page_index`.
///
/// Interior separator keys bound their left subtrees, so subtrees entirely
/// below the prefix are skipped and the scan stops at the first key past
/// the prefix region; each emitted payload carries the indexed fields with
/// the table rowid as the final one.
pub fn index_prefix_scan(
    pager: &mut Pager,
    root_page_index: usize,
    prefix: &[String],
) -> Result<Vec<IndexLeafCell>> {
    let mut out = Vec::new();
    scan_index_page(pager, root_page_index, prefix, &mut out)?;
    debug!(matched = out.len(), "index prefix scan finished");
    Ok(out)
}

fn scan_index_page(
    pager: &mut Pager,
    page_index: usize,
    prefix: &[String],
    out: &mut Vec<IndexLeafCell>,
) -> Result<()> {
    let page = pager.read_page(page_index)?;
    match page.page_type {
        PageType::LeafIndex => {
            for cell_index in 0..usize::from(page.cell_count) {
                let cell = page.index_leaf_cell(cell_index)?;
                match compare_key_to_prefix(&cell.key, prefix) {
                    Ordering::Less => {}
                    Ordering::Equal => out.push(cell),
                    // Leaves are sorted; nothing further can match.
                    Ordering::Greater => return Ok(()),
                }
            }
            Ok(())
        }
        PageType::InteriorIndex => {
            for &offset in &page.cell_offsets {
                let cell = page.index_interior_cell(usize::from(offset))?;
                match compare_key_to_prefix(&cell.key, prefix) {
                    // The left subtree holds only keys at or below this
                    // separator, all smaller than the prefix.
                    Ordering::Less => {}
                    Ordering::Equal => {
                        scan_index_page(pager, child_index(cell.left_page)?, prefix, out)?;
                        // The separator itself is a live entry.
                        out.push(IndexLeafCell {
                            payload_size: cell.payload_size,
                            fields: cell.fields,
                            overflow: cell.overflow,
                            key: cell.key,
                        });
                    }
                    Ordering::Greater => {
                        // Matches can still sit at the front of this left
                        // subtree; everything to the right is larger.
                        scan_index_page(pager, child_index(cell.left_page)?, prefix, out)?;
                        return Ok(());
                    }
                }
            }
            let right = page
                .right_most_child
                .ok_or_else(|| Error::Malformed("interior page without right child".into()))?;
            scan_index_page(pager, child_index(right)?, prefix, out)
        }
        _ => Err(Error::Malformed("table page inside an index B-tree".into())),
    }
}
