//! Page parsing and the four cell readers

use byteorder::{BigEndian, ByteOrder};

use crate::format::{CELL_POINTER_SIZE, PAGE_HEADER_SIZE, PageType};
use crate::record::{Field, parse_record};
use crate::varint::read_varint;
use crate::{Error, Result};

/// One entry of a table leaf page: a full row.
#[derive(Debug, Clone)]
pub struct TableLeafCell {
    pub payload_size: i64,
    pub rowid: i64,
    pub fields: Vec<Field>,
    /// First page of the overflow chain when the payload spills. Recognized
    /// but never followed; spilled content reads back clamped.
    pub overflow: Option<u32>,
}

impl TableLeafCell {
    /// Render column `index`, substituting the rowid for the alias column.
    /// Columns past the stored field count render as NULL.
    #[must_use]
    pub fn render_column(&self, index: usize) -> String {
        match self.fields.get(index) {
            Some(field) if field.is_rowid_alias => self.rowid.to_string(),
            Some(field) => field.render(),
            None => "<null>".to_string(),
        }
    }
}

/// One entry of an index leaf page: the indexed fields plus, by convention,
/// the table rowid as the final field.
#[derive(Debug, Clone)]
pub struct IndexLeafCell {
    pub payload_size: i64,
    pub fields: Vec<Field>,
    pub overflow: Option<u32>,
    /// Rendered field components, the ordered key of this entry.
    pub key: Vec<String>,
}

impl IndexLeafCell {
    /// The table rowid stored as the payload's last field.
    pub fn rowid(&self) -> Result<i64> {
        self.fields
            .last()
            .map(crate::record::Field::integer)
            .ok_or_else(|| Error::Malformed("index cell has no fields".into()))
    }

    /// The `|`-joined rendering of the key, for display.
    #[must_use]
    pub fn key_string(&self) -> String {
        self.key.join("|")
    }
}

/// One entry of a table interior page.
#[derive(Debug, Clone, Copy)]
pub struct TableInteriorCell {
    /// One-based page number of the left child
    pub left_page: u32,
    /// Maximum rowid in or under the left child
    pub rowid: i64,
}

/// One entry of an index interior page; the payload is the separator key
/// for the left child.
#[derive(Debug, Clone)]
pub struct IndexInteriorCell {
    pub left_page: u32,
    pub payload_size: i64,
    pub fields: Vec<Field>,
    pub overflow: Option<u32>,
    pub key: Vec<String>,
}

/// A parsed B-tree page.
///
/// For page 1 the stored bytes exclude the 100-byte file header and the cell
/// offsets are already adjusted, so indexing is uniform across pages.
#[derive(Debug)]
pub struct Page {
    pub page_type: PageType,
    pub first_free_block: u16,
    pub cell_count: u16,
    pub cell_content_start: u32,
    pub fragmented_free_bytes: u8,
    /// One-based page number of the right-most child (interior pages only)
    pub right_most_child: Option<u32>,
    pub cell_offsets: Vec<u16>,
    data: Vec<u8>,
    usable_space: u32,
}

impl Page {
    /// Parse a page from its raw bytes.
    ///
    /// `data` is the full page, except for page 1 where it is the view
    /// starting after the 100-byte file header; `is_first_page` then also
    /// compensates the cell offsets, which are expressed relative to the
    /// start of the page on disk.
    pub fn parse(data: Vec<u8>, is_first_page: bool, usable_space: u32) -> Result<Self> {
        if data.len() < PAGE_HEADER_SIZE {
            return Err(Error::Malformed("page too small".into()));
        }

        let type_byte = data[0];
        let page_type = PageType::from_byte(type_byte)
            .ok_or_else(|| Error::Malformed(format!("invalid page type {type_byte:#04x}")))?;

        let first_free_block = BigEndian::read_u16(&data[1..3]);
        let cell_count = BigEndian::read_u16(&data[3..5]);
        let raw_content_start = BigEndian::read_u16(&data[5..7]);
        let cell_content_start = if raw_content_start == 0 {
            65536
        } else {
            u32::from(raw_content_start)
        };
        let fragmented_free_bytes = data[7];

        let (right_most_child, pointer_array_start) = if page_type.is_leaf() {
            (None, PAGE_HEADER_SIZE)
        } else {
            if data.len() < 12 {
                return Err(Error::Malformed("interior page too small".into()));
            }
            (Some(BigEndian::read_u32(&data[8..12])), 12)
        };

        let pointer_array_end =
            pointer_array_start + usize::from(cell_count) * CELL_POINTER_SIZE;
        if pointer_array_end > data.len() {
            return Err(Error::Malformed(format!(
                "cell pointer array for {cell_count} cells exceeds page"
            )));
        }

        let mut cell_offsets = Vec::with_capacity(usize::from(cell_count));
        for i in 0..usize::from(cell_count) {
            let raw = BigEndian::read_u16(
                &data[pointer_array_start + i * CELL_POINTER_SIZE..],
            );
            let adjusted = if is_first_page {
                raw.checked_sub(100).ok_or_else(|| {
                    Error::Malformed(format!("page-1 cell offset {raw} inside file header"))
                })?
            } else {
                raw
            };
            if usize::from(adjusted) < pointer_array_end
                || usize::from(adjusted) >= data.len()
            {
                return Err(Error::Malformed(format!(
                    "cell offset {adjusted} out of page"
                )));
            }
            cell_offsets.push(adjusted);
        }

        Ok(Self {
            page_type,
            first_free_block,
            cell_count,
            cell_content_start,
            fragmented_free_bytes,
            right_most_child,
            cell_offsets,
            data,
            usable_space,
        })
    }

    fn cell_offset(&self, cell_index: usize) -> Result<usize> {
        self.cell_offsets
            .get(cell_index)
            .map(|&off| usize::from(off))
            .ok_or_else(|| Error::Malformed(format!("cell index {cell_index} out of range")))
    }

    /// Slice the local portion of a payload and pick up the trailing overflow
    /// page number when the payload spills.
    fn payload_at(&self, start: usize, payload_size: i64) -> Result<(&[u8], Option<u32>)> {
        let local = self.page_type.local_payload(self.usable_space, payload_size) as usize;
        let end = start
            .checked_add(local)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| {
                Error::Malformed(format!("payload of {payload_size} bytes out of page"))
            })?;

        let overflow = if (local as i64) < payload_size && end + 4 <= self.data.len() {
            Some(BigEndian::read_u32(&self.data[end..end + 4]))
        } else {
            None
        };
        Ok((&self.data[start..end], overflow))
    }

    /// Read a table-leaf cell. `rowid_alias` is the column index aliasing
    /// the rowid, when the owning table has one.
    pub fn table_leaf_cell(
        &self,
        cell_index: usize,
        rowid_alias: Option<usize>,
    ) -> Result<TableLeafCell> {
        let offset = self.cell_offset(cell_index)?;
        let slice = &self.data[offset..];
        let (payload_size, n) = read_varint(slice)?;
        let (rowid, m) = read_varint(&slice[n..])?;
        let (payload, overflow) = self.payload_at(offset + n + m, payload_size)?;
        let mut fields = parse_record(payload, payload_size)?;

        if let Some(alias) = rowid_alias
            && let Some(field) = fields.get_mut(alias)
        {
            field.is_rowid_alias = true;
        }

        Ok(TableLeafCell {
            payload_size,
            rowid,
            fields,
            overflow,
        })
    }

    /// Read an index-leaf cell.
    pub fn index_leaf_cell(&self, cell_index: usize) -> Result<IndexLeafCell> {
        let offset = self.cell_offset(cell_index)?;
        let slice = &self.data[offset..];
        let (payload_size, n) = read_varint(slice)?;
        let (payload, overflow) = self.payload_at(offset + n, payload_size)?;
        let fields = parse_record(payload, payload_size)?;
        let key = fields.iter().map(Field::render).collect();

        Ok(IndexLeafCell {
            payload_size,
            fields,
            overflow,
            key,
        })
    }

    /// Read a table-interior cell at a raw cell offset.
    pub fn table_interior_cell(&self, offset: usize) -> Result<TableInteriorCell> {
        if offset + 4 > self.data.len() {
            return Err(Error::Malformed(format!(
                "interior cell at {offset} out of page"
            )));
        }
        let left_page = BigEndian::read_u32(&self.data[offset..offset + 4]);
        let (rowid, _) = read_varint(&self.data[offset + 4..])?;
        Ok(TableInteriorCell { left_page, rowid })
    }

    /// Read an index-interior cell at a raw cell offset.
    pub fn index_interior_cell(&self, offset: usize) -> Result<IndexInteriorCell> {
        if offset + 4 > self.data.len() {
            return Err(Error::Malformed(format!(
                "interior cell at {offset} out of page"
            )));
        }
        let left_page = BigEndian::read_u32(&self.data[offset..offset + 4]);
        let (payload_size, n) = read_varint(&self.data[offset + 4..])?;
        let (payload, overflow) = self.payload_at(offset + 4 + n, payload_size)?;
        let fields = parse_record(payload, payload_size)?;
        let key = fields.iter().map(Field::render).collect();

        Ok(IndexInteriorCell {
            left_page,
            payload_size,
            fields,
            overflow,
            key,
        })
    }
}
