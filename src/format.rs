//! `SQLite` file format constants and structures

use byteorder::{BigEndian, ByteOrder};

use crate::{Error, Result};

/// `SQLite` file header magic string
pub const SQLITE_HEADER_MAGIC: &[u8; 16] = b"SQLite format 3\0";

/// Size of the file header at the start of page 1
pub const FILE_HEADER_SIZE: usize = 100;

/// Size of a B-tree page header on leaf pages (interior pages add a 4-byte
/// right-most child pointer)
pub const PAGE_HEADER_SIZE: usize = 8;

/// Size of a cell pointer
pub const CELL_POINTER_SIZE: usize = 2;

/// The subset of the 100-byte file header this reader consumes
#[derive(Debug, Clone, Copy)]
pub struct FileHeader {
    /// Page size in bytes (the encoded value 1 denotes 65536)
    pub page_size: u32,
    /// Reserved space at end of each page
    pub reserved_space: u8,
    /// Size of database in pages
    pub database_size: u32,
    /// Text encoding (1 = UTF-8)
    pub text_encoding: u32,
}

impl FileHeader {
    /// Parse the first 100 bytes of the file.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < FILE_HEADER_SIZE {
            return Err(Error::Malformed("file shorter than 100-byte header".into()));
        }
        if &data[0..16] != SQLITE_HEADER_MAGIC {
            return Err(Error::Malformed("not a SQLite database".into()));
        }

        let raw_page_size = BigEndian::read_u16(&data[16..18]);
        let page_size = if raw_page_size == 1 {
            65536u32
        } else {
            u32::from(raw_page_size)
        };
        if !(512..=65536).contains(&page_size) || !page_size.is_power_of_two() {
            return Err(Error::Malformed(format!("invalid page size {page_size}")));
        }

        Ok(Self {
            page_size,
            reserved_space: data[20],
            database_size: BigEndian::read_u32(&data[28..32]),
            text_encoding: BigEndian::read_u32(&data[56..60]),
        })
    }

    /// Usable space on a page (U): `page_size` - `reserved_space`
    #[must_use]
    pub fn usable_space(&self) -> u32 {
        self.page_size - u32::from(self.reserved_space)
    }
}

/// Page types in `SQLite`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    /// Interior index b-tree page
    InteriorIndex = 0x02,
    /// Interior table b-tree page
    InteriorTable = 0x05,
    /// Leaf index b-tree page
    LeafIndex = 0x0a,
    /// Leaf table b-tree page
    LeafTable = 0x0d,
}

impl PageType {
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x02 => Some(Self::InteriorIndex),
            0x05 => Some(Self::InteriorTable),
            0x0a => Some(Self::LeafIndex),
            0x0d => Some(Self::LeafTable),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        matches!(self, Self::LeafIndex | Self::LeafTable)
    }

    /// Maximum payload stored locally in a cell on this kind of page (X).
    /// Table leaves use U - 35; index pages use ((U-12)*64/255) - 23.
    #[must_use]
    pub const fn max_local(&self, usable_space: u32) -> u32 {
        match self {
            Self::LeafTable => usable_space.saturating_sub(35),
            _ => ((usable_space.saturating_sub(12)) * 64 / 255).saturating_sub(23),
        }
    }

    /// Minimum local payload (M): ((U-12)*32/255) - 23
    #[must_use]
    pub const fn min_local(usable_space: u32) -> u32 {
        ((usable_space.saturating_sub(12)) * 32 / 255).saturating_sub(23)
    }

    /// How many bytes of a `payload_size`-byte payload are stored in the cell
    /// itself. When the result is smaller than `payload_size`, the remainder
    /// spills to an overflow chain and a 4-byte overflow page number follows
    /// the local portion.
    #[must_use]
    pub fn local_payload(&self, usable_space: u32, payload_size: i64) -> u32 {
        let x = i64::from(self.max_local(usable_space));
        if payload_size <= x {
            return payload_size.max(0) as u32;
        }
        let m = i64::from(Self::min_local(usable_space));
        let k = m + (payload_size - m) % (i64::from(usable_space) - 4);
        if k <= x { k as u32 } else { m as u32 }
    }
}
