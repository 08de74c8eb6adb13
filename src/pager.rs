//! Page I/O and the page cache

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::rc::Rc;

use lru::LruCache;
use tracing::trace;

use crate::format::{FILE_HEADER_SIZE, FileHeader};
use crate::page::Page;
use crate::{Error, Result};

/// Reads fixed-size pages by zero-based page index and memoizes them.
///
/// Pages are immutable once parsed and handed out as shared references; in
/// this read-only design the cache is never evicted, so its footprint is
/// bounded by the pages the queries touch.
pub struct Pager {
    file: File,
    header: FileHeader,
    cache: LruCache<usize, Rc<Page>>,
    fetches: u64,
}

impl Pager {
    /// Open a database file and validate its header.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut header_bytes = [0u8; FILE_HEADER_SIZE];
        file.read_exact(&mut header_bytes)
            .map_err(|_| Error::Malformed("file shorter than 100-byte header".into()))?;
        let header = FileHeader::parse(&header_bytes)?;

        Ok(Self {
            file,
            header,
            cache: LruCache::unbounded(),
            fetches: 0,
        })
    }

    #[must_use]
    pub const fn header(&self) -> &FileHeader {
        &self.header
    }

    #[must_use]
    pub const fn page_size(&self) -> u32 {
        self.header.page_size
    }

    /// Number of pages fetched from the file so far (cache misses). Probe
    /// point for asserting how much of the file a query touched.
    #[must_use]
    pub const fn fetches(&self) -> u64 {
        self.fetches
    }

    /// Read the page at `page_index` (zero-based; on-disk page numbers are
    /// one-based), parsing and caching it on first access.
    pub fn read_page(&mut self, page_index: usize) -> Result<Rc<Page>> {
        if let Some(page) = self.cache.get(&page_index) {
            return Ok(Rc::clone(page));
        }

        let page_size = self.header.page_size as usize;
        let mut buf = vec![0u8; page_size];
        self.file
            .seek(SeekFrom::Start(page_index as u64 * page_size as u64))?;
        self.file.read_exact(&mut buf).map_err(|err| {
            if err.kind() == std::io::ErrorKind::UnexpectedEof {
                Error::Malformed(format!("page index {page_index} past end of file"))
            } else {
                Error::Io(err)
            }
        })?;

        // Page 1 carries the file header; parse the view behind it so cell
        // offsets resolve uniformly after the -100 adjustment.
        let is_first_page = page_index == 0;
        let data = if is_first_page {
            buf.split_off(FILE_HEADER_SIZE)
        } else {
            buf
        };

        trace!(page_index, "page cache miss");
        let page = Rc::new(Page::parse(data, is_first_page, self.header.usable_space())?);
        self.fetches += 1;
        self.cache.put(page_index, Rc::clone(&page));
        Ok(page)
    }

    /// Read a page by its one-based on-disk page number.
    pub fn read_page_number(&mut self, page_number: u32) -> Result<Rc<Page>> {
        if page_number == 0 {
            return Err(Error::Malformed("page number 0".into()));
        }
        self.read_page(page_number as usize - 1)
    }
}
