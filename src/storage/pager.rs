//! Owns the file descriptor and the page cache.
//!
//! A page is read from disk at most once per session (lazy read-through);
//! every subsequent reference returns the cached buffer. Nothing is ever
//! evicted — `MAX_PAGES * PAGE_SIZE` (400 KiB) is the hard ceiling on table
//! size, traded deliberately for not needing an eviction policy.

use crate::errors::Error;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::{debug, trace};

pub const PAGE_SIZE: usize = 4096;
pub const MAX_PAGES: usize = 100;

pub struct Pager {
    file: File,
    file_len_bytes: u64,
    num_pages: u32,
    max_pages: usize,
    pages: Vec<Option<Box<[u8; PAGE_SIZE]>>>,
}

impl Pager {
    /// Opens `path` for read/write, creating it if absent, with the hard
    /// `MAX_PAGES` ceiling. Fails fatally (an `Error::Integrity`) if the
    /// file length is not a whole number of pages.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Pager, Error> {
        Self::open_with_max_pages(path, MAX_PAGES)
    }

    /// Opens `path` with `max_pages` as the cache ceiling instead of the
    /// default `MAX_PAGES`. `max_pages` is clamped to never exceed
    /// `MAX_PAGES` — this can only shrink the ceiling (e.g. to exercise the
    /// capacity-error path cheaply in a test), never loosen it, since
    /// `MAX_PAGES * PAGE_SIZE` is a hard invariant on table size.
    pub fn open_with_max_pages<P: AsRef<Path>>(path: P, max_pages: usize) -> Result<Pager, Error> {
        let max_pages = max_pages.min(MAX_PAGES);

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;

        let file_len_bytes = file.seek(SeekFrom::End(0))?;
        if file_len_bytes % PAGE_SIZE as u64 != 0 {
            return Err(err!(
                Integrity,
                "db file length {} is not a multiple of the page size {}",
                file_len_bytes,
                PAGE_SIZE
            ));
        }

        let num_pages = (file_len_bytes / PAGE_SIZE as u64) as u32;
        debug!(num_pages, file_len_bytes, max_pages, "opened pager");

        let mut pages = Vec::with_capacity(MAX_PAGES);
        pages.resize_with(MAX_PAGES, || None);

        Ok(Pager {
            file,
            file_len_bytes,
            num_pages,
            max_pages,
            pages,
        })
    }

    pub fn num_pages(&self) -> u32 {
        self.num_pages
    }

    /// Returns the next never-before-used page number. Allocation is
    /// append-only; pages are never recycled.
    pub fn unused_page_num(&self) -> u32 {
        self.num_pages
    }

    /// Returns a borrow of the cached buffer for `page_num`, reading it
    /// from disk on first reference. Pages past the current end of file are
    /// materialized zeroed.
    pub fn get_page(&mut self, page_num: u32) -> Result<&mut [u8; PAGE_SIZE], Error> {
        if page_num as usize >= self.max_pages {
            return Err(err!(
                Capacity,
                "page number out of bounds ({} >= {})",
                page_num,
                self.max_pages
            ));
        }

        if self.pages[page_num as usize].is_none() {
            trace!(page_num, "page cache miss");
            let mut buf = Box::new([0u8; PAGE_SIZE]);

            let pages_on_disk = self.file_len_bytes.div_ceil(PAGE_SIZE as u64) as u32;
            if page_num < pages_on_disk {
                self.file.seek(SeekFrom::Start(page_num as u64 * PAGE_SIZE as u64))?;
                self.file.read_exact(buf.as_mut_slice())?;
            }

            self.pages[page_num as usize] = Some(buf);

            if page_num >= self.num_pages {
                self.num_pages = page_num + 1;
            }
        }

        Ok(self.pages[page_num as usize].as_mut().unwrap())
    }

    /// Writes the cached buffer for `page_num` back to its offset in the
    /// file. Fatal if the slot was never materialized.
    pub fn flush(&mut self, page_num: u32) -> Result<(), Error> {
        let Some(page) = self.pages[page_num as usize].as_ref() else {
            return Err(err!(Integrity, "tried to flush empty page slot {}", page_num));
        };

        self.file
            .seek(SeekFrom::Start(page_num as u64 * PAGE_SIZE as u64))?;
        self.file.write_all(page.as_slice())?;
        self.file_len_bytes = self.file_len_bytes.max((page_num + 1) as u64 * PAGE_SIZE as u64);
        debug!(page_num, "flushed page");
        Ok(())
    }

    /// Flushes every materialized page and closes the descriptor.
    pub fn close(&mut self) -> Result<(), Error> {
        for page_num in 0..self.num_pages {
            if self.pages[page_num as usize].is_some() {
                self.flush(page_num)?;
            }
        }
        self.file.sync_all()?;
        Ok(())
    }
}
