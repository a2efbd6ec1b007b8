//! Fixed-size column pages and page-level decoding.
//!
//! Every page is a [`PAGE_SIZE`]-byte buffer belonging to exactly one column.
//! Bytes [0, 2) hold the logical row count (little-endian u16); the two
//! highest values are reserved as long-string markers. Fixed-width pages pack
//! their non-null values from [`DataType::fixed_layout`]'s data offset and
//! keep the null bitmap in the last `ceil(num_rows / 8)` bytes. String pages
//! come in three flavors; see [`PageFlavor`].

use byteorder::{ByteOrder, LittleEndian};

use crate::exec::constants::*;
use crate::exec::error::ReadError;
use crate::util::bitmap;

/// One immutable-once-finalized page of a single column.
#[derive(Clone)]
pub struct Page(Box<[u8; PAGE_SIZE]>);

impl Page {
    /// A fresh all-zero page (declares zero rows).
    pub fn zeroed() -> Self {
        Page(Box::new([0u8; PAGE_SIZE]))
    }

    /// The raw row-count field. For string columns this may be a marker; see
    /// [`Page::flavor`].
    pub fn num_rows(&self) -> u16 {
        LittleEndian::read_u16(&self.0[PAGE_NUM_ROWS..PAGE_NUM_ROWS + 2])
    }

    /// How this page's payload is laid out.
    pub fn flavor(&self) -> PageFlavor {
        match self.num_rows() {
            LONG_STRING_START => PageFlavor::LongStart,
            LONG_STRING_CONT => PageFlavor::LongCont,
            n => PageFlavor::Rows(n),
        }
    }

    /// Raw page bytes.
    pub fn bytes(&self) -> &[u8; PAGE_SIZE] {
        &self.0
    }

    /// Raw page bytes, writable. Only builders touch this; pages are
    /// immutable once their column is finalized.
    pub fn bytes_mut(&mut self) -> &mut [u8; PAGE_SIZE] {
        &mut self.0
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("num_rows", &self.num_rows())
            .finish()
    }
}

/// Page payload layout, derived from the row-count field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageFlavor {
    /// A regular page contributing this many logical rows.
    Rows(u16),
    /// Start of a long string (`0xFFFF`). Contributes one non-null row.
    LongStart,
    /// Continuation of the previous page's long string (`0xFFFE`).
    /// Contributes no rows.
    LongCont,
}

/// Decoded view of a fixed-width page.
pub struct FixedPage<'a> {
    data: &'a [u8; PAGE_SIZE],
    /// Logical rows in this page, nulls included.
    pub num_rows: u16,
    /// Packed non-null values in this page.
    pub num_nonnull: usize,
    width: usize,
    data_offset: usize,
}

impl<'a> FixedPage<'a> {
    /// Decode a fixed-width page, validating that its packed values and null
    /// bitmap fit inside the page.
    pub fn parse(page: &'a Page, width: usize, data_offset: usize) -> Result<Self, ReadError> {
        let num_rows = page.num_rows();
        let bm_len = bitmap::len_for(num_rows as usize);
        if data_offset + bm_len > PAGE_SIZE {
            return Err(ReadError::MalformedPage("null bitmap overflows page"));
        }
        let data = page.bytes();
        let num_nonnull = bitmap::count_ones(&data[PAGE_SIZE - bm_len..], num_rows as usize);
        if data_offset + num_nonnull * width + bm_len > PAGE_SIZE {
            return Err(ReadError::MalformedPage("fixed-width payload overflows page"));
        }
        Ok(FixedPage {
            data,
            num_rows,
            num_nonnull,
            width,
            data_offset,
        })
    }

    /// The null bitmap at the page tail.
    pub fn bitmap(&self) -> &'a [u8] {
        &self.data[PAGE_SIZE - bitmap::len_for(self.num_rows as usize)..]
    }

    /// Is logical row `row` null?
    pub fn is_null(&self, row: u16) -> bool {
        !bitmap::get(self.bitmap(), row as usize)
    }

    /// Raw bytes of the `value_idx`-th packed non-null value.
    pub fn value_bytes(&self, value_idx: usize) -> &'a [u8] {
        let off = self.data_offset + value_idx * self.width;
        &self.data[off..off + self.width]
    }
}

/// Decoded view of a short-string batch page.
pub struct StringBatchPage<'a> {
    data: &'a [u8; PAGE_SIZE],
    /// Logical rows in this page, nulls included.
    pub num_rows: u16,
    /// Strings stored in this page.
    pub num_nonnull: u16,
}

impl<'a> StringBatchPage<'a> {
    /// Decode a short-string batch page, validating that the offsets array,
    /// character payload, and null bitmap fit and agree with each other.
    pub fn parse(page: &'a Page) -> Result<Self, ReadError> {
        let num_rows = page.num_rows();
        debug_assert!(num_rows < LONG_STRING_CONT);
        let data = page.bytes();
        let num_nonnull = LittleEndian::read_u16(&data[2..4]);
        let bm_len = bitmap::len_for(num_rows as usize);
        let header = 4 + 2 * num_nonnull as usize;
        if header + bm_len > PAGE_SIZE {
            return Err(ReadError::MalformedPage("string offsets overflow page"));
        }
        if bitmap::count_ones(&data[PAGE_SIZE - bm_len..], num_rows as usize)
            != num_nonnull as usize
        {
            return Err(ReadError::MalformedPage(
                "null bitmap disagrees with string count",
            ));
        }
        if num_nonnull > 0 {
            let last = LittleEndian::read_u16(&data[header - 2..header]) as usize;
            if header + last + bm_len > PAGE_SIZE {
                return Err(ReadError::MalformedPage("string payload overflows page"));
            }
        }
        Ok(StringBatchPage {
            data,
            num_rows,
            num_nonnull,
        })
    }

    /// Is logical row `row` null?
    pub fn is_null(&self, row: u16) -> bool {
        let bm_len = bitmap::len_for(self.num_rows as usize);
        !bitmap::get(&self.data[PAGE_SIZE - bm_len..], row as usize)
    }

    /// End offset (exclusive, relative to the first character byte) of the
    /// `value_idx`-th string.
    pub fn end_offset(&self, value_idx: u16) -> usize {
        let at = 4 + 2 * value_idx as usize;
        LittleEndian::read_u16(&self.data[at..at + 2]) as usize
    }

    /// Bytes available to the character region, between the offsets array and
    /// the null bitmap.
    pub fn char_capacity(&self) -> usize {
        PAGE_SIZE - bitmap::len_for(self.num_rows as usize) - (4 + 2 * self.num_nonnull as usize)
    }

    /// Character bytes in `[start, end)`, relative to the first character.
    pub fn str_bytes(&self, start: usize, end: usize) -> &'a [u8] {
        let base = 4 + 2 * self.num_nonnull as usize;
        &self.data[base + start..base + end]
    }
}

/// Decoded view of a long-string page (start or continuation).
pub struct LongStringPage<'a> {
    /// Character bytes stored in this page.
    pub chars: &'a [u8],
}

impl<'a> LongStringPage<'a> {
    /// Decode a `0xFFFF` / `0xFFFE` page.
    pub fn parse(page: &'a Page) -> Result<Self, ReadError> {
        debug_assert!(page.num_rows() >= LONG_STRING_CONT);
        let data = page.bytes();
        let count = LittleEndian::read_u16(&data[2..4]) as usize;
        if 4 + count > PAGE_SIZE {
            return Err(ReadError::MalformedPage("long-string payload overflows page"));
        }
        Ok(LongStringPage {
            chars: &data[4..4 + count],
        })
    }
}
