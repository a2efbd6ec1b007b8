//! Columns, tables, and the typed column builders.
//!
//! A [`Column`] is an ordered page list for one [`DataType`]; a
//! [`ColumnarTable`] is a list of equal-length columns. Builders append
//! `Option` values and manage page boundaries, emitting long-string pages
//! when a single string cannot fit in a fresh batch page.

use byteorder::{ByteOrder, LittleEndian};

use crate::exec::constants::*;
use crate::exec::page::{Page, PageFlavor};
use crate::exec::types::{DataType, FixedScalar};
use crate::util::bitmap;

/// A finite ordered sequence of pages for one element type.
#[derive(Debug, Clone)]
pub struct Column {
    /// Element type of every page in this column.
    pub dtype: DataType,
    /// Pages in logical row order.
    pub pages: Vec<Page>,
}

impl Column {
    /// An empty column of the given type.
    pub fn new(dtype: DataType) -> Self {
        Column {
            dtype,
            pages: Vec::new(),
        }
    }
}

/// An ordered list of columns plus a row count; all columns have the same
/// row count.
#[derive(Debug, Clone, Default)]
pub struct ColumnarTable {
    /// Logical rows in every column.
    pub num_rows: usize,
    /// Columns in declaration order.
    pub columns: Vec<Column>,
}

// Builders keep the null bitmap in a side buffer and copy it to the page
// tail at seal time, because the tail position depends on the final row
// count.
fn push_bit(bits: &mut Vec<u8>, row: usize, set: bool) {
    if row % 8 == 0 {
        bits.push(0);
    }
    if set {
        bitmap::set(bits, row);
    }
}

/// Builds a fixed-width column one `Option<T>` at a time.
pub struct FixedColumnBuilder<T: FixedScalar> {
    column: Column,
    page: Page,
    rows: usize,
    nonnull: usize,
    bits: Vec<u8>,
    _marker: std::marker::PhantomData<T>,
}

impl<T: FixedScalar> FixedColumnBuilder<T> {
    pub fn new() -> Self {
        FixedColumnBuilder {
            column: Column::new(T::KIND),
            page: Page::zeroed(),
            rows: 0,
            nonnull: 0,
            bits: Vec::new(),
            _marker: std::marker::PhantomData,
        }
    }

    /// Append one value, sealing the current page first if the value and the
    /// grown bitmap would no longer fit.
    pub fn push(&mut self, value: Option<T>) {
        let nonnull = self.nonnull + usize::from(value.is_some());
        if T::DATA_OFFSET + nonnull * T::WIDTH + bitmap::len_for(self.rows + 1) > PAGE_SIZE {
            self.seal();
        }
        match value {
            Some(v) => {
                let off = T::DATA_OFFSET + self.nonnull * T::WIDTH;
                v.store(&mut self.page.bytes_mut()[off..off + T::WIDTH]);
                push_bit(&mut self.bits, self.rows, true);
                self.nonnull += 1;
            }
            None => push_bit(&mut self.bits, self.rows, false),
        }
        self.rows += 1;
    }

    fn seal(&mut self) {
        if self.rows == 0 {
            return;
        }
        let buf = self.page.bytes_mut();
        LittleEndian::write_u16(&mut buf[..2], self.rows as u16);
        buf[PAGE_SIZE - self.bits.len()..].copy_from_slice(&self.bits);
        self.column
            .pages
            .push(std::mem::replace(&mut self.page, Page::zeroed()));
        self.rows = 0;
        self.nonnull = 0;
        self.bits.clear();
    }

    /// Seal the working page and return the finished column.
    pub fn finish(mut self) -> Column {
        self.seal();
        self.column
    }
}

impl<T: FixedScalar> Default for FixedColumnBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds a varchar column one `Option<&str>` at a time.
///
/// Strings longer than [`MAX_INLINE_STRING`] are emitted as one `0xFFFF`
/// page followed by `0xFFFE` continuation pages, each filled to capacity
/// except the last.
pub struct StringColumnBuilder {
    column: Column,
    rows: usize,
    offsets: Vec<u16>,
    chars: Vec<u8>,
    bits: Vec<u8>,
}

impl StringColumnBuilder {
    pub fn new() -> Self {
        StringColumnBuilder {
            column: Column::new(DataType::Varchar),
            rows: 0,
            offsets: Vec::new(),
            chars: Vec::new(),
            bits: Vec::new(),
        }
    }

    fn footprint(&self, extra_offsets: usize, extra_chars: usize) -> usize {
        4 + 2 * (self.offsets.len() + extra_offsets)
            + self.chars.len()
            + extra_chars
            + bitmap::len_for(self.rows + 1)
    }

    /// Append one string or null.
    pub fn push(&mut self, value: Option<&str>) {
        match value {
            None => {
                if self.footprint(0, 0) > PAGE_SIZE {
                    self.seal();
                }
                push_bit(&mut self.bits, self.rows, false);
                self.rows += 1;
            }
            Some(s) => {
                if s.len() > MAX_INLINE_STRING {
                    self.seal();
                    self.push_long(s.as_bytes());
                    return;
                }
                if self.footprint(1, s.len()) > PAGE_SIZE
                    || self.rows + 1 >= LONG_STRING_CONT as usize
                {
                    self.seal();
                }
                self.chars.extend_from_slice(s.as_bytes());
                self.offsets.push(self.chars.len() as u16);
                push_bit(&mut self.bits, self.rows, true);
                self.rows += 1;
            }
        }
    }

    fn push_long(&mut self, mut chars: &[u8]) {
        let mut marker = LONG_STRING_START;
        loop {
            let take = chars.len().min(LONG_STRING_CAPACITY);
            let mut page = Page::zeroed();
            let buf = page.bytes_mut();
            LittleEndian::write_u16(&mut buf[..2], marker);
            LittleEndian::write_u16(&mut buf[2..4], take as u16);
            buf[4..4 + take].copy_from_slice(&chars[..take]);
            if marker == LONG_STRING_CONT {
                // A continuation page is only ever appended right behind the
                // page it continues.
                debug_assert!(matches!(
                    self.column.pages.last().map(Page::flavor),
                    Some(PageFlavor::LongStart) | Some(PageFlavor::LongCont)
                ));
            }
            self.column.pages.push(page);
            chars = &chars[take..];
            if chars.is_empty() {
                break;
            }
            marker = LONG_STRING_CONT;
        }
    }

    fn seal(&mut self) {
        if self.rows == 0 {
            return;
        }
        let mut page = Page::zeroed();
        let buf = page.bytes_mut();
        LittleEndian::write_u16(&mut buf[..2], self.rows as u16);
        LittleEndian::write_u16(&mut buf[2..4], self.offsets.len() as u16);
        let mut at = 4;
        for &end in &self.offsets {
            LittleEndian::write_u16(&mut buf[at..at + 2], end);
            at += 2;
        }
        buf[at..at + self.chars.len()].copy_from_slice(&self.chars);
        buf[PAGE_SIZE - self.bits.len()..].copy_from_slice(&self.bits);
        self.column.pages.push(page);
        self.rows = 0;
        self.offsets.clear();
        self.chars.clear();
        self.bits.clear();
    }

    /// Seal the working page and return the finished column.
    pub fn finish(mut self) -> Column {
        self.seal();
        self.column
    }
}

impl Default for StringColumnBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::reader::extract;

    #[test]
    fn test_fixed_builder_page_boundary() {
        // An i32 page fits exactly 992 fully non-null rows:
        // 4 + 4*992 + ceil(992/8) = 4096.
        let mut b = FixedColumnBuilder::<i32>::new();
        for i in 0..2000i32 {
            b.push(Some(i));
        }
        let column = b.finish();
        assert_eq!(column.pages.len(), 3);
        assert_eq!(column.pages[0].num_rows(), 992);
        assert_eq!(column.pages[1].num_rows(), 992);
        assert_eq!(column.pages[2].num_rows(), 16);

        let values = extract::<i32>(&column, 2000).unwrap();
        assert_eq!(values.len(), 2000);
        assert_eq!(values[0], Some(0));
        assert_eq!(values[991], Some(991));
        assert_eq!(values[992], Some(992));
        assert_eq!(values[1999], Some(1999));
    }

    #[test]
    fn test_fixed_builder_wide_page_boundary() {
        // An i64/f64 page fits 503 fully non-null rows:
        // 8 + 8*503 + ceil(503/8) = 4095.
        let mut b = FixedColumnBuilder::<i64>::new();
        for i in 0..600i64 {
            b.push(Some(i));
        }
        let column = b.finish();
        assert_eq!(column.pages.len(), 2);
        assert_eq!(column.pages[0].num_rows(), 503);
        assert_eq!(column.pages[1].num_rows(), 97);
    }

    #[test]
    fn test_fixed_builder_all_null() {
        let mut b = FixedColumnBuilder::<f64>::new();
        for _ in 0..10 {
            b.push(None);
        }
        let column = b.finish();
        assert_eq!(column.pages.len(), 1);
        let values = extract::<f64>(&column, 10).unwrap();
        assert!(values.iter().all(Option::is_none));
    }

    #[test]
    fn test_fixed_builder_empty() {
        let column = FixedColumnBuilder::<i32>::new().finish();
        assert!(column.pages.is_empty());
    }

    #[test]
    fn test_null_bitmap_matches_rows() {
        let rows: Vec<Option<i32>> = (0..100)
            .map(|i| if i % 3 == 0 { None } else { Some(i) })
            .collect();
        let mut b = FixedColumnBuilder::<i32>::new();
        for v in &rows {
            b.push(*v);
        }
        let column = b.finish();
        assert_eq!(column.pages.len(), 1);
        let page = &column.pages[0];
        let bm_len = bitmap::len_for(100);
        let bits = &page.bytes()[PAGE_SIZE - bm_len..];
        for (i, v) in rows.iter().enumerate() {
            assert_eq!(bitmap::get(bits, i), v.is_some(), "row {}", i);
        }
    }

    #[test]
    fn test_string_builder_short_batch() {
        let mut b = StringColumnBuilder::new();
        b.push(Some("xxx"));
        b.push(None);
        b.push(Some(""));
        b.push(Some("yy"));
        let column = b.finish();
        assert_eq!(column.pages.len(), 1);

        let values = extract::<String>(&column, 4).unwrap();
        assert_eq!(
            values,
            vec![
                Some("xxx".to_owned()),
                None,
                Some(String::new()),
                Some("yy".to_owned())
            ]
        );
    }

    #[test]
    fn test_string_builder_inline_boundary() {
        // MAX_INLINE_STRING chars still fit a fresh batch page; one more
        // forces the long-string encoding.
        let inline = "a".repeat(MAX_INLINE_STRING);
        let column = {
            let mut b = StringColumnBuilder::new();
            b.push(Some(&inline));
            b.finish()
        };
        assert_eq!(column.pages.len(), 1);
        assert!(matches!(column.pages[0].flavor(), PageFlavor::Rows(1)));

        let long = "a".repeat(MAX_INLINE_STRING + 1);
        let column = {
            let mut b = StringColumnBuilder::new();
            b.push(Some(&long));
            b.finish()
        };
        assert_eq!(column.pages.len(), 1);
        assert_eq!(column.pages[0].flavor(), PageFlavor::LongStart);
    }

    #[test]
    fn test_string_builder_long_string_pages() {
        // 10_000 chars: 4092 in the start page, 4092 + 1816 in continuations.
        let long = "x".repeat(10_000);
        let mut b = StringColumnBuilder::new();
        b.push(Some("before"));
        b.push(Some(&long));
        b.push(Some("after"));
        let column = b.finish();

        let flavors: Vec<_> = column.pages.iter().map(Page::flavor).collect();
        assert_eq!(
            flavors,
            vec![
                PageFlavor::Rows(1),
                PageFlavor::LongStart,
                PageFlavor::LongCont,
                PageFlavor::LongCont,
                PageFlavor::Rows(1),
            ]
        );

        let values = extract::<String>(&column, 3).unwrap();
        assert_eq!(values[0].as_deref(), Some("before"));
        assert_eq!(values[1].as_deref(), Some(long.as_str()));
        assert_eq!(values[2].as_deref(), Some("after"));
    }

    #[test]
    fn test_string_builder_batch_page_boundary() {
        // Each "ab" costs one offset and two chars; a page fits 992 of them,
        // the same arithmetic as four-byte fixed values.
        let mut b = StringColumnBuilder::new();
        for _ in 0..1000 {
            b.push(Some("ab"));
        }
        let column = b.finish();
        assert_eq!(column.pages.len(), 2);
        assert_eq!(column.pages[0].num_rows(), 992);
        assert_eq!(column.pages[1].num_rows(), 8);
    }
}
