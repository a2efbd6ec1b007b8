//! Column reading: lazy page-by-page scans and typed extraction.
//!
//! [`ColumnScan`] walks a column's page list once, yielding
//! `(logical_row_index, Option<Value>)` in row order and reassembling
//! multi-page strings on the fly. [`extract`] materializes a whole column as
//! `Vec<Option<T>>`, applying the widening-only cast matrix: `int32→int64`,
//! `int32→float64`, `int64→float64`, and identity reads. Everything else is
//! rejected with [`TypeError::IncompatibleCast`].

use byteorder::{ByteOrder, LittleEndian};

use crate::exec::column::Column;
use crate::exec::error::{ExecError, ReadError, TypeError};
use crate::exec::page::{FixedPage, LongStringPage, PageFlavor, StringBatchPage};
use crate::exec::types::{DataType, Value};

/// A lazy, finite, non-restartable scan over one column.
pub struct ColumnScan<'a> {
    column: &'a Column,
    total_rows: usize,
    next_page: usize,
    row: usize,
    cursor: Option<Cursor<'a>>,
    failed: bool,
}

enum Cursor<'a> {
    Fixed {
        view: FixedPage<'a>,
        idx: u16,
        value_idx: usize,
    },
    Strings {
        view: StringBatchPage<'a>,
        idx: u16,
        value_idx: u16,
        prev_end: usize,
    },
}

impl<'a> Cursor<'a> {
    /// Next value in the current page, or `None` when the page is exhausted.
    fn next_value(&mut self, dtype: DataType) -> Option<Result<Option<Value>, ReadError>> {
        match self {
            Cursor::Fixed {
                view,
                idx,
                value_idx,
            } => {
                if *idx >= view.num_rows {
                    return None;
                }
                let i = *idx;
                *idx += 1;
                if view.is_null(i) {
                    return Some(Ok(None));
                }
                let bytes = view.value_bytes(*value_idx);
                *value_idx += 1;
                let value = match dtype {
                    DataType::Int32 => Value::Int32(LittleEndian::read_i32(bytes)),
                    DataType::Int64 => Value::Int64(LittleEndian::read_i64(bytes)),
                    DataType::Float64 => Value::Float64(LittleEndian::read_f64(bytes)),
                    DataType::Varchar => unreachable!("varchar pages use the string cursor"),
                };
                Some(Ok(Some(value)))
            }
            Cursor::Strings {
                view,
                idx,
                value_idx,
                prev_end,
            } => {
                if *idx >= view.num_rows {
                    return None;
                }
                let i = *idx;
                *idx += 1;
                if view.is_null(i) {
                    return Some(Ok(None));
                }
                let end = view.end_offset(*value_idx);
                *value_idx += 1;
                if end < *prev_end {
                    return Some(Err(ReadError::MalformedPage("string offsets regress")));
                }
                if end > view.char_capacity() {
                    return Some(Err(ReadError::MalformedPage(
                        "string offset points past page payload",
                    )));
                }
                let bytes = view.str_bytes(*prev_end, end);
                *prev_end = end;
                match std::str::from_utf8(bytes) {
                    Ok(s) => Some(Ok(Some(Value::Varchar(s.to_owned())))),
                    Err(_) => Some(Err(ReadError::MalformedPage(
                        "string payload is not valid utf-8",
                    ))),
                }
            }
        }
    }
}

impl<'a> ColumnScan<'a> {
    /// Scan `column`, which must contribute exactly `total_rows` logical rows.
    pub fn new(column: &'a Column, total_rows: usize) -> Self {
        ColumnScan {
            column,
            total_rows,
            next_page: 0,
            row: 0,
            cursor: None,
            failed: false,
        }
    }

    /// Open the next page, returning the long-string value directly when the
    /// page starts one.
    fn open_page(&mut self) -> Option<Result<Option<Value>, ReadError>> {
        let page = self.column.pages.get(self.next_page)?;
        self.next_page += 1;
        match page.flavor() {
            PageFlavor::Rows(0) => None,
            PageFlavor::Rows(n) => {
                if self.row + n as usize > self.total_rows {
                    return Some(Err(ReadError::RowOverflow {
                        page_rows: n as usize,
                        at: self.row,
                        total: self.total_rows,
                    }));
                }
                let cursor = match self.column.dtype.fixed_layout() {
                    Some((width, data_offset)) => {
                        match FixedPage::parse(page, width, data_offset) {
                            Ok(view) => Cursor::Fixed {
                                view,
                                idx: 0,
                                value_idx: 0,
                            },
                            Err(e) => return Some(Err(e)),
                        }
                    }
                    None => match StringBatchPage::parse(page) {
                        Ok(view) => Cursor::Strings {
                            view,
                            idx: 0,
                            value_idx: 0,
                            prev_end: 0,
                        },
                        Err(e) => return Some(Err(e)),
                    },
                };
                self.cursor = Some(cursor);
                None
            }
            PageFlavor::LongStart => {
                if self.column.dtype != DataType::Varchar {
                    return Some(Err(ReadError::MalformedPage(
                        "long-string page in a fixed-width column",
                    )));
                }
                if self.row + 1 > self.total_rows {
                    return Some(Err(ReadError::RowOverflow {
                        page_rows: 1,
                        at: self.row,
                        total: self.total_rows,
                    }));
                }
                let start = match LongStringPage::parse(page) {
                    Ok(p) => p,
                    Err(e) => return Some(Err(e)),
                };
                let mut chars = start.chars.to_vec();
                while let Some(next) = self.column.pages.get(self.next_page) {
                    if next.flavor() != PageFlavor::LongCont {
                        break;
                    }
                    self.next_page += 1;
                    match LongStringPage::parse(next) {
                        Ok(cont) => chars.extend_from_slice(cont.chars),
                        Err(e) => return Some(Err(e)),
                    }
                }
                match String::from_utf8(chars) {
                    Ok(s) => Some(Ok(Some(Value::Varchar(s)))),
                    Err(_) => Some(Err(ReadError::MalformedPage(
                        "string payload is not valid utf-8",
                    ))),
                }
            }
            PageFlavor::LongCont => Some(Err(ReadError::MalformedPage(
                "continuation page without a preceding string start",
            ))),
        }
    }
}

impl<'a> Iterator for ColumnScan<'a> {
    type Item = Result<(usize, Option<Value>), ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            if let Some(cursor) = &mut self.cursor {
                match cursor.next_value(self.column.dtype) {
                    Some(Ok(value)) => {
                        let row = self.row;
                        self.row += 1;
                        return Some(Ok((row, value)));
                    }
                    Some(Err(e)) => {
                        self.failed = true;
                        return Some(Err(e));
                    }
                    None => {
                        self.cursor = None;
                    }
                }
                continue;
            }
            if self.next_page >= self.column.pages.len() {
                return None;
            }
            match self.open_page() {
                Some(Ok(value)) => {
                    let row = self.row;
                    self.row += 1;
                    return Some(Ok((row, value)));
                }
                Some(Err(e)) => {
                    self.failed = true;
                    return Some(Err(e));
                }
                None => {}
            }
        }
    }
}

/// Targets of typed column extraction.
pub trait FromValue: Sized + Clone {
    /// The column type this target reads as.
    const KIND: DataType;

    /// Convert a decoded value, applying the widening-only cast matrix.
    fn from_value(value: Value) -> Result<Self, TypeError>;
}

impl FromValue for i32 {
    const KIND: DataType = DataType::Int32;

    fn from_value(value: Value) -> Result<Self, TypeError> {
        match value {
            Value::Int32(v) => Ok(v),
            other => Err(TypeError::IncompatibleCast {
                from: other.data_type(),
                to: Self::KIND,
            }),
        }
    }
}

impl FromValue for i64 {
    const KIND: DataType = DataType::Int64;

    fn from_value(value: Value) -> Result<Self, TypeError> {
        match value {
            Value::Int32(v) => Ok(v as i64),
            Value::Int64(v) => Ok(v),
            other => Err(TypeError::IncompatibleCast {
                from: other.data_type(),
                to: Self::KIND,
            }),
        }
    }
}

impl FromValue for f64 {
    const KIND: DataType = DataType::Float64;

    fn from_value(value: Value) -> Result<Self, TypeError> {
        match value {
            Value::Int32(v) => Ok(v as f64),
            Value::Int64(v) => Ok(v as f64),
            Value::Float64(v) => Ok(v),
            other => Err(TypeError::IncompatibleCast {
                from: other.data_type(),
                to: Self::KIND,
            }),
        }
    }
}

impl FromValue for String {
    const KIND: DataType = DataType::Varchar;

    fn from_value(value: Value) -> Result<Self, TypeError> {
        match value {
            Value::Varchar(v) => Ok(v),
            other => Err(TypeError::IncompatibleCast {
                from: other.data_type(),
                to: Self::KIND,
            }),
        }
    }
}

fn cast_allowed(from: DataType, to: DataType) -> bool {
    use DataType::*;
    matches!(
        (from, to),
        (Int32, Int32)
            | (Int32, Int64)
            | (Int32, Float64)
            | (Int64, Int64)
            | (Int64, Float64)
            | (Float64, Float64)
            | (Varchar, Varchar)
    )
}

/// Materialize a column of `num_rows` logical rows as `Vec<Option<T>>`.
pub fn extract<T: FromValue>(column: &Column, num_rows: usize) -> Result<Vec<Option<T>>, ExecError> {
    if !cast_allowed(column.dtype, T::KIND) {
        return Err(TypeError::IncompatibleCast {
            from: column.dtype,
            to: T::KIND,
        }
        .into());
    }
    let mut values = vec![None; num_rows];
    for item in ColumnScan::new(column, num_rows) {
        let (row, value) = item?;
        if let Some(v) = value {
            values[row] = Some(T::from_value(v)?);
        }
    }
    Ok(values)
}
