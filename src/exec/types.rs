//! Scalar column types and typed values.

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use crate::exec::constants::{DATA_OFFSET_4, DATA_OFFSET_8};

/// Column element types supported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// 64-bit IEEE-754 float.
    Float64,
    /// Variable-length UTF-8 string.
    Varchar,
}

impl DataType {
    /// Payload layout of a fixed-width type: `(value width, data offset)`.
    /// `None` for [`DataType::Varchar`].
    pub fn fixed_layout(self) -> Option<(usize, usize)> {
        match self {
            DataType::Int32 => Some((4, DATA_OFFSET_4)),
            DataType::Int64 | DataType::Float64 => Some((8, DATA_OFFSET_8)),
            DataType::Varchar => None,
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataType::Int32 => write!(f, "int32"),
            DataType::Int64 => write!(f, "int64"),
            DataType::Float64 => write!(f, "float64"),
            DataType::Varchar => write!(f, "varchar"),
        }
    }
}

/// A single non-null column value. NULL is `Option::<Value>::None` wherever
/// nullability applies.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int32(i32),
    Int64(i64),
    Float64(f64),
    Varchar(String),
}

impl Value {
    /// The column type this value belongs to.
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Int32(_) => DataType::Int32,
            Value::Int64(_) => DataType::Int64,
            Value::Float64(_) => DataType::Float64,
            Value::Varchar(_) => DataType::Varchar,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int32(x) => write!(f, "{}", x),
            Value::Int64(x) => write!(f, "{}", x),
            Value::Float64(x) => write!(f, "{}", x),
            Value::Varchar(x) => write!(f, "{}", x),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Varchar(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Varchar(v)
    }
}

/// Fixed-width scalars that pack directly into page payloads.
pub trait FixedScalar: Copy {
    /// The column type this scalar encodes.
    const KIND: DataType;
    /// Bytes per value.
    const WIDTH: usize;
    /// Byte offset of the first value in a page.
    const DATA_OFFSET: usize;

    /// Write the value into `buf` (exactly `WIDTH` bytes), little-endian.
    fn store(self, buf: &mut [u8]);
    /// Read a value from `buf` (exactly `WIDTH` bytes), little-endian.
    fn load(buf: &[u8]) -> Self;
}

impl FixedScalar for i32 {
    const KIND: DataType = DataType::Int32;
    const WIDTH: usize = 4;
    const DATA_OFFSET: usize = DATA_OFFSET_4;

    fn store(self, buf: &mut [u8]) {
        LittleEndian::write_i32(buf, self);
    }

    fn load(buf: &[u8]) -> Self {
        LittleEndian::read_i32(buf)
    }
}

impl FixedScalar for i64 {
    const KIND: DataType = DataType::Int64;
    const WIDTH: usize = 8;
    const DATA_OFFSET: usize = DATA_OFFSET_8;

    fn store(self, buf: &mut [u8]) {
        LittleEndian::write_i64(buf, self);
    }

    fn load(buf: &[u8]) -> Self {
        LittleEndian::read_i64(buf)
    }
}

impl FixedScalar for f64 {
    const KIND: DataType = DataType::Float64;
    const WIDTH: usize = 8;
    const DATA_OFFSET: usize = DATA_OFFSET_8;

    fn store(self, buf: &mut [u8]) {
        LittleEndian::write_f64(buf, self);
    }

    fn load(buf: &[u8]) -> Self {
        LittleEndian::read_f64(buf)
    }
}
