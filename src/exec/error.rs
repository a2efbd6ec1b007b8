//! Execution error taxonomy.
//!
//! Errors surface immediately out of [`execute`](crate::exec::executor::execute);
//! no partial result is ever returned, and nothing is retried or swallowed.

use thiserror::Error;

use crate::exec::types::DataType;

/// A plan referenced something that does not exist.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PlanError {
    /// An input table or node id is past the end of its list.
    #[error("plan {kind} reference {index} out of range (have {len})")]
    OutOfRange {
        /// What was referenced: `"input"` or `"node"`.
        kind: &'static str,
        index: usize,
        len: usize,
    },
}

/// A projection does not fit its source schema.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SchemaError {
    /// An output attribute references a column past the source width.
    #[error("projection references column {column} but source has {width} columns")]
    ColumnMismatch { column: usize, width: usize },
}

/// A column's pages could not be decoded.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ReadError {
    /// A page's declared row count would push the cumulative row index past
    /// the column's declared total.
    #[error("page declares {page_rows} rows at row {at}, past the column total of {total}")]
    RowOverflow {
        page_rows: usize,
        at: usize,
        total: usize,
    },
    /// A structurally invalid page: an orphan continuation page, offsets that
    /// regress or point past the payload, or a payload that cannot fit.
    #[error("malformed page: {0}")]
    MalformedPage(&'static str),
}

/// A join node cannot be executed.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum JoinError {
    /// Joins are only defined over the fixed-width key types.
    #[error("unsupported join key type: {0}")]
    UnsupportedKeyType(DataType),
}

/// A column was read as an incompatible type.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TypeError {
    /// Only the widening numeric reads (`int32→int64`, `int32→float64`,
    /// `int64→float64`) and identity reads are defined.
    #[error("cannot read {from} column as {to}")]
    IncompatibleCast { from: DataType, to: DataType },
}

/// Any failure surfaced by plan execution.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ExecError {
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error(transparent)]
    Join(#[from] JoinError),
    #[error(transparent)]
    Type(#[from] TypeError),
}
