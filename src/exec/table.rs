//! Row-oriented table helper.
//!
//! A convenience for tests and benches: build a [`ColumnarTable`] from rows
//! of typed values, and flatten a result table back into rows for
//! comparison. The conversions ride entirely on the column builders and the
//! reader; there is no second codec path here.

use crate::exec::column::{ColumnarTable, FixedColumnBuilder, StringColumnBuilder};
use crate::exec::error::{ExecError, TypeError};
use crate::exec::reader::extract;
use crate::exec::types::{DataType, Value};

/// Rows of nullable typed values plus the declared column types.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    types: Vec<DataType>,
    rows: Vec<Vec<Option<Value>>>,
}

impl Table {
    /// Wrap rows and their column types. Every row must have one cell per
    /// declared column.
    pub fn new(rows: Vec<Vec<Option<Value>>>, types: Vec<DataType>) -> Self {
        debug_assert!(rows.iter().all(|row| row.len() == types.len()));
        Table { types, rows }
    }

    pub fn types(&self) -> &[DataType] {
        &self.types
    }

    pub fn rows(&self) -> &[Vec<Option<Value>>] {
        &self.rows
    }

    /// Encode into the columnar page format. Every non-null cell must match
    /// its column's declared type exactly.
    pub fn to_columnar(&self) -> Result<ColumnarTable, ExecError> {
        let mut columns = Vec::with_capacity(self.types.len());
        for (col, &dtype) in self.types.iter().enumerate() {
            let cells = self.rows.iter().map(|row| &row[col]);
            let column = match dtype {
                DataType::Int32 => {
                    let mut b = FixedColumnBuilder::<i32>::new();
                    for cell in cells {
                        b.push(match cell {
                            Some(Value::Int32(v)) => Some(*v),
                            None => None,
                            Some(other) => return Err(type_mismatch(other, dtype)),
                        });
                    }
                    b.finish()
                }
                DataType::Int64 => {
                    let mut b = FixedColumnBuilder::<i64>::new();
                    for cell in cells {
                        b.push(match cell {
                            Some(Value::Int64(v)) => Some(*v),
                            None => None,
                            Some(other) => return Err(type_mismatch(other, dtype)),
                        });
                    }
                    b.finish()
                }
                DataType::Float64 => {
                    let mut b = FixedColumnBuilder::<f64>::new();
                    for cell in cells {
                        b.push(match cell {
                            Some(Value::Float64(v)) => Some(*v),
                            None => None,
                            Some(other) => return Err(type_mismatch(other, dtype)),
                        });
                    }
                    b.finish()
                }
                DataType::Varchar => {
                    let mut b = StringColumnBuilder::new();
                    for cell in cells {
                        b.push(match cell {
                            Some(Value::Varchar(v)) => Some(v.as_str()),
                            None => None,
                            Some(other) => return Err(type_mismatch(other, dtype)),
                        });
                    }
                    b.finish()
                }
            };
            columns.push(column);
        }
        Ok(ColumnarTable {
            num_rows: self.rows.len(),
            columns,
        })
    }

    /// Decode a columnar table back into rows.
    pub fn from_columnar(table: &ColumnarTable) -> Result<Self, ExecError> {
        let mut rows = vec![Vec::with_capacity(table.columns.len()); table.num_rows];
        let mut types = Vec::with_capacity(table.columns.len());
        for column in &table.columns {
            types.push(column.dtype);
            match column.dtype {
                DataType::Int32 => {
                    for (row, v) in extract::<i32>(column, table.num_rows)?.into_iter().enumerate() {
                        rows[row].push(v.map(Value::Int32));
                    }
                }
                DataType::Int64 => {
                    for (row, v) in extract::<i64>(column, table.num_rows)?.into_iter().enumerate() {
                        rows[row].push(v.map(Value::Int64));
                    }
                }
                DataType::Float64 => {
                    for (row, v) in extract::<f64>(column, table.num_rows)?.into_iter().enumerate() {
                        rows[row].push(v.map(Value::Float64));
                    }
                }
                DataType::Varchar => {
                    for (row, v) in extract::<String>(column, table.num_rows)?
                        .into_iter()
                        .enumerate()
                    {
                        rows[row].push(v.map(Value::Varchar));
                    }
                }
            }
        }
        Ok(Table { types, rows })
    }

    /// Sort rows by a total order (nulls first, floats by total ordering) so
    /// results with nondeterministic duplicate-key order compare stably.
    pub fn sort(&mut self) {
        self.rows.sort_by(|a, b| {
            for (x, y) in a.iter().zip(b.iter()) {
                let ord = cell_cmp(x, y);
                if ord != std::cmp::Ordering::Equal {
                    return ord;
                }
            }
            std::cmp::Ordering::Equal
        });
    }
}

fn type_mismatch(value: &Value, dtype: DataType) -> ExecError {
    TypeError::IncompatibleCast {
        from: value.data_type(),
        to: dtype,
    }
    .into()
}

fn cell_cmp(a: &Option<Value>, b: &Option<Value>) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => value_cmp(x, y),
    }
}

fn value_cmp(a: &Value, b: &Value) -> std::cmp::Ordering {
    match (a, b) {
        (Value::Int32(x), Value::Int32(y)) => x.cmp(y),
        (Value::Int64(x), Value::Int64(y)) => x.cmp(y),
        (Value::Float64(x), Value::Float64(y)) => x.total_cmp(y),
        (Value::Varchar(x), Value::Varchar(y)) => x.cmp(y),
        // Mixed-type cells only appear when schemas differ; order by type.
        _ => rank(a).cmp(&rank(b)),
    }
}

fn rank(v: &Value) -> u8 {
    match v {
        Value::Int32(_) => 0,
        Value::Int64(_) => 1,
        Value::Float64(_) => 2,
        Value::Varchar(_) => 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columnar_roundtrip_mixed_types() {
        let rows: Vec<Vec<Option<Value>>> = vec![
            vec![
                Some(Value::Int32(1)),
                Some(Value::Int64(10)),
                Some(1.5.into()),
                Some("one".into()),
            ],
            vec![None, None, None, None],
            vec![
                Some(Value::Int32(3)),
                Some(Value::Int64(30)),
                Some((-2.25).into()),
                Some("three".into()),
            ],
        ];
        let types = vec![
            DataType::Int32,
            DataType::Int64,
            DataType::Float64,
            DataType::Varchar,
        ];
        let table = Table::new(rows, types);
        let columnar = table.to_columnar().unwrap();
        assert_eq!(columnar.num_rows, 3);
        let back = Table::from_columnar(&columnar).unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn test_to_columnar_rejects_type_mismatch() {
        let table = Table::new(
            vec![vec![Some(Value::Varchar("oops".into()))]],
            vec![DataType::Int32],
        );
        assert!(table.to_columnar().is_err());
    }

    #[test]
    fn test_sort_orders_nulls_first() {
        let mut table = Table::new(
            vec![
                vec![Some(Value::Int32(2))],
                vec![None],
                vec![Some(Value::Int32(1))],
            ],
            vec![DataType::Int32],
        );
        table.sort();
        assert_eq!(
            table.rows(),
            &[vec![None], vec![Some(Value::Int32(1))], vec![Some(Value::Int32(2))]]
        );
    }
}
