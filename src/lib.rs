//! Columnar plan execution engine.
//!
//! The `columnar-exec` crate (library name `colex`) evaluates precompiled
//! query plans (trees of scans and binary equi-joins) over tables stored in
//! a columnar, page-based binary format, and emits the result in the same
//! format. It is an embedded library for batch evaluation: no optimizer, no
//! SQL parser, no transactions, no mutation, no on-disk state.
//!
//! # Quick example
//!
//! ```
//! use colex::exec::executor::{execute, Context};
//! use colex::exec::plan::Plan;
//! use colex::exec::table::Table;
//! use colex::exec::types::{DataType, Value};
//!
//! // Two single-column INT32 tables.
//! let rows = vec![
//!     vec![Some(Value::Int32(1))],
//!     vec![Some(Value::Int32(2))],
//! ];
//! let table = Table::new(rows, vec![DataType::Int32]);
//!
//! let mut plan = Plan::new();
//! plan.inputs.push(table.to_columnar().unwrap());
//! plan.inputs.push(table.to_columnar().unwrap());
//! let a = plan.add_scan(0, vec![(0, DataType::Int32)]);
//! let b = plan.add_scan(1, vec![(0, DataType::Int32)]);
//! plan.root = plan.add_join(
//!     true,
//!     a,
//!     b,
//!     0,
//!     0,
//!     vec![(0, DataType::Int32), (1, DataType::Int32)],
//! );
//!
//! let result = execute(&plan, &Context::new()).unwrap();
//! assert_eq!(result.num_rows, 2);
//! assert_eq!(result.columns.len(), 2);
//! ```
//!
//! # Key entry points
//!
//! | Type / Function | Purpose |
//! |-----------------|---------|
//! | [`execute`](exec::executor::execute) | Evaluate a plan to its result table |
//! | [`Context`](exec::executor::Context) | Join strategy and worker-pool sizing |
//! | [`Plan`](exec::plan::Plan) | Plan tree: inputs, nodes, root |
//! | [`ColumnarTable`](exec::column::ColumnarTable) | Columns of fixed-size pages plus a row count |
//! | [`UnchainedTable`](exec::unchained::UnchainedTable) | Single-probe join table with per-slot Bloom filters |
//! | [`Table`](exec::table::Table) | Row-oriented fixture helper for tests and benches |
//!
//! # Module overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`exec::page`] | Page buffer type and page-level decoding |
//! | [`exec::column`] | Columns, tables, typed column builders |
//! | [`exec::reader`] | Lazy column scans, typed extraction, cast rules |
//! | [`exec::hash`] | CRC32C key hashing and Bloom tag math |
//! | [`exec::unchained`] | Unchained hash table |
//! | [`exec::join`] | Single-threaded join variants |
//! | [`exec::partitioned`] | Sharded parallel join |
//! | [`exec::plan`] | Plan tree types and builder helpers |
//! | [`exec::executor`] | Recursive evaluation and output materialization |
//! | [`exec::error`] | Error taxonomy |

pub mod exec;
pub mod util;

pub use exec::column::{Column, ColumnarTable};
pub use exec::error::{ExecError, JoinError, PlanError, ReadError, SchemaError, TypeError};
pub use exec::executor::{execute, Context, JoinStrategy};
pub use exec::plan::{JoinNode, NodeKind, Plan, PlanNode, ScanNode};
pub use exec::types::{DataType, Value};
